//! Serializable records of a model
//!
//! A record is an ordered tree of (type, identifier, display name,
//! tag → children, role → value). Loading a record reproduces identifiers,
//! tag structure and values exactly. The on-disk format is plain
//! `serde_json`; other formats belong to the host.

use mvx_core_types::{ItemId, Role};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::{CloneMode, DetachedItem, ItemHandle, TagIndex, TagInfo, Variant};
use crate::ops::Tree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_type: String,
    pub root: ItemRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub model_type: String,
    pub identifier: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub data: Vec<RoleValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub tag: TagInfo,
    #[serde(default)]
    pub children: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleValue {
    pub role: Role,
    pub value: Variant,
}

impl ModelRecord {
    /// Snapshot a whole tree
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the tree has been disposed.
    pub fn from_tree(model_type: impl Into<String>, tree: &Tree) -> Result<Self> {
        Ok(Self {
            model_type: model_type.into(),
            root: ItemRecord::from_tree(tree, tree.root())?,
        })
    }

    /// # Errors
    ///
    /// Returns `Serialization` on encoder failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns `Serialization` for malformed input.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ItemRecord {
    pub fn from_detached(item: &DetachedItem) -> Self {
        let display_name = item
            .data(Role::DISPLAY)
            .and_then(Variant::as_text)
            .map(str::to_string);
        let tags = item
            .tags()
            .slots
            .iter()
            .map(|slot| TagRecord {
                tag: slot.info.clone(),
                children: slot.items.iter().map(ItemRecord::from_detached).collect(),
            })
            .collect();
        let data = item
            .item_data()
            .iter()
            .map(|(role, value)| RoleValue {
                role,
                value: value.clone(),
            })
            .collect();
        Self {
            model_type: item.model_type().to_string(),
            identifier: item.identifier().clone(),
            display_name,
            default_tag: item.tags().default_tag().map(str::to_string),
            tags,
            data,
        }
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` for a stale handle.
    pub fn from_tree(tree: &Tree, handle: ItemHandle) -> Result<Self> {
        let snapshot = tree.clone_subtree(handle, CloneMode::Restore)?;
        Ok(Self::from_detached(&snapshot))
    }

    /// Rebuild the subtree with its recorded identifiers
    ///
    /// # Errors
    ///
    /// Fails if the record breaks tag rules (duplicate tags, capacity or type
    /// restrictions) or mixes value kinds within a role.
    pub fn into_detached(self) -> Result<DetachedItem> {
        let mut item = DetachedItem::with_identifier(self.model_type, self.identifier);
        for RoleValue { role, value } in self.data {
            item.set_data(role, value)?;
        }
        if let Some(name) = self.display_name {
            if item.data(Role::DISPLAY).is_none() {
                item.set_display_name(name)?;
            }
        }
        for TagRecord { tag, children } in self.tags {
            let name = tag.name.clone();
            if self.default_tag.as_deref() == Some(name.as_str()) {
                item.register_default_tag(tag)?;
            } else {
                item.register_tag(tag)?;
            }
            for child in children {
                item.insert_item(child.into_detached()?, &TagIndex::append(name.clone()))?;
            }
        }
        Ok(item)
    }
}
