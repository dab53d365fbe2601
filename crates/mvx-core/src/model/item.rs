use mvx_core_types::{ItemId, Role};

use super::catalogue::PROPERTY_ITEM;
use super::handle::ItemHandle;
use super::tag::{TagIndex, TagInfo, TaggedItems};
use super::variant::{ItemData, Variant};
use crate::errors::{MvxError, Result};

/// Identity policy for copies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMode {
    /// Every copied item gets a new identifier
    Fresh,
    /// Identifiers are preserved; used to restore removed subtrees
    Restore,
}

/// Item resident in a tree's arena
#[derive(Debug, Clone)]
pub struct Item {
    pub(crate) model_type: String,
    pub(crate) identifier: ItemId,
    pub(crate) parent: Option<ItemHandle>,
    pub(crate) data: ItemData,
    pub(crate) tags: TaggedItems<ItemHandle>,
}

impl Item {
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn identifier(&self) -> &ItemId {
        &self.identifier
    }

    pub fn parent(&self) -> Option<ItemHandle> {
        self.parent
    }

    pub fn data(&self, role: Role) -> Option<&Variant> {
        self.data.get(role)
    }

    pub fn item_data(&self) -> &ItemData {
        &self.data
    }

    pub fn tags(&self) -> &TaggedItems<ItemHandle> {
        &self.tags
    }

    /// DISPLAY role, falling back to the type name
    pub fn display_name(&self) -> &str {
        display_name(&self.data, &self.model_type)
    }

    pub fn is_editable(&self) -> bool {
        flag(&self.data, Role::EDITABLE)
    }

    pub fn is_enabled(&self) -> bool {
        flag(&self.data, Role::ENABLED)
    }
}

fn display_name<'a>(data: &'a ItemData, model_type: &'a str) -> &'a str {
    data.get(Role::DISPLAY)
        .and_then(Variant::as_text)
        .unwrap_or(model_type)
}

fn flag(data: &ItemData, role: Role) -> bool {
    data.get(role).and_then(Variant::as_bool).unwrap_or(true)
}

/// Owned item subtree that belongs to no tree
///
/// This is how items are built before insertion and how removed subtrees
/// travel back to the caller. Owning the value is what guarantees a child
/// never has two parents.
#[derive(Debug, PartialEq)]
pub struct DetachedItem {
    pub(crate) model_type: String,
    pub(crate) identifier: ItemId,
    pub(crate) data: ItemData,
    pub(crate) tags: TaggedItems<DetachedItem>,
}

impl DetachedItem {
    /// Create an item with a fresh identifier and no tags
    pub fn new(model_type: impl Into<String>) -> Self {
        Self::with_identifier(model_type, ItemId::new())
    }

    pub(crate) fn with_identifier(model_type: impl Into<String>, identifier: ItemId) -> Self {
        Self {
            model_type: model_type.into(),
            identifier,
            data: ItemData::new(),
            tags: TaggedItems::new(),
        }
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn identifier(&self) -> &ItemId {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        display_name(&self.data, &self.model_type)
    }

    pub fn data(&self, role: Role) -> Option<&Variant> {
        self.data.get(role)
    }

    pub fn item_data(&self) -> &ItemData {
        &self.data
    }

    pub fn tags(&self) -> &TaggedItems<DetachedItem> {
        &self.tags
    }

    /// # Errors
    ///
    /// Returns `DataKindMismatch` if the role holds a value of another kind.
    pub fn set_data(&mut self, role: Role, value: impl Into<Variant>) -> Result<bool> {
        self.data.set(role, value.into())
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) -> Result<bool> {
        self.set_data(Role::DISPLAY, Variant::Text(name.into()))
    }

    /// Builder form of [`DetachedItem::set_data`]
    pub fn with_data(mut self, role: Role, value: impl Into<Variant>) -> Result<Self> {
        self.set_data(role, value)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `DuplicateTag` if the tag is already declared.
    pub fn register_tag(&mut self, info: TagInfo) -> Result<()> {
        self.tags.register_tag(info, false)
    }

    /// Declare a tag and make it the target of empty tag names
    pub fn register_default_tag(&mut self, info: TagInfo) -> Result<()> {
        self.tags.register_tag(info, true)
    }

    /// Insert a child subtree
    ///
    /// # Errors
    ///
    /// Same capacity, type and range rules as insertion into a tree.
    pub fn insert_item(&mut self, child: DetachedItem, tag_index: &TagIndex) -> Result<()> {
        let (slot, row) = self.tags.insert_check(tag_index, &child.model_type)?;
        self.tags.insert_at(slot, row, child)
    }

    /// # Errors
    ///
    /// Fails on empty slots and on property or below-minimum tags.
    pub fn take_item(&mut self, tag_index: &TagIndex) -> Result<DetachedItem> {
        let (slot, row) = self.tags.take_check(tag_index, true)?;
        self.tags.remove_at(slot, row)
    }

    pub fn get_item(&self, tag_index: &TagIndex) -> Option<&DetachedItem> {
        self.tags.get(tag_index)
    }

    pub fn get_item_mut(&mut self, tag_index: &TagIndex) -> Option<&mut DetachedItem> {
        let pos = self.tags.slot_position(&tag_index.tag).ok()?;
        self.tags.slots[pos].items.get_mut(tag_index.row)
    }

    /// # Errors
    ///
    /// Returns `TagNotRegistered` for an undeclared tag.
    pub fn items(&self, tag: &str) -> Result<&[DetachedItem]> {
        self.tags.items(tag)
    }

    /// Declare a property tag `name` holding one `Property` item with `value`
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTag` if `name` is already declared.
    pub fn add_property(&mut self, name: &str, value: impl Into<Variant>) -> Result<()> {
        self.register_tag(TagInfo::property(name))?;
        let mut property = DetachedItem::new(PROPERTY_ITEM);
        property.set_data(Role::DATA, value)?;
        property.set_display_name(name)?;
        self.insert_item(property, &TagIndex::new(name, 0))
    }

    /// Value of a property created with [`DetachedItem::add_property`]
    pub fn property(&self, name: &str) -> Option<&Variant> {
        self.get_item(&TagIndex::new(name, 0))
            .and_then(|p| p.data(Role::DATA))
    }

    /// # Errors
    ///
    /// Returns `TagNotRegistered` if no such property exists, or
    /// `DataKindMismatch` for a value of another kind.
    pub fn set_property(&mut self, name: &str, value: impl Into<Variant>) -> Result<bool> {
        let property = self
            .get_item_mut(&TagIndex::new(name, 0))
            .ok_or_else(|| MvxError::TagNotRegistered {
                tag: name.to_string(),
            })?;
        property.set_data(Role::DATA, value)
    }

    /// Deep copy under the given identity policy
    pub fn clone_item(&self, mode: CloneMode) -> DetachedItem {
        let identifier = match mode {
            CloneMode::Fresh => ItemId::new(),
            CloneMode::Restore => self.identifier.clone(),
        };
        DetachedItem {
            model_type: self.model_type.clone(),
            identifier,
            data: self.data.clone(),
            tags: self.tags.map_ref(|child| child.clone_item(mode)),
        }
    }

    /// Identifiers of this item and every descendant, pre-order
    pub fn identifiers(&self) -> Vec<ItemId> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut Vec<ItemId>) {
        out.push(self.identifier.clone());
        for child in self.tags.all_children() {
            child.collect_identifiers(out);
        }
    }

    /// Number of items in the subtree, this one included
    pub fn subtree_len(&self) -> usize {
        1 + self
            .tags
            .all_children()
            .map(DetachedItem::subtree_len)
            .sum::<usize>()
    }
}
