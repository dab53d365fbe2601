use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MvxError, Result};

/// How many children a tag may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagCapacity {
    Unbounded,
    /// Exactly one child, fixed for the item's lifetime
    Property,
    Bounded { min: usize, max: usize },
}

/// Declaration of one named child group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub capacity: TagCapacity,
    /// Accepted child types; empty accepts any type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_types: Vec<String>,
}

impl TagInfo {
    pub fn universal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: TagCapacity::Unbounded,
            model_types: Vec::new(),
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: TagCapacity::Property,
            model_types: Vec::new(),
        }
    }

    pub fn bounded(name: impl Into<String>, min: usize, max: usize) -> Self {
        Self {
            name: name.into(),
            capacity: TagCapacity::Bounded { min, max },
            model_types: Vec::new(),
        }
    }

    pub fn with_model_types<I, S>(mut self, model_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_types = model_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_property(&self) -> bool {
        self.capacity == TagCapacity::Property
    }

    pub fn accepts(&self, model_type: &str) -> bool {
        self.model_types.is_empty() || self.model_types.iter().any(|t| t == model_type)
    }
}

/// Address of one child slot: tag name plus position
///
/// An empty tag name addresses the parent's default tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagIndex {
    pub tag: String,
    pub row: usize,
}

impl TagIndex {
    pub fn new(tag: impl Into<String>, row: usize) -> Self {
        Self {
            tag: tag.into(),
            row,
        }
    }

    /// Position after the last child of `tag`
    pub fn append(tag: impl Into<String>) -> Self {
        Self::new(tag, usize::MAX)
    }

    pub fn is_append(&self) -> bool {
        self.row == usize::MAX
    }
}

impl fmt::Display for TagIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_append() {
            write!(f, "{}[+]", self.tag)
        } else {
            write!(f, "{}[{}]", self.tag, self.row)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TagSlot<C> {
    pub(crate) info: TagInfo,
    pub(crate) items: Vec<C>,
}

/// Ordered tag groups of one item
///
/// Generic over the child representation so the same capacity rules serve
/// arena items (`C = ItemHandle`) and detached subtrees (`C = DetachedItem`).
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedItems<C> {
    pub(crate) slots: Vec<TagSlot<C>>,
    pub(crate) default_tag: Option<String>,
}

impl<C> Default for TaggedItems<C> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            default_tag: None,
        }
    }
}

impl<C> TaggedItems<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tag; the first tag registered with `set_default` becomes the default
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTag` if the name is already declared.
    pub fn register_tag(&mut self, info: TagInfo, set_default: bool) -> Result<()> {
        if self.slots.iter().any(|s| s.info.name == info.name) {
            return Err(MvxError::DuplicateTag { tag: info.name });
        }
        if set_default {
            self.default_tag = Some(info.name.clone());
        }
        self.slots.push(TagSlot {
            info,
            items: Vec::new(),
        });
        Ok(())
    }

    /// Withdraw an empty tag; the default tag falls back to none
    ///
    /// # Errors
    ///
    /// Returns `TagNotRegistered` or `TagNotEmpty`.
    pub(crate) fn unregister_tag(&mut self, tag: &str) -> Result<TagInfo> {
        let slot = self.slot_position(tag)?;
        let len = self.slots[slot].items.len();
        if len > 0 {
            return Err(MvxError::TagNotEmpty {
                tag: self.slots[slot].info.name.clone(),
                len,
            });
        }
        let removed = self.slots.remove(slot);
        if self.default_tag.as_deref() == Some(removed.info.name.as_str()) {
            self.default_tag = None;
        }
        Ok(removed.info)
    }

    pub fn default_tag(&self) -> Option<&str> {
        self.default_tag.as_deref()
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.slot_position(tag).is_ok()
    }

    pub fn tag_infos(&self) -> impl Iterator<Item = &TagInfo> {
        self.slots.iter().map(|s| &s.info)
    }

    /// Resolve an empty name to the default tag
    pub fn resolve_tag<'a>(&'a self, tag: &'a str) -> Result<&'a str> {
        if !tag.is_empty() {
            return Ok(tag);
        }
        self.default_tag
            .as_deref()
            .ok_or_else(|| MvxError::TagNotRegistered { tag: String::new() })
    }

    pub(crate) fn slot_position(&self, tag: &str) -> Result<usize> {
        let name = self.resolve_tag(tag)?;
        self.slots
            .iter()
            .position(|s| s.info.name == name)
            .ok_or_else(|| MvxError::TagNotRegistered {
                tag: name.to_string(),
            })
    }

    /// Validate an insertion and return the concrete (slot, row)
    ///
    /// # Errors
    ///
    /// - `TagNotRegistered` for an undeclared tag
    /// - `TypeNotAllowed` if the tag restricts child types
    /// - `PropertyImmutable` if a property tag is already filled
    /// - `TagFull` if a bounded tag is at its maximum
    /// - `RowOutOfRange` if the row is past the end
    pub(crate) fn insert_check(
        &self,
        tag_index: &TagIndex,
        model_type: &str,
    ) -> Result<(usize, usize)> {
        let pos = self.slot_position(&tag_index.tag)?;
        let slot = &self.slots[pos];
        let len = slot.items.len();
        if !slot.info.accepts(model_type) {
            return Err(MvxError::TypeNotAllowed {
                tag: slot.info.name.clone(),
                model_type: model_type.to_string(),
            });
        }
        match slot.info.capacity {
            TagCapacity::Property if len >= 1 => {
                return Err(MvxError::PropertyImmutable {
                    tag: slot.info.name.clone(),
                    op: "insert".to_string(),
                });
            }
            TagCapacity::Bounded { max, .. } if len >= max => {
                return Err(MvxError::TagFull {
                    tag: slot.info.name.clone(),
                    max,
                });
            }
            _ => {}
        }
        let row = if tag_index.is_append() {
            len
        } else {
            tag_index.row
        };
        if row > len {
            return Err(MvxError::RowOutOfRange {
                tag: slot.info.name.clone(),
                row,
                len,
            });
        }
        Ok((pos, row))
    }

    /// Validate a removal and return the concrete (slot, row)
    ///
    /// With `enforce` false the capacity rules are skipped; undo of an
    /// insertion uses this to restore the previous shape exactly.
    ///
    /// # Errors
    ///
    /// - `TagNotRegistered` for an undeclared tag
    /// - `PropertyImmutable` for a property tag
    /// - `SlotEmpty` if nothing sits at the row
    /// - `BelowMinimum` if a bounded tag would drop under its minimum
    pub(crate) fn take_check(&self, tag_index: &TagIndex, enforce: bool) -> Result<(usize, usize)> {
        let pos = self.slot_position(&tag_index.tag)?;
        let slot = &self.slots[pos];
        let len = slot.items.len();
        if enforce && slot.info.is_property() {
            return Err(MvxError::PropertyImmutable {
                tag: slot.info.name.clone(),
                op: "take".to_string(),
            });
        }
        let row = if tag_index.is_append() {
            len.checked_sub(1).unwrap_or(len)
        } else {
            tag_index.row
        };
        if row >= len {
            return Err(MvxError::SlotEmpty {
                tag: slot.info.name.clone(),
                row: tag_index.row,
            });
        }
        if let TagCapacity::Bounded { min, .. } = slot.info.capacity {
            if enforce && len <= min {
                return Err(MvxError::BelowMinimum {
                    tag: slot.info.name.clone(),
                    min,
                });
            }
        }
        Ok((pos, row))
    }

    pub(crate) fn insert_at(&mut self, slot: usize, row: usize, child: C) -> Result<()> {
        let slot = self.slot_mut(slot)?;
        let len = slot.items.len();
        if row > len {
            return Err(MvxError::RowOutOfRange {
                tag: slot.info.name.clone(),
                row,
                len,
            });
        }
        slot.items.insert(row, child);
        Ok(())
    }

    pub(crate) fn remove_at(&mut self, slot: usize, row: usize) -> Result<C> {
        let slot = self.slot_mut(slot)?;
        if row >= slot.items.len() {
            return Err(MvxError::SlotEmpty {
                tag: slot.info.name.clone(),
                row,
            });
        }
        Ok(slot.items.remove(row))
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut TagSlot<C>> {
        self.slots.get_mut(slot).ok_or_else(|| MvxError::Internal {
            message: format!("tag slot {} does not exist", slot),
        })
    }

    pub fn get(&self, tag_index: &TagIndex) -> Option<&C> {
        let pos = self.slot_position(&tag_index.tag).ok()?;
        self.slots[pos].items.get(tag_index.row)
    }

    /// Children of one tag, in order
    ///
    /// # Errors
    ///
    /// Returns `TagNotRegistered` for an undeclared tag.
    pub fn items(&self, tag: &str) -> Result<&[C]> {
        let pos = self.slot_position(tag)?;
        Ok(&self.slots[pos].items)
    }

    /// All children across tags, in tag declaration order
    pub fn all_children(&self) -> impl Iterator<Item = &C> {
        self.slots.iter().flat_map(|s| s.items.iter())
    }

    pub fn child_count(&self) -> usize {
        self.slots.iter().map(|s| s.items.len()).sum()
    }

    /// Locate a child by predicate
    pub fn find_position<F>(&self, mut pred: F) -> Option<TagIndex>
    where
        F: FnMut(&C) -> bool,
    {
        self.slots.iter().find_map(|slot| {
            slot.items
                .iter()
                .position(&mut pred)
                .map(|row| TagIndex::new(slot.info.name.clone(), row))
        })
    }

    /// Rebuild with a different child representation, keeping tag layout
    pub(crate) fn try_map<D, F>(&self, mut f: F) -> Result<TaggedItems<D>>
    where
        F: FnMut(&C) -> Result<D>,
    {
        let mut slots = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let items = slot.items.iter().map(&mut f).collect::<Result<Vec<D>>>()?;
            slots.push(TagSlot {
                info: slot.info.clone(),
                items,
            });
        }
        Ok(TaggedItems {
            slots,
            default_tag: self.default_tag.clone(),
        })
    }

    pub(crate) fn map_ref<D, F>(&self, mut f: F) -> TaggedItems<D>
    where
        F: FnMut(&C) -> D,
    {
        TaggedItems {
            slots: self
                .slots
                .iter()
                .map(|slot| TagSlot {
                    info: slot.info.clone(),
                    items: slot.items.iter().map(&mut f).collect(),
                })
                .collect(),
            default_tag: self.default_tag.clone(),
        }
    }

    /// Consuming variant of [`TaggedItems::try_map`]
    pub(crate) fn try_map_into<D, F>(self, mut f: F) -> Result<TaggedItems<D>>
    where
        F: FnMut(C) -> Result<D>,
    {
        let mut slots = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let items = slot.items.into_iter().map(&mut f).collect::<Result<Vec<D>>>()?;
            slots.push(TagSlot {
                info: slot.info,
                items,
            });
        }
        Ok(TaggedItems {
            slots,
            default_tag: self.default_tag,
        })
    }
}
