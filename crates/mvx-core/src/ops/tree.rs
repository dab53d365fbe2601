use std::collections::HashSet;

use mvx_core_types::{ItemId, Role};

use super::pool::IdentifierPool;
use crate::errors::{MvxError, Result};
use crate::model::catalogue::ROOT_TAG;
use crate::model::tag::TagSlot;
use crate::model::{
    CloneMode, DetachedItem, Item, ItemCatalogue, ItemData, ItemHandle, ItemPath, TagIndex,
    TagInfo, TaggedItems, Variant,
};

#[derive(Debug)]
struct Slot {
    generation: u32,
    item: Option<Item>,
}

/// Arena that owns every item of one model
///
/// The root is always present. Parent and child links are handles into the
/// arena, so dropping the tree drops every item. All structural mutation is
/// crate-private: outside callers go through a composer so that every change
/// is paired with its notifications.
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ItemHandle,
    pool: IdentifierPool,
    catalogue: ItemCatalogue,
}

impl Tree {
    /// Create a tree holding only a fresh `SessionItem` root
    pub fn new(catalogue: ItemCatalogue) -> Self {
        let root = ItemHandle::new(0, 0);
        let identifier = ItemId::new();
        let item = Item {
            model_type: crate::model::catalogue::SESSION_ITEM.to_string(),
            identifier: identifier.clone(),
            parent: None,
            data: ItemData::new(),
            tags: TaggedItems {
                slots: vec![TagSlot {
                    info: TagInfo::universal(ROOT_TAG),
                    items: Vec::new(),
                }],
                default_tag: Some(ROOT_TAG.to_string()),
            },
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                item: Some(item),
            }],
            free: Vec::new(),
            root,
            pool: IdentifierPool::seeded(root, identifier),
            catalogue,
        }
    }

    /// Create a tree around an existing root subtree, keeping its identifiers
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the subtree repeats an identifier.
    pub fn with_root(catalogue: ItemCatalogue, root: DetachedItem) -> Result<Self> {
        let mut tree = Self::new(catalogue);
        tree.replace_root(root)?;
        Ok(tree)
    }

    pub fn root(&self) -> ItemHandle {
        self.root
    }

    pub fn pool(&self) -> &IdentifierPool {
        &self.pool
    }

    pub fn catalogue(&self) -> &ItemCatalogue {
        &self.catalogue
    }

    pub(crate) fn catalogue_mut(&mut self) -> &mut ItemCatalogue {
        &mut self.catalogue
    }

    /// Number of live items, root included
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.item.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: ItemHandle) -> bool {
        self.item(handle).is_ok()
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` if the handle is stale or foreign.
    pub fn item(&self, handle: ItemHandle) -> Result<&Item> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.item.as_ref())
            .ok_or_else(|| not_found(handle))
    }

    fn item_mut(&mut self, handle: ItemHandle) -> Result<&mut Item> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.item.as_mut())
            .ok_or_else(|| not_found(handle))
    }

    /// Child at a tag index
    ///
    /// # Errors
    ///
    /// Returns `TagNotRegistered` for an unknown tag or `SlotEmpty` if no child
    /// sits at the row.
    pub fn get_item(&self, parent: ItemHandle, tag_index: &TagIndex) -> Result<ItemHandle> {
        let tags = &self.item(parent)?.tags;
        let tag = tags.resolve_tag(&tag_index.tag)?;
        tags.items(tag)?
            .get(tag_index.row)
            .copied()
            .ok_or_else(|| MvxError::SlotEmpty {
                tag: tag.to_string(),
                row: tag_index.row,
            })
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` or `TagNotRegistered`.
    pub fn get_items(&self, parent: ItemHandle, tag: &str) -> Result<&[ItemHandle]> {
        self.item(parent)?.tags.items(tag)
    }

    /// All children, in tag declaration order
    pub fn children(&self, handle: ItemHandle) -> Result<Vec<ItemHandle>> {
        Ok(self.item(handle)?.tags.all_children().copied().collect())
    }

    pub fn parent(&self, handle: ItemHandle) -> Result<Option<ItemHandle>> {
        Ok(self.item(handle)?.parent)
    }

    /// Position of an item under its parent; `None` for the root
    pub fn tag_index_of(&self, handle: ItemHandle) -> Result<Option<TagIndex>> {
        Ok(self.location(handle)?.map(|(_, tag_index)| tag_index))
    }

    /// Parent and position of an item; `None` for the root
    pub fn location(&self, handle: ItemHandle) -> Result<Option<(ItemHandle, TagIndex)>> {
        let Some(parent) = self.item(handle)?.parent else {
            return Ok(None);
        };
        let tag_index = self
            .item(parent)?
            .tags
            .find_position(|c| *c == handle)
            .ok_or_else(|| MvxError::Internal {
                message: format!("{} is not listed under its parent {}", handle, parent),
            })?;
        Ok(Some((parent, tag_index)))
    }

    pub fn identifier(&self, handle: ItemHandle) -> Result<&ItemId> {
        Ok(&self.item(handle)?.identifier)
    }

    pub fn find_item(&self, identifier: &ItemId) -> Option<ItemHandle> {
        self.pool.find_by_key(identifier)
    }

    pub fn data(&self, handle: ItemHandle, role: Role) -> Result<Option<&Variant>> {
        Ok(self.item(handle)?.data.get(role))
    }

    /// Every item below `handle`, pre-order, not including `handle`
    pub fn descendants(&self, handle: ItemHandle) -> Result<Vec<ItemHandle>> {
        let mut out = Vec::new();
        let mut stack = self.children(handle)?;
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next)?;
            children.reverse();
            stack.extend(children);
        }
        Ok(out)
    }

    /// True if `ancestor` is `handle` or lies on its parent chain
    pub fn is_same_or_ancestor(&self, ancestor: ItemHandle, handle: ItemHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.item(h).ok().and_then(|item| item.parent);
        }
        false
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` for a stale handle.
    pub fn path_of(&self, handle: ItemHandle) -> Result<ItemPath> {
        let mut steps = Vec::new();
        let mut current = handle;
        while let Some((parent, tag_index)) = self.location(current)? {
            steps.push(tag_index);
            current = parent;
        }
        if current != self.root {
            return Err(not_found(handle));
        }
        steps.reverse();
        Ok(ItemPath::from_indices(steps))
    }

    /// # Errors
    ///
    /// Returns `PathNotResolved` if any step no longer exists.
    pub fn resolve_path(&self, path: &ItemPath) -> Result<ItemHandle> {
        let mut current = self.root;
        for step in path.indices() {
            current = self
                .get_item(current, step)
                .map_err(|_| MvxError::PathNotResolved {
                    path: path.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Items of one type, pre-order from the root
    pub fn find_items_by_type(&self, model_type: &str) -> Vec<ItemHandle> {
        let mut all = vec![self.root];
        all.extend(self.descendants(self.root).unwrap_or_default());
        all.into_iter()
            .filter(|h| {
                self.item(*h)
                    .map(|item| item.model_type == model_type)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Deep copy of a subtree as a detached item
    pub fn clone_subtree(&self, handle: ItemHandle, mode: CloneMode) -> Result<DetachedItem> {
        let item = self.item(handle)?;
        let identifier = match mode {
            CloneMode::Fresh => ItemId::new(),
            CloneMode::Restore => item.identifier.clone(),
        };
        Ok(DetachedItem {
            model_type: item.model_type.clone(),
            identifier,
            data: item.data.clone(),
            tags: item
                .tags
                .try_map(|child| self.clone_subtree(*child, mode))?,
        })
    }

    // ===== crate-private mutation =====

    /// Validate inserting `child` at `tag_index` under `parent`
    pub(crate) fn check_insert(
        &self,
        parent: ItemHandle,
        tag_index: &TagIndex,
        child: &DetachedItem,
    ) -> Result<(usize, usize)> {
        let position = self
            .item(parent)?
            .tags
            .insert_check(tag_index, &child.model_type)?;
        self.check_identifiers(child)?;
        Ok(position)
    }

    /// Reject subtrees whose identifiers collide with the pool or each other
    fn check_identifiers(&self, child: &DetachedItem) -> Result<()> {
        check_unique(child)?;
        match child
            .identifiers()
            .into_iter()
            .find(|id| self.pool.contains_key(id))
        {
            Some(identifier) => Err(MvxError::DuplicateKey {
                identifier: identifier.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Move a detached subtree into the arena under `parent`
    pub(crate) fn attach(
        &mut self,
        parent: ItemHandle,
        slot: usize,
        row: usize,
        child: DetachedItem,
    ) -> Result<ItemHandle> {
        self.item(parent)?;
        let handle = self.alloc(child, Some(parent))?;
        if let Err(e) = self.item_mut(parent)?.tags.insert_at(slot, row, handle) {
            self.release(handle)?;
            return Err(e);
        }
        Ok(handle)
    }

    fn alloc(&mut self, detached: DetachedItem, parent: Option<ItemHandle>) -> Result<ItemHandle> {
        let DetachedItem {
            model_type,
            identifier,
            data,
            tags,
        } = detached;
        let item = Item {
            model_type,
            identifier: identifier.clone(),
            parent,
            data,
            tags: TaggedItems::new(),
        };
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.item = Some(item);
                ItemHandle::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| MvxError::Internal {
                    message: "item arena exhausted".to_string(),
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    item: Some(item),
                });
                ItemHandle::new(index, 0)
            }
        };
        self.pool.register_item(handle, Some(identifier))?;

        let tags = tags.try_map_into(|child| self.alloc(child, Some(handle)))?;
        self.item_mut(handle)?.tags = tags;
        tracing::trace!(item = %handle, "allocated");
        Ok(handle)
    }

    /// Validate taking the child at `tag_index`
    pub(crate) fn check_take(
        &self,
        parent: ItemHandle,
        tag_index: &TagIndex,
        enforce: bool,
    ) -> Result<(usize, usize, ItemHandle)> {
        let tags = &self.item(parent)?.tags;
        let (slot, row) = tags.take_check(tag_index, enforce)?;
        Ok((slot, row, tags.slots[slot].items[row]))
    }

    /// Remove a child subtree from the arena and return it detached
    ///
    /// Descendants are deregistered from the pool silently.
    pub(crate) fn detach(&mut self, parent: ItemHandle, slot: usize, row: usize) -> Result<DetachedItem> {
        let handle = self.unlink(parent, slot, row)?;
        self.release(handle)
    }

    fn release(&mut self, handle: ItemHandle) -> Result<DetachedItem> {
        let item = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| {
                let item = slot.item.take();
                slot.generation = slot.generation.wrapping_add(1);
                item
            })
            .ok_or_else(|| not_found(handle))?;
        self.free.push(handle.index);
        if self.pool.unregister_item(handle).is_err() {
            tracing::warn!(item = %handle, "released item had no identifier");
        }

        let Item {
            model_type,
            identifier,
            data,
            tags,
            ..
        } = item;
        let children = tags.try_map_into(|child| self.release(child))?;
        Ok(DetachedItem {
            model_type,
            identifier,
            data,
            tags: children,
        })
    }

    /// Detach a child from its parent without freeing it
    pub(crate) fn unlink(&mut self, parent: ItemHandle, slot: usize, row: usize) -> Result<ItemHandle> {
        let handle = self.item_mut(parent)?.tags.remove_at(slot, row)?;
        self.item_mut(handle)?.parent = None;
        Ok(handle)
    }

    /// Re-attach an unlinked item under a new parent, keeping its handle
    pub(crate) fn link(
        &mut self,
        parent: ItemHandle,
        slot: usize,
        row: usize,
        child: ItemHandle,
    ) -> Result<()> {
        self.item_mut(parent)?.tags.insert_at(slot, row, child)?;
        self.item_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub(crate) fn set_data(&mut self, handle: ItemHandle, role: Role, value: Variant) -> Result<bool> {
        self.item_mut(handle)?.data.set(role, value)
    }

    pub(crate) fn remove_data(&mut self, handle: ItemHandle, role: Role) -> Result<Option<Variant>> {
        Ok(self.item_mut(handle)?.data.remove(role))
    }

    pub(crate) fn register_tag(&mut self, handle: ItemHandle, info: TagInfo, set_default: bool) -> Result<()> {
        self.item_mut(handle)?.tags.register_tag(info, set_default)
    }

    pub(crate) fn unregister_tag(&mut self, handle: ItemHandle, tag: &str) -> Result<TagInfo> {
        self.item_mut(handle)?.tags.unregister_tag(tag)
    }

    /// Swap in a new root subtree and return the old one detached
    pub(crate) fn replace_root(&mut self, root: DetachedItem) -> Result<DetachedItem> {
        check_unique(&root)?;
        let old = self.release(self.root)?;
        self.pool.clear();
        self.root = self.alloc(root, None)?;
        Ok(old)
    }

    /// Drop every item; the root handle becomes stale
    pub(crate) fn dispose(&mut self) {
        if self.release(self.root).is_err() {
            tracing::debug!("tree already disposed");
        }
        self.pool.clear();
    }
}

/// Reject subtrees that repeat an identifier internally
pub(crate) fn check_unique(subtree: &DetachedItem) -> Result<()> {
    let mut seen = HashSet::new();
    for identifier in subtree.identifiers() {
        if !seen.insert(identifier.clone()) {
            return Err(MvxError::DuplicateKey {
                identifier: identifier.to_string(),
            });
        }
    }
    Ok(())
}

fn not_found(handle: ItemHandle) -> MvxError {
    MvxError::ItemNotFound {
        item: handle.to_string(),
    }
}
