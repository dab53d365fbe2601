//! Mutation gateway
//!
//! Every change to a tree goes through a composer, which couples the change
//! with its notifications:
//!
//! 1. check preconditions, failing without side effects
//! 2. emit the about-to event
//! 3. mutate the tree
//! 4. emit the completion event
//!
//! [`Composer`] does exactly that. [`CommandComposer`] decorates it: each call
//! is wrapped in a command and executed through a [`CommandStack`], so the
//! change becomes undoable.
//!
//! ## Example
//!
//! ```
//! use mvx_core::composer::{Composer, ModelComposer};
//! use mvx_core::events::EventNotifier;
//! use mvx_core::model::{DetachedItem, ItemCatalogue, TagIndex};
//! use mvx_core::ops::Tree;
//!
//! let mut tree = Tree::new(ItemCatalogue::default());
//! let notifier = EventNotifier::new();
//! let root = tree.root();
//!
//! let mut composer = Composer::new(&mut tree, &notifier);
//! let item = composer
//!     .insert_item(DetachedItem::new("Compound"), root, &TagIndex::append(""))
//!     .unwrap();
//! assert_eq!(tree.parent(item).unwrap(), Some(root));
//! ```

use mvx_core_types::Role;

use crate::commands::{
    CommandStack, InsertItemCommand, MoveItemCommand, RegisterTagCommand, RemoveItemCommand,
    SetDataCommand,
};
use crate::errors::{MvxError, Result};
use crate::events::{EventNotifier, ModelEvent};
use crate::model::{
    new_root_item, CloneMode, DetachedItem, ItemHandle, TagIndex, TagInfo, Variant,
};
use crate::ops::tree::check_unique;
use crate::ops::Tree;

/// Mutation operations shared by the plain and the recording composer
pub trait ModelComposer {
    fn tree(&self) -> &Tree;

    /// Declare a tag on an attached item
    ///
    /// Tags carry no events; listeners see the tag when children arrive.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTag` if the name is already declared.
    fn register_tag(&mut self, item: ItemHandle, info: TagInfo, set_default: bool) -> Result<()>;

    /// Insert a detached subtree under `parent`
    ///
    /// # Errors
    ///
    /// - `TagNotRegistered`, `TypeNotAllowed`, `TagFull`, `RowOutOfRange` (constraint)
    /// - `PropertyImmutable` when the property tag is already filled
    /// - `DuplicateKey` if an identifier of the subtree is already in use
    fn insert_item(
        &mut self,
        item: DetachedItem,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle>;

    /// Remove the child at `tag_index` and return it detached
    ///
    /// # Errors
    ///
    /// - `SlotEmpty` if no child sits there
    /// - `PropertyImmutable` for property tags
    /// - `BelowMinimum` for bounded tags at their minimum
    fn take_item(&mut self, parent: ItemHandle, tag_index: &TagIndex) -> Result<DetachedItem>;

    /// Store a value; `Ok(false)` and no event when it equals the current one
    ///
    /// # Errors
    ///
    /// Returns `DataKindMismatch` if the role holds a value of another kind.
    fn set_data(&mut self, item: ItemHandle, role: Role, value: Variant) -> Result<bool>;

    /// Move an attached item, keeping its identity
    ///
    /// # Errors
    ///
    /// - `RootImmutable` for the root
    /// - `IllegalMove` when the target is the item or one of its descendants
    /// - any insertion or take error of the two ends
    fn move_item(
        &mut self,
        item: ItemHandle,
        new_parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<()>;

    /// Insert a copy of `item` with fresh identifiers
    ///
    /// # Errors
    ///
    /// Same as [`ModelComposer::insert_item`].
    fn copy_item(
        &mut self,
        item: ItemHandle,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let copy = self.tree().clone_subtree(item, CloneMode::Fresh)?;
        self.insert_item(copy, parent, tag_index)
    }
}

/// Composer that mutates and notifies
pub struct Composer<'a> {
    tree: &'a mut Tree,
    notifier: &'a EventNotifier,
    command_in_progress: bool,
}

impl<'a> Composer<'a> {
    pub fn new(tree: &'a mut Tree, notifier: &'a EventNotifier) -> Self {
        Self {
            tree,
            notifier,
            command_in_progress: false,
        }
    }

    /// Composer used by commands; listeners may not mutate while it runs
    pub(crate) fn for_command(tree: &'a mut Tree, notifier: &'a EventNotifier) -> Self {
        Self {
            tree,
            notifier,
            command_in_progress: true,
        }
    }

    fn emit(&mut self, event: ModelEvent) {
        self.notifier
            .notify(&event, &mut *self.tree, self.command_in_progress);
    }

    fn resolved(&self, parent: ItemHandle, tag_index: &TagIndex, row: usize) -> Result<TagIndex> {
        let tag = self
            .tree
            .item(parent)?
            .tags()
            .resolve_tag(&tag_index.tag)?
            .to_string();
        Ok(TagIndex::new(tag, row))
    }

    /// Current position of an announced child
    ///
    /// Listeners may shift its siblings while the about-to event is
    /// delivered; the child must still sit under `parent`.
    fn relocate(&self, child: ItemHandle, parent: ItemHandle) -> Result<TagIndex> {
        match self.tree.location(child)? {
            Some((p, at)) if p == parent => Ok(at),
            _ => Err(MvxError::ItemNotFound {
                item: format!("{} under {}", child, parent),
            }),
        }
    }

    /// Take with optional capacity enforcement
    ///
    /// Undo of an insertion passes `enforce = false` so that a filled
    /// property tag or a bounded tag at its minimum can be restored exactly.
    pub(crate) fn take_with(
        &mut self,
        parent: ItemHandle,
        tag_index: &TagIndex,
        enforce: bool,
    ) -> Result<DetachedItem> {
        let (_, row, _) = self.tree.check_take(parent, tag_index, enforce)?;
        let at = self.resolved(parent, tag_index, row)?;
        let child = self.tree.get_item(parent, &at)?;
        tracing::debug!(parent = %parent, tag_index = %at, "take item");

        self.emit(ModelEvent::AboutToRemoveItem {
            parent,
            tag_index: at.clone(),
        });
        let at = self.relocate(child, parent)?;
        let (slot, row, _) = self.tree.check_take(parent, &at, enforce)?;
        let detached = self.tree.detach(parent, slot, row)?;
        self.emit(ModelEvent::ItemRemoved {
            parent,
            tag_index: at,
        });
        Ok(detached)
    }

    /// Withdraw an empty tag, the reverse of [`ModelComposer::register_tag`]
    pub(crate) fn unregister_tag(&mut self, item: ItemHandle, tag: &str) -> Result<TagInfo> {
        tracing::debug!(item = %item, tag, "unregister tag");
        self.tree.unregister_tag(item, tag)
    }

    /// Drop a role's value, emitting `DataChanged` if there was one
    pub(crate) fn remove_data(&mut self, item: ItemHandle, role: Role) -> Result<Option<Variant>> {
        let old = self.tree.remove_data(item, role)?;
        if old.is_some() {
            self.emit(ModelEvent::DataChanged { item, role });
        }
        Ok(old)
    }

    /// Replace the root, bracketed by the reset events
    ///
    /// Returns the previous root detached.
    pub(crate) fn reset(&mut self, root: Option<DetachedItem>) -> Result<DetachedItem> {
        let root = match root {
            Some(root) => root,
            None => new_root_item()?,
        };
        check_unique(&root)?;
        tracing::debug!(model_type = root.model_type(), "reset");

        self.emit(ModelEvent::ModelAboutToBeReset);
        let old = self.tree.replace_root(root)?;
        self.emit(ModelEvent::ModelReset);
        Ok(old)
    }
}

impl ModelComposer for Composer<'_> {
    fn tree(&self) -> &Tree {
        &*self.tree
    }

    fn register_tag(&mut self, item: ItemHandle, info: TagInfo, set_default: bool) -> Result<()> {
        tracing::debug!(item = %item, tag = %info.name, "register tag");
        self.tree.register_tag(item, info, set_default)
    }

    fn insert_item(
        &mut self,
        item: DetachedItem,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let (_, row) = self.tree.check_insert(parent, tag_index, &item)?;
        let at = self.resolved(parent, tag_index, row)?;
        tracing::debug!(parent = %parent, tag_index = %at, model_type = item.model_type(), "insert item");

        self.emit(ModelEvent::AboutToInsertItem {
            parent,
            tag_index: at.clone(),
        });
        let (slot, row) = self.tree.check_insert(parent, &at, &item)?;
        let handle = self.tree.attach(parent, slot, row, item)?;
        self.emit(ModelEvent::ItemInserted {
            parent,
            tag_index: at,
        });
        Ok(handle)
    }

    fn take_item(&mut self, parent: ItemHandle, tag_index: &TagIndex) -> Result<DetachedItem> {
        self.take_with(parent, tag_index, true)
    }

    fn set_data(&mut self, item: ItemHandle, role: Role, value: Variant) -> Result<bool> {
        let changed = self.tree.set_data(item, role, value)?;
        if changed {
            tracing::trace!(item = %item, role = %role, "data changed");
            self.emit(ModelEvent::DataChanged { item, role });
        }
        Ok(changed)
    }

    fn move_item(
        &mut self,
        item: ItemHandle,
        new_parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<()> {
        let Some((old_parent, old_index)) = self.tree.location(item)? else {
            return Err(MvxError::RootImmutable {
                op: "move".to_string(),
            });
        };
        if self.tree.is_same_or_ancestor(item, new_parent) {
            return Err(MvxError::IllegalMove {
                reason: format!("{} cannot become its own descendant", item),
            });
        }

        let target_tags = self.tree.item(new_parent)?.tags();
        let target_tag = target_tags.resolve_tag(&tag_index.tag)?.to_string();
        let same_group = old_parent == new_parent && old_index.tag == target_tag;
        let target_row = if same_group {
            // The item leaves the group before it re-enters, so the last
            // valid row is one less than the current length.
            let last = target_tags.items(&target_tag)?.len() - 1;
            let row = if tag_index.is_append() {
                last
            } else {
                tag_index.row
            };
            if row > last {
                return Err(MvxError::RowOutOfRange {
                    tag: target_tag,
                    row,
                    len: last,
                });
            }
            row
        } else {
            let model_type = self.tree.item(item)?.model_type().to_string();
            let (_, row) = target_tags.insert_check(tag_index, &model_type)?;
            row
        };
        self.tree.check_take(old_parent, &old_index, !same_group)?;
        let target = TagIndex::new(target_tag, target_row);
        tracing::debug!(item = %item, from = %old_index, to = %target, "move item");

        self.emit(ModelEvent::AboutToRemoveItem {
            parent: old_parent,
            tag_index: old_index.clone(),
        });
        let old_index_now = self.relocate(item, old_parent)?;
        let (slot, row, _) = self.tree.check_take(old_parent, &old_index_now, false)?;
        self.tree.unlink(old_parent, slot, row)?;
        self.emit(ModelEvent::ItemRemoved {
            parent: old_parent,
            tag_index: old_index_now,
        });

        self.emit(ModelEvent::AboutToInsertItem {
            parent: new_parent,
            tag_index: target.clone(),
        });
        let slot = self.tree.item(new_parent)?.tags().slot_position(&target.tag)?;
        self.tree.link(new_parent, slot, target.row, item)?;
        self.emit(ModelEvent::ItemInserted {
            parent: new_parent,
            tag_index: target,
        });
        Ok(())
    }
}

/// Composer that records every mutation as an undoable command
pub struct CommandComposer<'a> {
    tree: &'a mut Tree,
    notifier: &'a EventNotifier,
    stack: &'a mut CommandStack,
}

impl<'a> CommandComposer<'a> {
    pub fn new(tree: &'a mut Tree, notifier: &'a EventNotifier, stack: &'a mut CommandStack) -> Self {
        Self {
            tree,
            notifier,
            stack,
        }
    }

    pub fn stack(&self) -> &CommandStack {
        self.stack
    }
}

impl ModelComposer for CommandComposer<'_> {
    fn tree(&self) -> &Tree {
        &*self.tree
    }

    fn register_tag(&mut self, item: ItemHandle, info: TagInfo, set_default: bool) -> Result<()> {
        let command = RegisterTagCommand::new(self.tree.path_of(item)?, info, set_default);
        self.stack
            .execute(Box::new(command), &mut *self.tree, self.notifier)
            .map(|_| ())
    }

    fn insert_item(
        &mut self,
        item: DetachedItem,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let command = InsertItemCommand::new(self.tree.path_of(parent)?, tag_index.clone(), item);
        self.stack
            .execute(Box::new(command), &mut *self.tree, self.notifier)?
            .into_inserted()
    }

    fn take_item(&mut self, parent: ItemHandle, tag_index: &TagIndex) -> Result<DetachedItem> {
        let command = RemoveItemCommand::new(self.tree.path_of(parent)?, tag_index.clone());
        self.stack
            .execute(Box::new(command), &mut *self.tree, self.notifier)?
            .into_removed()
    }

    fn set_data(&mut self, item: ItemHandle, role: Role, value: Variant) -> Result<bool> {
        let command = SetDataCommand::new(self.tree.path_of(item)?, role, value);
        self.stack
            .execute(Box::new(command), &mut *self.tree, self.notifier)?
            .into_changed()
    }

    fn move_item(
        &mut self,
        item: ItemHandle,
        new_parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<()> {
        let command = MoveItemCommand::new(
            self.tree.identifier(item)?.clone(),
            self.tree.identifier(new_parent)?.clone(),
            tag_index.clone(),
        );
        self.stack
            .execute(Box::new(command), &mut *self.tree, self.notifier)
            .map(|_| ())
    }
}
