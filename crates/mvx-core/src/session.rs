//! Session model facade
//!
//! `SessionModel` owns a tree, its notifier and an optional command stack,
//! and routes every mutation through the composer its configuration selects:
//! with undo/redo enabled each mutation becomes a recorded command.
//!
//! ## Logging Ownership
//!
//! This is the logging boundary of the kernel:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success, with the undo stack position
//! - `log_op_error!` on failure
//!
//! Each event carries an `OpContext` naming the addressed item, tag, row
//! or role.
//!
//! Lower layers (tree, composer, command stack) use only `tracing::debug!()`
//! and `tracing::trace!()`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use mvx_core_types::{ItemId, Role};

use crate::commands::CommandStack;
use crate::composer::{CommandComposer, Composer, ModelComposer};
use crate::config::SessionConfig;
use crate::errors::{MvxError, Result};
use crate::events::{EventNotifier, ModelEvent, ModelListener, Subscription};
use crate::logging_facility::OpContext;
use crate::model::{DetachedItem, ItemCatalogue, ItemHandle, TagIndex, TagInfo, Variant};
use crate::ops::Tree;
use crate::persist::ModelRecord;
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug)]
pub struct SessionModel {
    model_type: String,
    tree: Tree,
    notifier: EventNotifier,
    undo_stack: Option<CommandStack>,
    undo_limit: usize,
    destroyed: bool,
}

impl SessionModel {
    /// Model with the built-in item catalogue and undo/redo disabled
    pub fn new(model_type: impl Into<String>) -> Self {
        Self::with_catalogue(model_type, ItemCatalogue::default())
    }

    pub fn with_catalogue(model_type: impl Into<String>, catalogue: ItemCatalogue) -> Self {
        Self {
            model_type: model_type.into(),
            tree: Tree::new(catalogue),
            notifier: EventNotifier::new(),
            undo_stack: None,
            undo_limit: 0,
            destroyed: false,
        }
    }

    pub fn with_config(model_type: impl Into<String>, config: &SessionConfig) -> Self {
        let mut model = Self::new(model_type);
        model.undo_limit = config.undo.limit;
        if config.undo.enabled {
            model.undo_stack = Some(CommandStack::with_limit(config.undo.limit));
        }
        model
    }

    /// Rebuild a model from a record, keeping its identifiers
    ///
    /// # Errors
    ///
    /// Fails if the record violates tag rules or repeats identifiers.
    pub fn from_record(record: ModelRecord, catalogue: ItemCatalogue) -> Result<Self> {
        let root = record.root.into_detached()?;
        Ok(Self {
            model_type: record.model_type,
            tree: Tree::with_root(catalogue, root)?,
            notifier: EventNotifier::new(),
            undo_stack: None,
            undo_limit: 0,
            destroyed: false,
        })
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    pub fn root_item(&self) -> ItemHandle {
        self.tree.root()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Add or replace a type in this model's item catalogue
    pub fn register_item_type<F>(&mut self, model_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<DetachedItem> + 'static,
    {
        self.tree.catalogue_mut().register(model_type, factory);
    }

    fn logged<T>(
        &mut self,
        op: &'static str,
        context: OpContext,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        log_op_start!(op, context = context);
        let start = Instant::now();
        match f(self) {
            Ok(value) => {
                let context = match self.undo_stack.as_ref() {
                    Some(stack) => context.with_stack(stack),
                    None => context,
                };
                log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64, context = context);
                Ok(value)
            }
            Err(e) => {
                log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64, context = context);
                Err(e)
            }
        }
    }

    fn context(&self) -> OpContext {
        OpContext::new(self.model_type.clone())
    }

    /// Context naming `item` when it is live
    fn item_context(&self, item: ItemHandle) -> OpContext {
        match self.tree.identifier(item) {
            Ok(id) => self.context().with_item_id(id.to_string()),
            Err(_) => self.context(),
        }
    }

    fn with_composer<T>(&mut self, f: impl FnOnce(&mut dyn ModelComposer) -> Result<T>) -> Result<T> {
        if self.destroyed {
            return Err(MvxError::ModelDestroyed);
        }
        match self.undo_stack.as_mut() {
            Some(stack) => f(&mut CommandComposer::new(&mut self.tree, &self.notifier, stack)),
            None => f(&mut Composer::new(&mut self.tree, &self.notifier)),
        }
    }

    // ===== mutation =====

    /// Declare a tag on an attached item; recorded when undo/redo is enabled
    ///
    /// # Errors
    ///
    /// See [`ModelComposer::register_tag`].
    pub fn register_tag(&mut self, item: ItemHandle, info: TagInfo, set_default: bool) -> Result<()> {
        let context = self.item_context(item).with_tag(info.name.clone());
        self.logged("register_tag", context, |m| {
            m.with_composer(|c| c.register_tag(item, info, set_default))
        })
    }

    /// # Errors
    ///
    /// See [`ModelComposer::insert_item`].
    pub fn insert_item(
        &mut self,
        item: DetachedItem,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let context = self
            .context()
            .with_item_id(item.identifier().to_string())
            .with_tag_index(tag_index);
        self.logged("insert_item", context, |m| {
            m.with_composer(|c| c.insert_item(item, parent, tag_index))
        })
    }

    /// Create an item through the catalogue and insert it
    ///
    /// # Errors
    ///
    /// Returns `UnknownModelType` for unregistered types, or any insertion error.
    pub fn insert_new_item(
        &mut self,
        model_type: &str,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let context = self.item_context(parent).with_tag_index(tag_index);
        self.logged("insert_new_item", context, |m| {
            let item = m.tree.catalogue().create(model_type)?;
            m.with_composer(|c| c.insert_item(item, parent, tag_index))
        })
    }

    /// # Errors
    ///
    /// See [`ModelComposer::take_item`].
    pub fn take_item(&mut self, parent: ItemHandle, tag_index: &TagIndex) -> Result<DetachedItem> {
        let context = match self.tree.get_item(parent, tag_index) {
            Ok(child) => self.item_context(child),
            Err(_) => self.context(),
        }
        .with_tag_index(tag_index);
        self.logged("take_item", context, |m| {
            m.with_composer(|c| c.take_item(parent, tag_index))
        })
    }

    /// Remove an item wherever it sits
    ///
    /// # Errors
    ///
    /// Returns `RootImmutable` for the root, or any take error.
    pub fn remove_item(&mut self, item: ItemHandle) -> Result<DetachedItem> {
        let context = self.item_context(item);
        let context = match self.tree.tag_index_of(item) {
            Ok(Some(at)) => context.with_tag_index(&at),
            _ => context,
        };
        self.logged("remove_item", context, |m| {
            let (parent, tag_index) =
                m.tree
                    .location(item)?
                    .ok_or_else(|| MvxError::RootImmutable {
                        op: "remove".to_string(),
                    })?;
            m.with_composer(|c| c.take_item(parent, &tag_index))
        })
    }

    /// # Errors
    ///
    /// See [`ModelComposer::move_item`].
    pub fn move_item(
        &mut self,
        item: ItemHandle,
        new_parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<()> {
        let context = self.item_context(item).with_tag_index(tag_index);
        self.logged("move_item", context, |m| {
            m.with_composer(|c| c.move_item(item, new_parent, tag_index))
        })
    }

    /// # Errors
    ///
    /// See [`ModelComposer::copy_item`].
    pub fn copy_item(
        &mut self,
        item: ItemHandle,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        let context = self.item_context(item).with_tag_index(tag_index);
        self.logged("copy_item", context, |m| {
            m.with_composer(|c| c.copy_item(item, parent, tag_index))
        })
    }

    /// Store a value; `Ok(false)` when unchanged, with no event and no command
    ///
    /// # Errors
    ///
    /// See [`ModelComposer::set_data`].
    pub fn set_data(
        &mut self,
        item: ItemHandle,
        role: Role,
        value: impl Into<Variant>,
    ) -> Result<bool> {
        let value = value.into();
        let context = self.item_context(item).with_role(role);
        self.logged("set_data", context, |m| {
            m.with_composer(|c| c.set_data(item, role, value))
        })
    }

    // ===== queries =====

    /// # Errors
    ///
    /// Returns `ItemNotFound` for a stale handle.
    pub fn data(&self, item: ItemHandle, role: Role) -> Result<Option<&Variant>> {
        self.tree.data(item, role)
    }

    pub fn find_item(&self, identifier: &ItemId) -> Option<ItemHandle> {
        self.tree.find_item(identifier)
    }

    // ===== subscription =====

    pub fn subscribe<L>(&self, listener: &Rc<RefCell<L>>) -> Subscription
    where
        L: ModelListener + 'static,
    {
        self.notifier.subscribe(listener)
    }

    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ModelEvent, &mut crate::events::EventContext<'_>) + 'static,
    {
        self.notifier.subscribe_fn(callback)
    }

    // ===== undo/redo =====

    /// Turn command recording on or off; turning it off drops the history
    ///
    /// A re-created stack keeps the last configured undo limit.
    pub fn set_undo_redo_enabled(&mut self, enabled: bool) {
        match (enabled, self.undo_stack.is_some()) {
            (true, false) => self.undo_stack = Some(CommandStack::with_limit(self.undo_limit)),
            (false, true) => self.undo_stack = None,
            _ => {}
        }
    }

    pub fn undo_stack(&self) -> Option<&CommandStack> {
        self.undo_stack.as_ref()
    }

    fn with_stack<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut CommandStack, &mut Tree, &EventNotifier) -> Result<T>,
    ) -> Result<T> {
        if self.destroyed {
            return Err(MvxError::ModelDestroyed);
        }
        let stack = self
            .undo_stack
            .as_mut()
            .ok_or_else(|| MvxError::UndoRedoDisabled { op: op.to_string() })?;
        f(stack, &mut self.tree, &self.notifier)
    }

    /// # Errors
    ///
    /// Returns `UndoRedoDisabled` without a command stack.
    pub fn set_undo_limit(&mut self, limit: usize) -> Result<()> {
        self.with_stack("set_undo_limit", |stack, _, _| {
            stack.set_undo_limit(limit);
            Ok(())
        })?;
        self.undo_limit = limit;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UndoRedoDisabled` without a command stack, or the command's
    /// undo error (the cursor stays put).
    pub fn undo(&mut self) -> Result<()> {
        let context = self.context();
        self.logged("undo", context, |m| {
            m.with_stack("undo", |stack, tree, notifier| stack.undo(tree, notifier))
        })
    }

    /// # Errors
    ///
    /// Returns `UndoRedoDisabled` without a command stack, or the command's
    /// execute error (the cursor stays put).
    pub fn redo(&mut self) -> Result<()> {
        let context = self.context();
        self.logged("redo", context, |m| {
            m.with_stack("redo", |stack, tree, notifier| stack.redo(tree, notifier))
        })
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.as_ref().is_some_and(CommandStack::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.as_ref().is_some_and(CommandStack::can_redo)
    }

    /// # Errors
    ///
    /// Returns `UndoRedoDisabled` without a command stack.
    pub fn begin_macro(&mut self, description: impl Into<String>) -> Result<()> {
        let context = self.context();
        self.logged("begin_macro", context, |m| {
            m.with_stack("begin_macro", |stack, _, _| {
                stack.begin_macro(description);
                Ok(())
            })
        })
    }

    /// # Errors
    ///
    /// Returns `UndoRedoDisabled` without a command stack, or `NoOpenMacro`.
    pub fn end_macro(&mut self) -> Result<()> {
        let context = self.context();
        self.logged("end_macro", context, |m| {
            m.with_stack("end_macro", |stack, _, _| stack.end_macro())
        })
    }

    // ===== lifecycle =====

    /// Replace the root with an empty one; not undoable, clears the history
    ///
    /// # Errors
    ///
    /// Returns `ModelDestroyed` after [`SessionModel::destroy`].
    pub fn clear(&mut self) -> Result<()> {
        let context = self.context();
        self.logged("clear", context, |m| m.reset_to(None))
    }

    fn reset_to(&mut self, root: Option<DetachedItem>) -> Result<()> {
        if self.destroyed {
            return Err(MvxError::ModelDestroyed);
        }
        Composer::new(&mut self.tree, &self.notifier).reset(root)?;
        if let Some(stack) = self.undo_stack.as_mut() {
            stack.clear();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` once the model is destroyed.
    pub fn to_record(&self) -> Result<ModelRecord> {
        ModelRecord::from_tree(self.model_type.clone(), &self.tree)
    }

    /// Replace the content with a record through the reset path
    ///
    /// # Errors
    ///
    /// Fails if the record is invalid; the model is left untouched then.
    pub fn load_record(&mut self, record: ModelRecord) -> Result<()> {
        let context = self.context();
        self.logged("load_record", context, |m| {
            let root = record.root.into_detached()?;
            m.reset_to(Some(root))?;
            m.model_type = record.model_type;
            Ok(())
        })
    }

    /// Announce destruction, then drop every item and subscription
    ///
    /// Idempotent; also runs on drop.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        log_op_start!("destroy", model_type = %self.model_type);
        let start = Instant::now();
        self.destroyed = true;
        self.notifier
            .notify(&ModelEvent::ModelAboutToBeDestroyed, &mut self.tree, false);
        self.tree.dispose();
        self.notifier.clear();
        self.undo_stack = None;
        log_op_end!("destroy", duration_ms = start.elapsed().as_millis() as u64);
    }
}

impl Drop for SessionModel {
    fn drop(&mut self) {
        self.destroy();
    }
}
