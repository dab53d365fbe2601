//! Listener registry and synchronous delivery
//!
//! Listeners are called in registration order on the stack of the mutating
//! call. Delivery works on a snapshot of the registry, so listeners may
//! subscribe or unsubscribe while an event is being delivered:
//!
//! - an entry removed mid-delivery is not called again
//! - an entry added mid-delivery sees the next event
//! - a listener still busy with an outer event is skipped for nested ones
//!
//! Weakly held listeners disappear from the registry once their owner drops.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use mvx_core_types::Role;

use super::event::ModelEvent;
use crate::composer::{Composer, ModelComposer};
use crate::errors::{MvxError, Result};
use crate::model::{DetachedItem, ItemHandle, TagIndex, Variant};
use crate::ops::Tree;

/// Receiver of model events
pub trait ModelListener {
    fn on_event(&mut self, event: &ModelEvent, ctx: &mut EventContext<'_>);
}

struct FnListener<F>(F);

impl<F> ModelListener for FnListener<F>
where
    F: FnMut(&ModelEvent, &mut EventContext<'_>),
{
    fn on_event(&mut self, event: &ModelEvent, ctx: &mut EventContext<'_>) {
        (self.0)(event, ctx)
    }
}

type SharedListener = Rc<RefCell<dyn ModelListener>>;

enum ListenerRef {
    Weak(Weak<RefCell<dyn ModelListener>>),
    Owned(SharedListener),
}

impl ListenerRef {
    fn upgrade(&self) -> Option<SharedListener> {
        match self {
            ListenerRef::Weak(weak) => weak.upgrade(),
            ListenerRef::Owned(rc) => Some(rc.clone()),
        }
    }
}

struct Entry {
    id: u64,
    listener: ListenerRef,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    fn add(&mut self, listener: ListenerRef) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry { id, listener });
        id
    }

    /// Remove entries matching `pred` and hand them back so they drop outside the borrow
    fn drain_where<F>(&mut self, mut pred: F) -> Vec<Entry>
    where
        F: FnMut(&Entry) -> bool,
    {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if pred(&self.entries[i]) {
                removed.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        removed
    }
}

/// Broadcasts [`ModelEvent`]s to subscribed listeners
#[derive(Clone, Default)]
pub struct EventNotifier {
    registry: Rc<RefCell<Registry>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a shared listener, held weakly
    ///
    /// The entry disconnects when the returned guard drops or when the last
    /// strong reference to the listener goes away, whichever comes first.
    pub fn subscribe<L>(&self, listener: &Rc<RefCell<L>>) -> Subscription
    where
        L: ModelListener + 'static,
    {
        let shared: SharedListener = listener.clone();
        self.add(ListenerRef::Weak(Rc::downgrade(&shared)))
    }

    /// Subscribe a closure owned by the notifier for as long as the guard lives
    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ModelEvent, &mut EventContext<'_>) + 'static,
    {
        let shared: SharedListener = Rc::new(RefCell::new(FnListener(callback)));
        self.add(ListenerRef::Owned(shared))
    }

    fn add(&self, listener: ListenerRef) -> Subscription {
        let id = self.registry.borrow_mut().add(listener);
        tracing::trace!(subscription = id, "subscribed");
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Disconnect explicitly; same as dropping the guard
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Live entries; dead weak listeners are not counted
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.listener.upgrade().is_some())
            .count()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.registry
            .try_borrow()
            .map(|r| r.entries.iter().any(|e| e.id == id))
            .unwrap_or(false)
    }

    /// Deliver one event to every live listener, in registration order
    pub(crate) fn notify(&self, event: &ModelEvent, tree: &mut Tree, command_in_progress: bool) {
        let (snapshot, dead) = {
            let mut registry = self.registry.borrow_mut();
            let dead = registry.drain_where(|e| e.listener.upgrade().is_none());
            let snapshot: Vec<(u64, SharedListener)> = registry
                .entries
                .iter()
                .filter_map(|e| e.listener.upgrade().map(|l| (e.id, l)))
                .collect();
            (snapshot, dead)
        };
        drop(dead);
        tracing::trace!(event = %event, listeners = snapshot.len(), "notify");

        for (id, listener) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            match listener.try_borrow_mut() {
                Ok(mut listener) => {
                    let mut ctx = EventContext {
                        tree: &mut *tree,
                        notifier: self,
                        command_in_progress,
                    };
                    listener.on_event(event, &mut ctx);
                }
                Err(_) => {
                    tracing::trace!(subscription = id, event = %event, "listener busy, skipped");
                }
            }
        }
    }

    /// Drop every entry
    pub(crate) fn clear(&self) {
        let removed = match self.registry.try_borrow_mut() {
            Ok(mut registry) => registry.drain_where(|_| true),
            Err(_) => Vec::new(),
        };
        drop(removed);
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// RAII guard of one subscription
#[must_use = "dropping a Subscription disconnects the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.registry
            .upgrade()
            .and_then(|r| r.try_borrow().ok().map(|r| r.entries.iter().any(|e| e.id == self.id)))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = match registry.try_borrow_mut() {
            Ok(mut registry) => registry.drain_where(|e| e.id == self.id),
            Err(_) => {
                tracing::trace!(subscription = self.id, "registry busy on unsubscribe");
                Vec::new()
            }
        };
        drop(removed);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// What a listener may do while handling an event
///
/// Reads see the tree as it is at this point of the sequence. Mutations go
/// through a plain composer and are delivered depth-first to the other
/// listeners; they are refused while a command is executing or undoing.
pub struct EventContext<'a> {
    tree: &'a mut Tree,
    notifier: &'a EventNotifier,
    command_in_progress: bool,
}

impl<'a> EventContext<'a> {
    pub fn tree(&self) -> &Tree {
        &*self.tree
    }

    pub fn command_in_progress(&self) -> bool {
        self.command_in_progress
    }

    fn composer(&mut self, op: &str) -> Result<Composer<'_>> {
        if self.command_in_progress {
            return Err(MvxError::ReentrantMutation { op: op.to_string() });
        }
        Ok(Composer::new(&mut *self.tree, self.notifier))
    }

    /// # Errors
    ///
    /// Returns `ReentrantMutation` while a command is running, or any
    /// insertion error.
    pub fn insert_item(
        &mut self,
        item: DetachedItem,
        parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<ItemHandle> {
        self.composer("insert_item")?
            .insert_item(item, parent, tag_index)
    }

    /// # Errors
    ///
    /// Returns `ReentrantMutation` while a command is running, or any take error.
    pub fn take_item(&mut self, parent: ItemHandle, tag_index: &TagIndex) -> Result<DetachedItem> {
        self.composer("take_item")?.take_item(parent, tag_index)
    }

    /// # Errors
    ///
    /// Returns `ReentrantMutation` while a command is running, or any data error.
    pub fn set_data(&mut self, item: ItemHandle, role: Role, value: Variant) -> Result<bool> {
        self.composer("set_data")?.set_data(item, role, value)
    }

    /// # Errors
    ///
    /// Returns `ReentrantMutation` while a command is running, or any move error.
    pub fn move_item(
        &mut self,
        item: ItemHandle,
        new_parent: ItemHandle,
        tag_index: &TagIndex,
    ) -> Result<()> {
        self.composer("move_item")?
            .move_item(item, new_parent, tag_index)
    }
}
