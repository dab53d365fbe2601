//! Synchronous model notifications

pub mod event;
pub mod notifier;

pub use event::ModelEvent;
pub use notifier::{EventContext, EventNotifier, ModelListener, Subscription};
