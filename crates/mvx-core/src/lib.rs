//! MVX Core - in-process hierarchical data-model engine
//!
//! This crate provides the model kernel behind list/tree/table editors:
//! - Items with typed role data and named, capacity-checked child tags
//! - A per-tree identifier pool with no reuse within a session
//! - Synchronous change notification with RAII subscriptions
//! - A composer that validates, announces and applies every mutation
//! - Undoable commands, macros and a bounded undo stack
//! - Live tabular/tree projections driven by model events
//! - Serializable model records and TOML session configuration
//!
//! Everything is single-threaded; the model types are `!Send` and a host
//! serializes access on its event-loop thread.

pub use mvx_core_types;

pub mod commands;
pub mod composer;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod persist;
pub mod projection;
pub mod session;

// Re-export commonly used types
pub use commands::{Command, CommandStack};
pub use composer::{CommandComposer, Composer, ModelComposer};
pub use config::{SessionConfig, StrategyKind};
pub use errors::{ExError, ExErrorKind, MvxError, Result};
pub use events::{EventContext, EventNotifier, ModelEvent, ModelListener, Subscription};
pub use model::{DetachedItem, Item, ItemCatalogue, ItemHandle, ItemPath, TagIndex, TagInfo, Variant};
pub use mvx_core_types::{ItemId, Role};
pub use ops::Tree;
pub use persist::ModelRecord;
pub use projection::{ViewChange, ViewIndex, ViewModel};
pub use session::SessionModel;
