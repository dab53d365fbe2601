//! Structured logging for the model kernel
//!
//! `SessionModel` is the only boundary: each public operation logs a
//! `start` event and one `end`/`end_error` event built from an
//! [`OpContext`], so every record names the model type and, where they
//! apply, the item identifier, tag, row, role and undo stack position.
//! The tree, composer, notifier and command stack log at `debug`/`trace`.
//!
//! ```rust
//! use mvx_core::logging_facility::{init, Profile};
//!
//! init(Profile::from_verbosity(1));
//! ```

pub mod context;
pub mod init;
pub mod macros;
pub mod test_capture;

pub use context::OpContext;
pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
