//! Core types shared across MVX facilities
//!
//! This crate provides foundational types used by the model kernel,
//! its error facility and its logging facility:
//!
//! - **Identity types**: ItemId, Role
//! - **Schema constants**: Canonical field keys and event names

pub mod ids;
pub mod schema;

pub use ids::{ItemId, Role};
