//! Identity types for model items
//!
//! `ItemId` is the persistent identity of an item; it survives undo/redo and
//! serialization. `Role` selects one named attribute of an item's data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable unique key of one item within a tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a new random ItemId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Small integer key naming one attribute of an item's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub u16);

impl Role {
    /// Primary value presented by the item
    pub const DATA: Role = Role(1);
    /// Display name
    pub const DISPLAY: Role = Role(2);
    /// Whether the value may be edited from a view
    pub const EDITABLE: Role = Role(3);
    /// Whether the item is enabled
    pub const ENABLED: Role = Role(4);
    /// Tooltip text
    pub const TOOLTIP: Role = Role(5);
    /// First role free for application use
    pub const USER: Role = Role(100);

    /// Get the raw role number
    pub fn value(self) -> u16 {
        self.0
    }

    /// Human-readable name for well-known roles
    pub fn name(self) -> &'static str {
        match self {
            Role::DATA => "data",
            Role::DISPLAY => "display",
            Role::EDITABLE => "editable",
            Role::ENABLED => "enabled",
            Role::TOOLTIP => "tooltip",
            _ => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_generation() {
        let id1 = ItemId::new();
        let id2 = ItemId::new();

        // Should generate different IDs
        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_item_id_display() {
        let id = ItemId::from_string("abc");
        assert_eq!(format!("{}", id), "abc");
    }

    #[test]
    fn test_item_id_serializes_as_plain_string() {
        let id = ItemId::from_string("item-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"item-1\"");
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::DATA.name(), "data");
        assert_eq!(Role(250).name(), "user");
        assert_eq!(format!("{}", Role::DISPLAY), "display(2)");
    }
}
