use std::collections::BTreeMap;
use std::fmt;

use mvx_core_types::{ItemId, Role};
use serde::{Deserialize, Serialize};

use crate::errors::{MvxError, Result};

/// Enumerated choice: the list of allowed labels plus the selected one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboValue {
    pub values: Vec<String>,
    pub current: usize,
}

impl ComboValue {
    /// Create a choice with the first value selected
    pub fn new(values: Vec<String>) -> Self {
        Self { values, current: 0 }
    }

    /// Select by position; positions past the end are clamped to the last value
    pub fn with_current(mut self, current: usize) -> Self {
        self.current = current.min(self.values.len().saturating_sub(1));
        self
    }

    /// Currently selected label
    pub fn current_value(&self) -> Option<&str> {
        self.values.get(self.current).map(String::as_str)
    }
}

/// Value stored under one role of an item
///
/// Serialized as `{"kind": "...", "value": ...}` so records stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Variant {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Choice(ComboValue),
    /// Opaque reference to another item by identifier
    Link(ItemId),
}

/// Discriminant of a [`Variant`], used for kind-stability checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Bool,
    Int,
    Double,
    Text,
    Choice,
    Link,
}

impl VariantKind {
    pub fn name(self) -> &'static str {
        match self {
            VariantKind::Bool => "bool",
            VariantKind::Int => "int",
            VariantKind::Double => "double",
            VariantKind::Text => "text",
            VariantKind::Choice => "choice",
            VariantKind::Link => "link",
        }
    }
}

impl Variant {
    /// Equality used for change detection; doubles compare bit for bit so
    /// that NaN equals itself
    pub fn same_value(&self, other: &Variant) -> bool {
        match (self, other) {
            (Variant::Double(a), Variant::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Variant::Bool(_) => VariantKind::Bool,
            Variant::Int(_) => VariantKind::Int,
            Variant::Double(_) => VariantKind::Double,
            Variant::Text(_) => VariantKind::Text,
            Variant::Choice(_) => VariantKind::Choice,
            Variant::Link(_) => VariantKind::Link,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Variant::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Variant::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&ComboValue> {
        match self {
            Variant::Choice(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&ItemId> {
        match self {
            Variant::Link(id) => Some(id),
            _ => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int(i64::from(value))
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Double(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Text(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::Text(value)
    }
}

impl From<ComboValue> for Variant {
    fn from(value: ComboValue) -> Self {
        Variant::Choice(value)
    }
}

impl From<ItemId> for Variant {
    fn from(value: ItemId) -> Self {
        Variant::Link(value)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(i) => write!(f, "{}", i),
            Variant::Double(d) => write!(f, "{}", d),
            Variant::Text(s) => write!(f, "{}", s),
            Variant::Choice(c) => write!(f, "{}", c.current_value().unwrap_or("")),
            Variant::Link(id) => write!(f, "-> {}", id),
        }
    }
}

/// Role → value map of one item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemData {
    values: BTreeMap<Role, Variant>,
}

impl ItemData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: Role) -> Option<&Variant> {
        self.values.get(&role)
    }

    /// Store a value, returning whether anything changed
    ///
    /// # Errors
    ///
    /// Returns `DataKindMismatch` if the role already holds a value of another kind.
    pub fn set(&mut self, role: Role, value: Variant) -> Result<bool> {
        if let Some(old) = self.values.get(&role) {
            if old.kind() != value.kind() {
                return Err(MvxError::DataKindMismatch {
                    role,
                    expected: old.kind().name().to_string(),
                    actual: value.kind().name().to_string(),
                });
            }
            if old.same_value(&value) {
                return Ok(false);
            }
        }
        self.values.insert(role, value);
        Ok(true)
    }

    pub fn remove(&mut self, role: Role) -> Option<Variant> {
        self.values.remove(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &Variant)> {
        self.values.iter().map(|(role, value)| (*role, value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change_only_on_new_value() {
        let mut data = ItemData::new();
        assert_eq!(data.set(Role::DATA, Variant::Int(42)), Ok(true));
        assert_eq!(data.set(Role::DATA, Variant::Int(42)), Ok(false));
        assert_eq!(data.set(Role::DATA, Variant::Int(43)), Ok(true));
        assert_eq!(data.get(Role::DATA), Some(&Variant::Int(43)));
    }

    #[test]
    fn test_set_same_nan_is_unchanged() {
        let mut data = ItemData::new();
        assert_eq!(data.set(Role::DATA, Variant::Double(f64::NAN)), Ok(true));
        assert_eq!(data.set(Role::DATA, Variant::Double(f64::NAN)), Ok(false));
        assert_eq!(data.set(Role::DATA, Variant::Double(1.0)), Ok(true));
    }

    #[test]
    fn test_set_rejects_kind_change() {
        let mut data = ItemData::new();
        data.set(Role::DATA, Variant::from(1.5)).unwrap();
        let err = data.set(Role::DATA, Variant::from("x")).unwrap_err();
        assert!(matches!(err, MvxError::DataKindMismatch { .. }));
        assert_eq!(data.get(Role::DATA), Some(&Variant::Double(1.5)));
    }

    #[test]
    fn test_combo_clamps_selection() {
        let combo = ComboValue::new(vec!["a".into(), "b".into()]).with_current(7);
        assert_eq!(combo.current_value(), Some("b"));
        assert_eq!(Variant::from(combo).to_string(), "b");
    }

    #[test]
    fn test_variant_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Variant::Int(3)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":3}"#);
    }
}
