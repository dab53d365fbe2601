use std::collections::BTreeMap;
use std::fmt;

use super::item::DetachedItem;
use super::tag::TagInfo;
use crate::errors::{MvxError, Result};

pub const SESSION_ITEM: &str = "SessionItem";
pub const PROPERTY_ITEM: &str = "Property";
pub const COMPOUND_ITEM: &str = "Compound";
pub const CONTAINER_ITEM: &str = "Container";
pub const VECTOR_ITEM: &str = "Vector";

/// Default tag of the root item
pub const ROOT_TAG: &str = "root";
/// Default tag of `Container` items
pub const ITEMS_TAG: &str = "items";

type Factory = Box<dyn Fn() -> Result<DetachedItem>>;

/// Registry of type name → constructor
///
/// Populated once at startup; models create typed items through it.
pub struct ItemCatalogue {
    factories: BTreeMap<String, Factory>,
}

impl ItemCatalogue {
    /// Empty catalogue, without even the built-in types
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one for the same name
    pub fn register<F>(&mut self, model_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<DetachedItem> + 'static,
    {
        let model_type = model_type.into();
        if self.factories.contains_key(&model_type) {
            tracing::debug!(model_type = %model_type, "replacing catalogue entry");
        }
        self.factories.insert(model_type, Box::new(factory));
    }

    /// Construct a new item of the given type
    ///
    /// # Errors
    ///
    /// Returns `UnknownModelType` if nothing is registered under `model_type`,
    /// or whatever the constructor itself reports.
    pub fn create(&self, model_type: &str) -> Result<DetachedItem> {
        let factory =
            self.factories
                .get(model_type)
                .ok_or_else(|| MvxError::UnknownModelType {
                    model_type: model_type.to_string(),
                })?;
        factory()
    }

    pub fn contains(&self, model_type: &str) -> bool {
        self.factories.contains_key(model_type)
    }

    pub fn model_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for ItemCatalogue {
    fn default() -> Self {
        let mut catalogue = Self::empty();
        catalogue.register(SESSION_ITEM, || Ok(DetachedItem::new(SESSION_ITEM)));
        catalogue.register(PROPERTY_ITEM, || Ok(DetachedItem::new(PROPERTY_ITEM)));
        catalogue.register(COMPOUND_ITEM, || Ok(DetachedItem::new(COMPOUND_ITEM)));
        catalogue.register(CONTAINER_ITEM, || {
            let mut item = DetachedItem::new(CONTAINER_ITEM);
            item.register_default_tag(TagInfo::universal(ITEMS_TAG))?;
            Ok(item)
        });
        catalogue.register(VECTOR_ITEM, || {
            let mut item = DetachedItem::new(VECTOR_ITEM);
            for axis in ["X", "Y", "Z"] {
                item.add_property(axis, 0.0)?;
            }
            Ok(item)
        });
        catalogue
    }
}

impl fmt::Debug for ItemCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemCatalogue")
            .field("model_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fresh root item: a `SessionItem` whose default tag accepts anything
pub fn new_root_item() -> Result<DetachedItem> {
    let mut root = DetachedItem::new(SESSION_ITEM);
    root.register_default_tag(TagInfo::universal(ROOT_TAG))?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;

    #[test]
    fn test_builtin_vector_has_three_axes() {
        let vector = ItemCatalogue::default().create(VECTOR_ITEM).unwrap();
        for axis in ["X", "Y", "Z"] {
            assert_eq!(vector.property(axis), Some(&Variant::Double(0.0)));
        }
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let err = ItemCatalogue::default().create("Nope").unwrap_err();
        assert_eq!(
            err,
            MvxError::UnknownModelType {
                model_type: "Nope".into()
            }
        );
    }

    #[test]
    fn test_custom_registration() {
        let mut catalogue = ItemCatalogue::empty();
        assert!(!catalogue.contains(VECTOR_ITEM));
        catalogue.register("Layer", || {
            let mut item = DetachedItem::new("Layer");
            item.add_property("thickness", 10.0)?;
            Ok(item)
        });
        assert_eq!(catalogue.model_types().collect::<Vec<_>>(), vec!["Layer"]);
        assert_eq!(catalogue.create("Layer").unwrap().model_type(), "Layer");
    }
}
