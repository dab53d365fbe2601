use std::fmt;

use mvx_core_types::Role;

use crate::model::{ItemHandle, TagIndex};

/// One state transition of a model
///
/// About-to events are emitted before the tree changes, the others after.
/// Removal only reports the direct child; its descendants go silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    AboutToInsertItem { parent: ItemHandle, tag_index: TagIndex },
    ItemInserted { parent: ItemHandle, tag_index: TagIndex },
    AboutToRemoveItem { parent: ItemHandle, tag_index: TagIndex },
    ItemRemoved { parent: ItemHandle, tag_index: TagIndex },
    DataChanged { item: ItemHandle, role: Role },
    ModelAboutToBeReset,
    ModelReset,
    ModelAboutToBeDestroyed,
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::AboutToInsertItem { .. } => "about_to_insert_item",
            ModelEvent::ItemInserted { .. } => "item_inserted",
            ModelEvent::AboutToRemoveItem { .. } => "about_to_remove_item",
            ModelEvent::ItemRemoved { .. } => "item_removed",
            ModelEvent::DataChanged { .. } => "data_changed",
            ModelEvent::ModelAboutToBeReset => "model_about_to_be_reset",
            ModelEvent::ModelReset => "model_reset",
            ModelEvent::ModelAboutToBeDestroyed => "model_about_to_be_destroyed",
        }
    }

    /// Parent of a structural event
    pub fn parent(&self) -> Option<ItemHandle> {
        match self {
            ModelEvent::AboutToInsertItem { parent, .. }
            | ModelEvent::ItemInserted { parent, .. }
            | ModelEvent::AboutToRemoveItem { parent, .. }
            | ModelEvent::ItemRemoved { parent, .. } => Some(*parent),
            _ => None,
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelEvent::AboutToInsertItem { parent, tag_index }
            | ModelEvent::ItemInserted { parent, tag_index }
            | ModelEvent::AboutToRemoveItem { parent, tag_index }
            | ModelEvent::ItemRemoved { parent, tag_index } => {
                write!(f, "{} {} {}", self.name(), parent, tag_index)
            }
            ModelEvent::DataChanged { item, role } => {
                write!(f, "{} {} {}", self.name(), item, role)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}
