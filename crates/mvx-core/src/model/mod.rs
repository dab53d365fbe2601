//! Item model: values, tags, items, paths and the item catalogue

pub mod catalogue;
pub mod handle;
pub mod item;
pub mod path;
pub mod tag;
pub mod variant;

pub use catalogue::{new_root_item, ItemCatalogue};
pub use handle::ItemHandle;
pub use item::{CloneMode, DetachedItem, Item};
pub use path::ItemPath;
pub use tag::{TagCapacity, TagIndex, TagInfo, TaggedItems};
pub use variant::{ComboValue, ItemData, Variant, VariantKind};
