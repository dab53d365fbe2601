use mvx_core_types::Role;

use crate::errors::Result;
use crate::model::{ItemHandle, TagIndex};
use crate::ops::Tree;

/// One cell: which item's which role it presents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewCell {
    pub item: ItemHandle,
    pub role: Role,
}

impl ViewCell {
    pub fn new(item: ItemHandle, role: Role) -> Self {
        Self { item, role }
    }
}

/// Decides which items become rows and what their cells show
pub trait ProjectionStrategy {
    fn name(&self) -> &str;

    fn column_count(&self) -> usize;

    fn header_labels(&self) -> Vec<String>;

    /// Items presented as rows under `parent`; `depth` is 0 for the top level
    fn children(&self, tree: &Tree, parent: ItemHandle, depth: usize) -> Vec<ItemHandle>;

    /// Cells of the row presenting `item`, exactly `column_count` long
    fn row(&self, tree: &Tree, item: ItemHandle) -> Vec<Option<ViewCell>>;
}

fn name_value_row(item: ItemHandle) -> Vec<Option<ViewCell>> {
    vec![
        Some(ViewCell::new(item, Role::DISPLAY)),
        Some(ViewCell::new(item, Role::DATA)),
    ]
}

fn name_value_labels() -> Vec<String> {
    vec!["Name".to_string(), "Value".to_string()]
}

/// Whole tree, every item a row with [name, value]
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorStrategy;

impl ProjectionStrategy for MirrorStrategy {
    fn name(&self) -> &str {
        "mirror"
    }

    fn column_count(&self) -> usize {
        2
    }

    fn header_labels(&self) -> Vec<String> {
        name_value_labels()
    }

    fn children(&self, tree: &Tree, parent: ItemHandle, _depth: usize) -> Vec<ItemHandle> {
        tree.children(parent).unwrap_or_default()
    }

    fn row(&self, _tree: &Tree, item: ItemHandle) -> Vec<Option<ViewCell>> {
        name_value_row(item)
    }
}

/// Flat listing of the root's immediate children
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildListStrategy;

impl ProjectionStrategy for ChildListStrategy {
    fn name(&self) -> &str {
        "children"
    }

    fn column_count(&self) -> usize {
        2
    }

    fn header_labels(&self) -> Vec<String> {
        name_value_labels()
    }

    fn children(&self, tree: &Tree, parent: ItemHandle, depth: usize) -> Vec<ItemHandle> {
        if depth > 0 {
            return Vec::new();
        }
        tree.children(parent).unwrap_or_default()
    }

    fn row(&self, _tree: &Tree, item: ItemHandle) -> Vec<Option<ViewCell>> {
        name_value_row(item)
    }
}

/// One row per child of the root, one column per property tag
///
/// A cell presents the DATA of the row item's property child. Rows lacking
/// a property get an empty cell.
#[derive(Debug, Clone, Default)]
pub struct PropertyTableStrategy {
    columns: Vec<String>,
}

impl PropertyTableStrategy {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Columns taken from the property tags of a sample item
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for a stale handle.
    pub fn from_item(tree: &Tree, item: ItemHandle) -> Result<Self> {
        let columns = tree
            .item(item)?
            .tags()
            .tag_infos()
            .filter(|info| info.is_property())
            .map(|info| info.name.clone())
            .collect();
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl ProjectionStrategy for PropertyTableStrategy {
    fn name(&self) -> &str {
        "property_table"
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn header_labels(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn children(&self, tree: &Tree, parent: ItemHandle, depth: usize) -> Vec<ItemHandle> {
        if depth > 0 {
            return Vec::new();
        }
        tree.children(parent).unwrap_or_default()
    }

    fn row(&self, tree: &Tree, item: ItemHandle) -> Vec<Option<ViewCell>> {
        self.columns
            .iter()
            .map(|column| {
                tree.get_item(item, &TagIndex::new(column.clone(), 0))
                    .ok()
                    .map(|property| ViewCell::new(property, Role::DATA))
            })
            .collect()
    }
}
