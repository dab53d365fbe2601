use std::fmt;

use serde::{Deserialize, Serialize};

use super::tag::TagIndex;

/// Route from the root to an item as a sequence of tag indices
///
/// Commands hold paths rather than handles: a path is re-resolved on every
/// undo/redo and fails cleanly if the tree has drifted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemPath(Vec<TagIndex>);

impl ItemPath {
    /// Path of the root item
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_indices(indices: Vec<TagIndex>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[TagIndex] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of a child of this item
    pub fn child(&self, tag_index: TagIndex) -> Self {
        let mut indices = self.0.clone();
        indices.push(tag_index);
        Self(indices)
    }

    /// Parent path and last step; `None` for the root
    pub fn split_last(&self) -> Option<(ItemPath, &TagIndex)> {
        let (last, parent) = self.0.split_last()?;
        Some((ItemPath(parent.to_vec()), last))
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for step in &self.0 {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}
