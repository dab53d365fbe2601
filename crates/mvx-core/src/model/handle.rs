use std::fmt;

/// Generational reference to an item slot in a [`Tree`](crate::ops::Tree)
///
/// Handles are only meaningful for the tree that issued them. Once the item is
/// removed the slot's generation moves on and the handle stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ItemHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}
