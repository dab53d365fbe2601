//! Tabular/tree projection kept live by model events

pub mod strategy;
pub mod view_model;

pub use strategy::{
    ChildListStrategy, MirrorStrategy, ProjectionStrategy, PropertyTableStrategy, ViewCell,
};
pub use view_model::{ViewChange, ViewIndex, ViewModel};

use crate::config::StrategyKind;
use crate::errors::Result;
use crate::model::ItemHandle;
use crate::ops::Tree;

/// Build the strategy named in configuration
///
/// The property table takes its columns from the first row item under `root`.
///
/// # Errors
///
/// Returns `ItemNotFound` if `root` is stale.
pub fn strategy_for(
    kind: StrategyKind,
    tree: &Tree,
    root: ItemHandle,
) -> Result<Box<dyn ProjectionStrategy>> {
    Ok(match kind {
        StrategyKind::Mirror => Box::new(MirrorStrategy),
        StrategyKind::Children => Box::new(ChildListStrategy),
        StrategyKind::PropertyTable => match tree.children(root)?.first() {
            Some(first) => Box::new(PropertyTableStrategy::from_item(tree, *first)?),
            None => Box::new(PropertyTableStrategy::new(Vec::new())),
        },
    })
}
