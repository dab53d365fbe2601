//! Live projection of a model subtree into fixed-width rows
//!
//! A `ViewModel` keeps its own node tree in step with the model by
//! listening to model events. It is held weakly by the notifier, so
//! dropping the last `Rc` disconnects it.
//!
//! ## Example
//!
//! ```
//! use mvx_core::model::TagIndex;
//! use mvx_core::projection::{MirrorStrategy, ViewModel};
//! use mvx_core::SessionModel;
//!
//! let mut model = SessionModel::new("Session");
//! let view = ViewModel::attach(&model, MirrorStrategy);
//! let root = model.root_item();
//! model
//!     .insert_new_item("Vector", root, &TagIndex::append(""))
//!     .unwrap();
//!
//! let view = view.borrow();
//! assert_eq!(view.row_count(None), 1);
//! let vector_row = view.index(0, 0, None).unwrap();
//! assert_eq!(view.row_count(Some(&vector_row)), 3);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use mvx_core_types::Role;

use crate::errors::{MvxError, Result};
use crate::events::{EventContext, EventNotifier, ModelEvent, ModelListener, Subscription};
use crate::model::{ItemHandle, Variant};
use crate::ops::Tree;
use crate::projection::strategy::{ProjectionStrategy, ViewCell};
use crate::session::SessionModel;

type NodeId = u64;

const ROOT_NODE: NodeId = 0;

/// Position of one cell
///
/// Valid until the next structural change of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewIndex {
    pub row: usize,
    pub column: usize,
    node: NodeId,
}

/// Change pushed to view subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    /// Rows `first..=last` appeared under `parent` (`None` = top level)
    RowsInserted {
        parent: Option<ViewIndex>,
        first: usize,
        last: usize,
    },
    RowsRemoved {
        parent: Option<ViewIndex>,
        first: usize,
        last: usize,
    },
    DataChanged { index: ViewIndex, role: Role },
    Reset,
    /// Model destroyed; the view is empty and disconnected
    Detached,
}

#[derive(Debug)]
struct ViewNode {
    item: ItemHandle,
    cells: Vec<Option<ViewCell>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    row: usize,
    depth: usize,
}

type ChangeListener = Box<dyn FnMut(&ViewChange)>;

pub struct ViewModel {
    strategy: Box<dyn ProjectionStrategy>,
    root: Option<ItemHandle>,
    follows_model_root: bool,
    nodes: HashMap<NodeId, ViewNode>,
    next_id: NodeId,
    by_item: HashMap<ItemHandle, NodeId>,
    by_cell_item: HashMap<ItemHandle, Vec<(NodeId, usize)>>,
    listeners: Vec<(u64, ChangeListener)>,
    next_listener: u64,
    subscription: Option<Subscription>,
}

impl ViewModel {
    /// Detached view over nothing; see [`ViewModel::attach`]
    pub fn new(strategy: impl ProjectionStrategy + 'static) -> Self {
        Self::from_boxed(Box::new(strategy))
    }

    pub fn from_boxed(strategy: Box<dyn ProjectionStrategy>) -> Self {
        Self {
            strategy,
            root: None,
            follows_model_root: false,
            nodes: HashMap::new(),
            next_id: 1,
            by_item: HashMap::new(),
            by_cell_item: HashMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
            subscription: None,
        }
    }

    /// Project the whole model and follow it
    pub fn attach(
        model: &SessionModel,
        strategy: impl ProjectionStrategy + 'static,
    ) -> Rc<RefCell<Self>> {
        Self::attach_boxed(model.tree(), model.notifier(), Box::new(strategy))
    }

    /// Project `tree` from its root and follow the events of `notifier`
    pub fn attach_boxed(
        tree: &Tree,
        notifier: &EventNotifier,
        strategy: Box<dyn ProjectionStrategy>,
    ) -> Rc<RefCell<Self>> {
        let view = Rc::new(RefCell::new(Self::from_boxed(strategy)));
        let subscription = notifier.subscribe(&view);
        {
            let mut v = view.borrow_mut();
            v.root = Some(tree.root());
            v.follows_model_root = true;
            v.rebuild(tree);
            v.subscription = Some(subscription);
        }
        view
    }

    pub fn is_attached(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_connected)
    }

    /// Stop following the model; the current rows stay
    pub fn detach(&mut self) {
        self.subscription = None;
    }

    /// Re-root the projection onto `item`
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for a stale handle.
    pub fn set_root(&mut self, tree: &Tree, item: ItemHandle) -> Result<()> {
        tree.item(item)?;
        self.root = Some(item);
        self.follows_model_root = item == tree.root();
        self.rebuild(tree);
        self.emit(ViewChange::Reset);
        Ok(())
    }

    pub fn root_item(&self) -> Option<ItemHandle> {
        self.root
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn header_labels(&self) -> Vec<String> {
        self.strategy.header_labels()
    }

    pub fn column_count(&self) -> usize {
        self.strategy.column_count()
    }

    /// Rows under `parent`; `None` is the top level
    pub fn row_count(&self, parent: Option<&ViewIndex>) -> usize {
        self.node_of(parent)
            .map_or(0, |node| node.children.len())
    }

    pub fn index(&self, row: usize, column: usize, parent: Option<&ViewIndex>) -> Option<ViewIndex> {
        if column >= self.column_count() {
            return None;
        }
        let node = *self.node_of(parent)?.children.get(row)?;
        Some(ViewIndex { row, column, node })
    }

    /// Index of the parent row, column 0; `None` for top-level rows
    pub fn parent(&self, index: &ViewIndex) -> Option<ViewIndex> {
        let parent = self.nodes.get(&index.node)?.parent?;
        self.row_index(parent)
    }

    /// Item whose data the cell presents
    pub fn item_from_index(&self, index: &ViewIndex) -> Option<ItemHandle> {
        self.cell(index).map(|cell| cell.item)
    }

    /// Item the row presents
    pub fn row_item(&self, index: &ViewIndex) -> Option<ItemHandle> {
        self.nodes.get(&index.node).map(|node| node.item)
    }

    /// Every cell presenting `item`
    pub fn index_from_item(&self, item: ItemHandle) -> Vec<ViewIndex> {
        let mut indices: Vec<ViewIndex> = self
            .by_cell_item
            .get(&item)
            .into_iter()
            .flatten()
            .filter_map(|&(node, column)| {
                self.nodes.get(&node).map(|n| ViewIndex {
                    row: n.row,
                    column,
                    node,
                })
            })
            .collect();
        indices.sort_by_key(|i| (self.nodes.get(&i.node).map(|n| n.depth), i.row, i.column));
        indices
    }

    pub fn cell(&self, index: &ViewIndex) -> Option<ViewCell> {
        self.nodes
            .get(&index.node)
            .and_then(|node| node.cells.get(index.column).copied().flatten())
    }

    pub fn role(&self, index: &ViewIndex) -> Option<Role> {
        self.cell(index).map(|cell| cell.role)
    }

    /// Value shown in a cell; the display role falls back to the item type
    pub fn data(&self, tree: &Tree, index: &ViewIndex) -> Option<Variant> {
        let cell = self.cell(index)?;
        let item = tree.item(cell.item).ok()?;
        if cell.role == Role::DISPLAY {
            return Some(Variant::Text(item.display_name().to_string()));
        }
        item.data(cell.role).cloned()
    }

    /// Write a cell back through the model
    ///
    /// Takes the shared view so that the model's events can reach it while
    /// the write is in progress.
    ///
    /// # Errors
    ///
    /// - `CellNotFound` for an empty or stale cell
    /// - `NotEditable` when the item's editable role is false
    /// - any error of [`SessionModel::set_data`]
    pub fn set_data(
        view: &Rc<RefCell<Self>>,
        model: &mut SessionModel,
        index: &ViewIndex,
        value: impl Into<Variant>,
    ) -> Result<bool> {
        let cell = view
            .borrow()
            .cell(index)
            .ok_or(MvxError::CellNotFound {
                row: index.row,
                column: index.column,
            })?;
        let item = model.tree().item(cell.item)?;
        if !item.is_editable() {
            return Err(MvxError::NotEditable {
                item: item.identifier().to_string(),
            });
        }
        model.set_data(cell.item, cell.role, value)
    }

    /// Register a closure for view changes; returns its id
    ///
    /// Closures run while the view is mutably borrowed and must rely on
    /// the change they receive rather than reading the view back.
    pub fn subscribe_changes<F>(&mut self, callback: F) -> u64
    where
        F: FnMut(&ViewChange) + 'static,
    {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe_changes(&mut self, id: u64) {
        self.listeners.retain(|(l, _)| *l != id);
    }

    /// Every row in display order with its depth
    pub fn rows_preorder(&self) -> Vec<(usize, ViewIndex)> {
        let mut rows = Vec::new();
        if self.nodes.contains_key(&ROOT_NODE) {
            self.collect_rows(ROOT_NODE, &mut rows);
        }
        rows
    }

    fn collect_rows(&self, node: NodeId, rows: &mut Vec<(usize, ViewIndex)>) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        for &child in &n.children {
            if let Some(index) = self.row_index(child) {
                let depth = self.nodes.get(&child).map_or(0, |c| c.depth);
                rows.push((depth, index));
                self.collect_rows(child, rows);
            }
        }
    }

    /// Text of every row in display order, first column indented by depth
    pub fn to_table(&self, tree: &Tree) -> Vec<Vec<String>> {
        self.rows_preorder()
            .into_iter()
            .map(|(depth, row)| {
                (0..self.column_count())
                    .map(|column| {
                        let index = ViewIndex { column, ..row };
                        let text = self
                            .data(tree, &index)
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        if column == 0 {
                            format!("{}{}", "  ".repeat(depth), text)
                        } else {
                            text
                        }
                    })
                    .collect()
            })
            .collect()
    }

    // ===== node bookkeeping =====

    fn node_of(&self, parent: Option<&ViewIndex>) -> Option<&ViewNode> {
        match parent {
            None => self.nodes.get(&ROOT_NODE),
            Some(index) if index.column == 0 => self.nodes.get(&index.node),
            Some(_) => None,
        }
    }

    fn row_index(&self, node: NodeId) -> Option<ViewIndex> {
        if node == ROOT_NODE {
            return None;
        }
        self.nodes.get(&node).map(|n| ViewIndex {
            row: n.row,
            column: 0,
            node,
        })
    }

    /// Node whose children are the rows under model item `item`
    fn node_for_parent(&self, item: ItemHandle) -> Option<NodeId> {
        if self.root == Some(item) && self.nodes.contains_key(&ROOT_NODE) {
            return Some(ROOT_NODE);
        }
        self.by_item.get(&item).copied()
    }

    fn child_depth(&self, node: NodeId) -> usize {
        if node == ROOT_NODE {
            return 0;
        }
        self.nodes.get(&node).map_or(0, |n| n.depth + 1)
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.by_item.clear();
        self.by_cell_item.clear();
    }

    fn rebuild(&mut self, tree: &Tree) {
        self.clear();
        let Some(root) = self.root.filter(|r| tree.contains(*r)) else {
            self.root = None;
            return;
        };
        self.nodes.insert(
            ROOT_NODE,
            ViewNode {
                item: root,
                cells: Vec::new(),
                parent: None,
                children: Vec::new(),
                row: 0,
                depth: 0,
            },
        );
        self.build_children(tree, ROOT_NODE, root, 0);
        tracing::trace!(rows = self.by_item.len(), strategy = self.strategy.name(), "view rebuilt");
    }

    fn build_children(&mut self, tree: &Tree, node: NodeId, item: ItemHandle, depth: usize) {
        for child in self.strategy.children(tree, item, depth) {
            let id = self.create_node(tree, child, node, depth);
            if let Some(n) = self.nodes.get_mut(&node) {
                n.children.push(id);
            }
            self.build_children(tree, id, child, depth + 1);
        }
        self.renumber(node);
    }

    fn create_node(&mut self, tree: &Tree, item: ItemHandle, parent: NodeId, depth: usize) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        let cells = self.strategy.row(tree, item);
        self.index_cells(id, &cells);
        self.by_item.insert(item, id);
        self.nodes.insert(
            id,
            ViewNode {
                item,
                cells,
                parent: Some(parent),
                children: Vec::new(),
                row: 0,
                depth,
            },
        );
        id
    }

    fn index_cells(&mut self, node: NodeId, cells: &[Option<ViewCell>]) {
        for (column, cell) in cells.iter().enumerate() {
            if let Some(cell) = cell {
                self.by_cell_item
                    .entry(cell.item)
                    .or_default()
                    .push((node, column));
            }
        }
    }

    fn unindex_cells(&mut self, node: NodeId, cells: &[Option<ViewCell>]) {
        for cell in cells.iter().flatten() {
            if let Some(entries) = self.by_cell_item.get_mut(&cell.item) {
                entries.retain(|(n, _)| *n != node);
                if entries.is_empty() {
                    self.by_cell_item.remove(&cell.item);
                }
            }
        }
    }

    fn remove_subtree(&mut self, node: NodeId) {
        let Some(n) = self.nodes.remove(&node) else {
            return;
        };
        for child in &n.children {
            self.remove_subtree(*child);
        }
        self.unindex_cells(node, &n.cells);
        if self.by_item.get(&n.item) == Some(&node) {
            self.by_item.remove(&n.item);
        }
    }

    fn renumber(&mut self, node: NodeId) {
        let children = match self.nodes.get(&node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for (row, child) in children.into_iter().enumerate() {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.row = row;
            }
        }
    }

    /// Recompute the cells of a row and report the ones that moved
    fn refresh_cells(&mut self, tree: &Tree, node: NodeId) {
        let Some(item) = self.nodes.get(&node).map(|n| n.item) else {
            return;
        };
        let cells = self.strategy.row(tree, item);
        let old = match self.nodes.get_mut(&node) {
            Some(n) if n.cells != cells => std::mem::replace(&mut n.cells, cells.clone()),
            _ => return,
        };
        self.unindex_cells(node, &old);
        self.index_cells(node, &cells);
        let Some(row) = self.nodes.get(&node).map(|n| n.row) else {
            return;
        };
        for (column, cell) in cells.iter().enumerate() {
            if old.get(column).copied().flatten() != *cell {
                let role = cell.map_or(Role::DATA, |c| c.role);
                self.emit(ViewChange::DataChanged {
                    index: ViewIndex { row, column, node },
                    role,
                });
            }
        }
    }

    fn emit(&mut self, change: ViewChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }

    // ===== event handling =====

    /// Bring the rows under `parent` in line with the strategy's children
    ///
    /// Listeners ahead of the view may have changed the tree again before
    /// an event arrives, so the event's tag index is not trusted.
    fn reconcile(&mut self, tree: &Tree, parent: ItemHandle) {
        let Some(parent_node) = self.node_for_parent(parent) else {
            return;
        };
        let depth = self.child_depth(parent_node);
        let wanted = self.strategy.children(tree, parent, depth);

        while let Some(stale) = self.nodes.get(&parent_node).and_then(|p| {
            p.children
                .iter()
                .copied()
                .find(|c| self.nodes.get(c).is_some_and(|n| !wanted.contains(&n.item)))
        }) {
            self.remove_row(stale);
        }

        for (row, child) in wanted.into_iter().enumerate() {
            let in_place = self
                .nodes
                .get(&parent_node)
                .and_then(|p| p.children.get(row))
                .and_then(|c| self.nodes.get(c))
                .is_some_and(|n| n.item == child);
            if in_place {
                continue;
            }
            if let Some(misplaced) = self.by_item.get(&child).copied() {
                self.remove_row(misplaced);
            }
            self.insert_row(tree, parent_node, row, child, depth);
        }
    }

    fn insert_row(&mut self, tree: &Tree, parent_node: NodeId, row: usize, item: ItemHandle, depth: usize) {
        let id = self.create_node(tree, item, parent_node, depth);
        if let Some(n) = self.nodes.get_mut(&parent_node) {
            let row = row.min(n.children.len());
            n.children.insert(row, id);
        }
        self.build_children(tree, id, item, depth + 1);
        self.renumber(parent_node);
        let row = self.nodes.get(&id).map_or(row, |n| n.row);
        let parent = self.row_index(parent_node);
        self.emit(ViewChange::RowsInserted {
            parent,
            first: row,
            last: row,
        });
    }

    fn remove_row(&mut self, node: NodeId) {
        let Some((parent_node, row)) = self
            .nodes
            .get(&node)
            .and_then(|n| n.parent.map(|p| (p, n.row)))
        else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent_node) {
            p.children.retain(|c| *c != node);
        }
        self.remove_subtree(node);
        self.renumber(parent_node);
        let parent = self.row_index(parent_node);
        self.emit(ViewChange::RowsRemoved {
            parent,
            first: row,
            last: row,
        });
    }

    fn on_inserted(&mut self, tree: &Tree, parent: ItemHandle) {
        if let Some(row_node) = self.by_item.get(&parent).copied() {
            self.refresh_cells(tree, row_node);
        }
        self.reconcile(tree, parent);
    }

    fn on_removed(&mut self, tree: &Tree, parent: ItemHandle) {
        if let Some(root) = self.root {
            // Taken subtrees leave the arena; moved ones are unlinked from
            // the model root until they are linked again.
            if !tree.is_same_or_ancestor(tree.root(), root) {
                tracing::debug!(item = %root, "projection root removed, view emptied");
                self.root = None;
                self.follows_model_root = false;
                self.clear();
                self.emit(ViewChange::Reset);
                return;
            }
        }
        if let Some(row_node) = self.by_item.get(&parent).copied() {
            self.refresh_cells(tree, row_node);
        }
        self.reconcile(tree, parent);
    }

    fn on_data_changed(&mut self, item: ItemHandle, role: Role) {
        let targets: Vec<ViewIndex> = self
            .by_cell_item
            .get(&item)
            .into_iter()
            .flatten()
            .filter_map(|&(node, column)| {
                let n = self.nodes.get(&node)?;
                let cell = n.cells.get(column).copied().flatten()?;
                (cell.role == role).then_some(ViewIndex {
                    row: n.row,
                    column,
                    node,
                })
            })
            .collect();
        for index in targets {
            self.emit(ViewChange::DataChanged { index, role });
        }
    }

    fn on_reset(&mut self, tree: &Tree) {
        if self.follows_model_root {
            self.root = Some(tree.root());
        } else {
            self.root = None;
        }
        self.rebuild(tree);
        self.emit(ViewChange::Reset);
    }

    fn on_destroyed(&mut self) {
        self.root = None;
        self.follows_model_root = false;
        self.clear();
        self.subscription = None;
        self.emit(ViewChange::Detached);
    }
}

impl ModelListener for ViewModel {
    fn on_event(&mut self, event: &ModelEvent, ctx: &mut EventContext<'_>) {
        let tree = ctx.tree();
        match event {
            ModelEvent::AboutToInsertItem { .. } | ModelEvent::AboutToRemoveItem { .. } => {}
            ModelEvent::ItemInserted { parent, .. } => self.on_inserted(tree, *parent),
            ModelEvent::ItemRemoved { parent, .. } => self.on_removed(tree, *parent),
            ModelEvent::DataChanged { item, role } => self.on_data_changed(*item, *role),
            ModelEvent::ModelAboutToBeReset => self.clear(),
            ModelEvent::ModelReset => self.on_reset(tree),
            ModelEvent::ModelAboutToBeDestroyed => self.on_destroyed(),
        }
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("strategy", &self.strategy.name())
            .field("root", &self.root)
            .field("rows", &self.by_item.len())
            .finish()
    }
}
