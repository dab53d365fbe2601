use std::cell::RefCell;
use std::rc::Rc;

use mvx_core::model::{DetachedItem, ItemHandle, TagIndex};
use mvx_core::ops::Tree;
use mvx_core::{ModelEvent, MvxError, Role, SessionModel, Subscription};
use proptest::prelude::*;

/// Create a model with undo/redo enabled
#[allow(dead_code)]
pub fn undoable_model() -> SessionModel {
    let mut model = SessionModel::new("Session");
    model.set_undo_redo_enabled(true);
    model
}

/// Append a catalogue item under the root
#[allow(dead_code)]
pub fn append(model: &mut SessionModel, model_type: &str) -> ItemHandle {
    let root = model.root_item();
    model
        .insert_new_item(model_type, root, &TagIndex::append(""))
        .unwrap()
}

/// Compound holding one property tag "props" with the given value
#[allow(dead_code)]
pub fn item_with_props(value: i64) -> DetachedItem {
    let mut item = DetachedItem::new("Compound");
    item.add_property("props", value).unwrap();
    item
}

/// Every event the model publishes, recorded in order
#[allow(dead_code)]
pub struct EventLog {
    events: Rc<RefCell<Vec<ModelEvent>>>,
    _subscription: Subscription,
}

#[allow(dead_code)]
impl EventLog {
    pub fn attach(model: &SessionModel) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let subscription = model.subscribe_fn(move |event, _ctx| {
            sink.borrow_mut().push(event.clone());
        });
        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(ModelEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// Rows a whole-tree projection should show: (depth, item) in pre-order
#[allow(dead_code)]
pub fn expected_mirror_rows(tree: &Tree, root: ItemHandle) -> Vec<(usize, ItemHandle)> {
    fn walk(tree: &Tree, item: ItemHandle, depth: usize, out: &mut Vec<(usize, ItemHandle)>) {
        for child in tree.children(item).unwrap() {
            out.push((depth, child));
            walk(tree, child, depth + 1, out);
        }
    }
    let mut rows = Vec::new();
    walk(tree, root, 0, &mut rows);
    rows
}

/// One random mutation; indices pick from the root and its descendants
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Op {
    Insert(usize),
    Remove(usize),
    SetData(usize, i64),
    Move(usize, usize),
}

#[allow(dead_code)]
pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..64).prop_map(Op::Insert),
        (0usize..64).prop_map(Op::Remove),
        (0usize..64, -5i64..5).prop_map(|(i, v)| Op::SetData(i, v)),
        (0usize..64, 0usize..64).prop_map(|(i, p)| Op::Move(i, p)),
    ]
}

/// Apply `op` to the current tree; constraint failures are returned as is
#[allow(dead_code)]
pub fn apply_op(model: &mut SessionModel, op: &Op) -> Result<(), MvxError> {
    let root = model.root_item();
    let mut items = vec![root];
    items.extend(model.tree().descendants(root).unwrap());
    let pick = |i: usize| items[i % items.len()];
    match *op {
        Op::Insert(p) => {
            let kind = if p % 2 == 0 { "Container" } else { "Vector" };
            model
                .insert_new_item(kind, pick(p), &TagIndex::append(""))
                .map(|_| ())
        }
        Op::Remove(i) => model.remove_item(pick(i)).map(|_| ()),
        Op::SetData(i, v) => model.set_data(pick(i), Role::USER, v).map(|_| ()),
        Op::Move(i, p) => model.move_item(pick(i), pick(p), &TagIndex::append("")),
    }
}
