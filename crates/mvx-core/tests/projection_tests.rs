#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{append, expected_mirror_rows, undoable_model};
use mvx_core::model::{DetachedItem, TagIndex};
use mvx_core::projection::{ChildListStrategy, MirrorStrategy, PropertyTableStrategy};
use mvx_core::{ModelEvent, Role, SessionModel, ViewChange, ViewModel};
use proptest::prelude::*;

fn assert_tracks(model: &SessionModel, view: &Rc<RefCell<ViewModel>>) {
    let v = view.borrow();
    let actual: Vec<_> = v
        .rows_preorder()
        .into_iter()
        .map(|(depth, index)| (depth, v.row_item(&index).unwrap()))
        .collect();
    let expected = expected_mirror_rows(model.tree(), model.root_item());
    assert_eq!(actual, expected);
    for (_, index) in v.rows_preorder() {
        let item = v.row_item(&index).unwrap();
        assert_eq!(
            v.row_count(Some(&index)),
            model.tree().children(item).unwrap().len()
        );
        assert_eq!(v.index(index.row, 0, v.parent(&index).as_ref()), Some(index));
    }
}

#[test]
fn test_mirror_follows_nested_structure() {
    // GIVEN a mirror over an empty model
    let mut model = SessionModel::new("Session");
    let view = ViewModel::attach(&model, MirrorStrategy);

    // WHEN containers, vectors and moves happen
    let a = append(&mut model, "Container");
    let b = append(&mut model, "Container");
    let v = model
        .insert_new_item("Vector", a, &TagIndex::append(""))
        .unwrap();
    model.move_item(v, b, &TagIndex::append("")).unwrap();
    model.remove_item(a).unwrap();

    // THEN the projection matches the tree
    assert_tracks(&model, &view);
    assert_eq!(view.borrow().row_count(None), 1);
}

#[test]
fn test_child_list_ignores_grandchildren() {
    // GIVEN a flat listing
    let mut model = SessionModel::new("Session");
    let view = ViewModel::attach(&model, ChildListStrategy);

    // WHEN a vector (with property children) is added
    append(&mut model, "Vector");

    // THEN only the vector is a row
    let v = view.borrow();
    assert_eq!(v.row_count(None), 1);
    let row = v.index(0, 0, None).unwrap();
    assert_eq!(v.row_count(Some(&row)), 0);
    assert_eq!(v.header_labels(), vec!["Name", "Value"]);
}

#[test]
fn test_property_table_pushes_cell_updates() {
    // GIVEN a property table over two vectors
    let mut model = SessionModel::new("Session");
    let first = append(&mut model, "Vector");
    append(&mut model, "Vector");
    let strategy = PropertyTableStrategy::from_item(model.tree(), first).unwrap();
    let view = ViewModel::attach(&model, strategy);
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    view.borrow_mut()
        .subscribe_changes(move |c| sink.borrow_mut().push(c.clone()));

    // WHEN the Z axis of the second vector changes
    let second = model.tree().children(model.root_item()).unwrap()[1];
    let z = model.tree().get_item(second, &TagIndex::new("Z", 0)).unwrap();
    model.set_data(z, Role::DATA, 9.0).unwrap();

    // THEN exactly the cell at row 1, column 2 is reported
    let v = view.borrow();
    let cell = v.index(1, 2, None).unwrap();
    assert_eq!(
        *changes.borrow(),
        vec![ViewChange::DataChanged {
            index: cell,
            role: Role::DATA
        }]
    );
    assert_eq!(v.to_table(model.tree())[1], vec!["0", "0", "9"]);
}

#[test]
fn test_undo_and_redo_keep_projection_in_step() {
    // GIVEN a mirror over an undoable model with some history
    let mut model = undoable_model();
    let view = ViewModel::attach(&model, MirrorStrategy);
    let container = append(&mut model, "Container");
    model
        .insert_new_item("Vector", container, &TagIndex::append(""))
        .unwrap();
    model.remove_item(container).unwrap();

    // WHEN everything is undone, then redone
    while model.can_undo() {
        model.undo().unwrap();
        assert_tracks(&model, &view);
    }
    while model.can_redo() {
        model.redo().unwrap();
        assert_tracks(&model, &view);
    }

    // THEN the final state is projected
    assert_eq!(view.borrow().row_count(None), 0);
}

#[test]
fn test_load_record_rebuilds_projection() {
    // GIVEN a record of a populated model and a mirror over an empty one
    let mut source = SessionModel::new("Session");
    append(&mut source, "Vector");
    let record = source.to_record().unwrap();
    let mut model = SessionModel::new("Session");
    let view = ViewModel::attach(&model, MirrorStrategy);

    // WHEN the record is loaded
    model.load_record(record).unwrap();

    // THEN the projection re-rooted onto the loaded tree
    assert_eq!(view.borrow().root_item(), Some(model.root_item()));
    assert_tracks(&model, &view);
}

/// Listener that inserts a `Compound` at row 0 of the root the first time
/// it sees an event accepted by `trigger`
fn insert_at_front_once(
    model: &SessionModel,
    trigger: fn(&ModelEvent) -> bool,
) -> mvx_core::Subscription {
    let fired = Rc::new(RefCell::new(false));
    model.subscribe_fn(move |event, ctx| {
        if trigger(event) && !fired.replace(true) {
            let root = ctx.tree().root();
            ctx.insert_item(DetachedItem::new("Compound"), root, &TagIndex::new("", 0))
                .unwrap();
        }
    })
}

#[test]
fn test_listener_insert_during_insert_keeps_both_rows() {
    // GIVEN a listener ahead of the view that inserts a sibling at row 0
    // when it sees the first insertion
    let mut model = SessionModel::new("Session");
    let _front = insert_at_front_once(&model, |e| matches!(e, ModelEvent::ItemInserted { .. }));
    let view = ViewModel::attach(&model, MirrorStrategy);
    let root = model.root_item();

    // WHEN an item is appended
    let appended = model
        .insert_item(DetachedItem::new("Compound"), root, &TagIndex::append(""))
        .unwrap();

    // THEN both the sibling and the appended item have rows, in tree order
    assert_eq!(model.tree().children(root).unwrap().len(), 2);
    assert_eq!(view.borrow().row_count(None), 2);
    let v = view.borrow();
    let last = v.index(1, 0, None).unwrap();
    assert_eq!(v.row_item(&last), Some(appended));
    drop(v);
    assert_tracks(&model, &view);
}

#[test]
fn test_listener_insert_during_remove_drops_the_removed_row() {
    // GIVEN two rows and a listener ahead of the view that inserts at row 0
    // when a removal is announced
    let mut model = SessionModel::new("Session");
    let first = append(&mut model, "Compound");
    let second = append(&mut model, "Compound");
    let _front =
        insert_at_front_once(&model, |e| matches!(e, ModelEvent::AboutToRemoveItem { .. }));
    let view = ViewModel::attach(&model, MirrorStrategy);

    // WHEN the first item is removed
    model.remove_item(first).unwrap();

    // THEN the announced item is gone and the view follows the tree
    assert!(!model.tree().contains(first));
    let children = model.tree().children(model.root_item()).unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1], second);
    assert_tracks(&model, &view);
}

proptest! {
    #[test]
    fn mirror_tracks_random_inserts_and_removes(
        ops in prop::collection::vec((any::<bool>(), 0usize..1000), 50)
    ) {
        let mut model = SessionModel::new("Session");
        let view = ViewModel::attach(&model, MirrorStrategy);
        let root = model.root_item();

        for (insert, seed) in ops {
            let mut items = vec![root];
            items.extend(model.tree().descendants(root).unwrap());
            let target = items[seed % items.len()];
            if insert {
                let tags = model.tree().item(target).unwrap().tags();
                if let Some(tag) = tags.default_tag() {
                    let len = tags.items(tag).unwrap().len();
                    let row = seed % (len + 1);
                    let kind = ["Container", "Property", "Vector"][seed % 3];
                    model.insert_new_item(kind, target, &TagIndex::new("", row)).unwrap();
                }
            } else if target != root {
                // Property children refuse removal; that leaves the tree as it was.
                let _ = model.remove_item(target);
            }
        }

        let v = view.borrow();
        let actual: Vec<_> = v
            .rows_preorder()
            .into_iter()
            .map(|(depth, index)| (depth, v.row_item(&index).unwrap()))
            .collect();
        prop_assert_eq!(actual, expected_mirror_rows(model.tree(), root));
    }
}
