#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{append, apply_op, op_strategy, undoable_model, EventLog, Op};
use mvx_core::model::{DetachedItem, TagIndex};
use mvx_core::{EventContext, ModelEvent, ModelListener, MvxError, Role, SessionModel};
use proptest::prelude::*;

#[test]
fn test_insert_emits_about_to_then_inserted() {
    // GIVEN a model with a recording listener
    let mut model = SessionModel::new("Session");
    let log = EventLog::attach(&model);
    let root = model.root_item();

    // WHEN an item is appended under the root
    model
        .insert_item(DetachedItem::new("Compound"), root, &TagIndex::append(""))
        .unwrap();

    // THEN the pair carries the resolved position
    let at = TagIndex::new("root", 0);
    assert_eq!(
        log.events(),
        vec![
            ModelEvent::AboutToInsertItem {
                parent: root,
                tag_index: at.clone()
            },
            ModelEvent::ItemInserted {
                parent: root,
                tag_index: at
            },
        ]
    );
}

#[test]
fn test_remove_reports_only_the_direct_child() {
    // GIVEN a vector (three property children) under the root
    let mut model = SessionModel::new("Session");
    let vector = append(&mut model, "Vector");
    let log = EventLog::attach(&model);

    // WHEN the vector is removed
    let detached = model.remove_item(vector).unwrap();

    // THEN one removal pair is published and the subtree comes back whole
    assert_eq!(log.names(), vec!["about_to_remove_item", "item_removed"]);
    assert_eq!(detached.subtree_len(), 4);
}

#[test]
fn test_about_to_remove_sees_item_still_attached() {
    // GIVEN a listener that resolves the child named by AboutToRemoveItem
    let mut model = SessionModel::new("Session");
    let item = append(&mut model, "Compound");
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    let _sub = model.subscribe_fn(move |event, ctx| {
        if let ModelEvent::AboutToRemoveItem { parent, tag_index } = event {
            *sink.borrow_mut() = ctx.tree().get_item(*parent, tag_index).ok();
        }
    });

    // WHEN the item is removed
    model.remove_item(item).unwrap();

    // THEN the listener still found it in place
    assert_eq!(*seen.borrow(), Some(item));
}

#[test]
fn test_move_emits_remove_pair_then_insert_pair() {
    // GIVEN two containers, the first holding a compound
    let mut model = SessionModel::new("Session");
    let from = append(&mut model, "Container");
    let to = append(&mut model, "Container");
    let item = model
        .insert_new_item("Compound", from, &TagIndex::append(""))
        .unwrap();
    let log = EventLog::attach(&model);

    // WHEN the compound moves into the second container
    model.move_item(item, to, &TagIndex::append("")).unwrap();

    // THEN removal from the old parent precedes insertion in the new one
    assert_eq!(
        log.events(),
        vec![
            ModelEvent::AboutToRemoveItem {
                parent: from,
                tag_index: TagIndex::new("items", 0)
            },
            ModelEvent::ItemRemoved {
                parent: from,
                tag_index: TagIndex::new("items", 0)
            },
            ModelEvent::AboutToInsertItem {
                parent: to,
                tag_index: TagIndex::new("items", 0)
            },
            ModelEvent::ItemInserted {
                parent: to,
                tag_index: TagIndex::new("items", 0)
            },
        ]
    );
    assert_eq!(model.tree().parent(item).unwrap(), Some(to));
}

#[test]
fn test_listeners_are_called_in_subscription_order() {
    // GIVEN two listeners writing into one log
    let mut model = SessionModel::new("Session");
    let order = Rc::new(RefCell::new(Vec::new()));
    let first = order.clone();
    let second = order.clone();
    let _a = model.subscribe_fn(move |e, _| first.borrow_mut().push(("a", e.name())));
    let _b = model.subscribe_fn(move |e, _| second.borrow_mut().push(("b", e.name())));
    let item = append(&mut model, "Property");
    order.borrow_mut().clear();

    // WHEN data changes
    model.set_data(item, Role::DATA, 1).unwrap();

    // THEN both saw it, a before b
    assert_eq!(
        *order.borrow(),
        vec![("a", "data_changed"), ("b", "data_changed")]
    );
}

#[test]
fn test_dropped_subscription_receives_nothing() {
    // GIVEN a recording listener that is then dropped
    let mut model = SessionModel::new("Session");
    let log = EventLog::attach(&model);
    let events = Rc::new(RefCell::new(0));
    let counter = events.clone();
    let sub = model.subscribe_fn(move |_, _| *counter.borrow_mut() += 1);
    drop(sub);

    // WHEN the model changes
    append(&mut model, "Compound");

    // THEN only the live listener was called
    assert_eq!(*events.borrow(), 0);
    assert_eq!(log.events().len(), 2);
    assert_eq!(model.notifier().subscriber_count(), 1);
}

struct Mirror {
    seen: usize,
}

impl ModelListener for Mirror {
    fn on_event(&mut self, _event: &ModelEvent, _ctx: &mut EventContext<'_>) {
        self.seen += 1;
    }
}

#[test]
fn test_weak_listener_disconnects_when_dropped() {
    // GIVEN a shared listener subscribed weakly
    let mut model = SessionModel::new("Session");
    let listener = Rc::new(RefCell::new(Mirror { seen: 0 }));
    let sub = model.subscribe(&listener);
    append(&mut model, "Compound");
    assert_eq!(listener.borrow().seen, 2);

    // WHEN the last strong reference goes
    drop(listener);

    // THEN the entry no longer counts and delivery goes on
    assert_eq!(model.notifier().subscriber_count(), 0);
    append(&mut model, "Compound");
    assert!(!sub.is_connected());
}

#[test]
fn test_listener_mutation_is_delivered_depth_first() {
    // GIVEN a listener that stamps every inserted compound with data
    let mut model = SessionModel::new("Session");
    let _stamp = model.subscribe_fn(|event, ctx| {
        if let ModelEvent::ItemInserted { parent, tag_index } = event {
            let child = ctx.tree().get_item(*parent, tag_index).unwrap();
            if ctx.tree().item(child).unwrap().model_type() == "Compound" {
                ctx.set_data(child, Role::DATA, "stamped".into()).unwrap();
            }
        }
    });
    let log = EventLog::attach(&model);

    // WHEN a compound is inserted
    let item = append(&mut model, "Compound");

    // THEN the nested DataChanged reached the later listener first
    assert_eq!(
        log.names(),
        vec!["about_to_insert_item", "data_changed", "item_inserted"]
    );
    assert_eq!(
        model.data(item, Role::DATA).unwrap().and_then(|v| v.as_text()),
        Some("stamped")
    );
}

#[test]
fn test_listener_mutation_during_command_is_refused() {
    // GIVEN undo/redo on and a listener that tries to mutate on insert
    let mut model = undoable_model();
    let outcome = Rc::new(RefCell::new(None));
    let sink = outcome.clone();
    let _sub = model.subscribe_fn(move |event, ctx| {
        if let ModelEvent::ItemInserted { parent, tag_index } = event {
            let child = ctx.tree().get_item(*parent, tag_index).unwrap();
            *sink.borrow_mut() = Some(ctx.set_data(child, Role::DATA, 1.into()));
        }
    });

    // WHEN an insertion runs as a command
    let item = append(&mut model, "Compound");

    // THEN the nested mutation failed fast and left the item untouched
    assert!(matches!(
        *outcome.borrow(),
        Some(Err(MvxError::ReentrantMutation { .. }))
    ));
    assert_eq!(model.data(item, Role::DATA).unwrap(), None);
    assert_eq!(model.undo_stack().unwrap().count(), 1);
}

#[test]
fn test_destroy_announces_once() {
    // GIVEN a recording listener
    let mut model = SessionModel::new("Session");
    let log = EventLog::attach(&model);

    // WHEN the model is destroyed twice
    model.destroy();
    model.destroy();

    // THEN the announcement went out once and mutations are refused
    assert_eq!(log.names(), vec!["model_about_to_be_destroyed"]);
    assert!(model.is_destroyed());
    let root = model.root_item();
    assert_eq!(
        model.set_data(root, Role::DATA, 1),
        Err(MvxError::ModelDestroyed)
    );
}

#[derive(Debug, Clone)]
enum Step {
    Apply(Op),
    Undo,
    Redo,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => op_strategy().prop_map(Step::Apply),
        1 => Just(Step::Undo),
        1 => Just(Step::Redo),
    ]
}

/// Structural pairs a successful operation announces
fn pairs_of(op: &Op) -> usize {
    match op {
        Op::Insert(_) | Op::Remove(_) => 1,
        Op::Move(..) => 2,
        Op::SetData(..) => 0,
    }
}

/// Count about-to/done pairs, failing on any structural event out of place
fn count_pairs(events: &[ModelEvent]) -> Result<usize, String> {
    let structural: Vec<_> = events.iter().filter(|e| e.parent().is_some()).collect();
    if structural.len() % 2 != 0 {
        return Err(format!("unpaired structural event in {:?}", structural));
    }
    for pair in structural.chunks(2) {
        let matched = match (pair[0], pair[1]) {
            (
                ModelEvent::AboutToInsertItem { parent: p1, tag_index: t1 },
                ModelEvent::ItemInserted { parent: p2, tag_index: t2 },
            )
            | (
                ModelEvent::AboutToRemoveItem { parent: p1, tag_index: t1 },
                ModelEvent::ItemRemoved { parent: p2, tag_index: t2 },
            ) => p1 == p2 && t1 == t2,
            _ => false,
        };
        if !matched {
            return Err(format!("{} is not announced by {}", pair[1], pair[0]));
        }
    }
    Ok(structural.len() / 2)
}

proptest! {
    #[test]
    fn structural_events_pair_with_each_successful_operation(
        steps in prop::collection::vec(step_strategy(), 1..40)
    ) {
        let mut model = undoable_model();
        let log = EventLog::attach(&model);
        // Pair count of each recorded command, indexed like the undo stack.
        let mut recorded: Vec<usize> = Vec::new();

        for step in &steps {
            log.clear();
            let cursor = model.undo_stack().unwrap().index();
            let expected = match step {
                Step::Apply(op) => match apply_op(&mut model, op) {
                    Ok(()) => {
                        if model.undo_stack().unwrap().index() > cursor {
                            recorded.truncate(cursor);
                            recorded.push(pairs_of(op));
                        }
                        pairs_of(op)
                    }
                    Err(_) => 0,
                },
                Step::Undo if model.can_undo() => {
                    model.undo().unwrap();
                    recorded[cursor - 1]
                }
                Step::Redo if model.can_redo() => {
                    model.redo().unwrap();
                    recorded[cursor]
                }
                Step::Undo | Step::Redo => 0,
            };

            let pairs = count_pairs(&log.events());
            prop_assert_eq!(pairs, Ok(expected), "after {:?}", step);
        }
    }
}
