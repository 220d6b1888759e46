//! Property tests for the operation engine.
//!
//! Random sequences of edits, undos and redos are run against a small scene.
//! After every step the tree must be consistent, a rejected edit must leave
//! no trace, and undo followed by redo must move between exactly the states
//! observed before and after the edit.

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::json;
use tessel_model::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    AddSprite { parent: usize, index: i64, x: i16 },
    AddGroup { parent: usize, index: i64 },
    Delete(usize),
    Move { node: usize, parent: usize, index: i64 },
    SetX(usize, i32),
    SetName(usize, u8),
    SetBadAlpha(usize),
    AttachBody(usize),
    ResizeScene(u16),
    Pair(usize, usize),
    Undo,
    Redo,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..32usize, -2..6i64, any::<i16>()).prop_map(|(parent, index, x)| Step::AddSprite {
            parent,
            index,
            x
        }),
        (0..32usize, -2..6i64).prop_map(|(parent, index)| Step::AddGroup { parent, index }),
        (0..32usize).prop_map(Step::Delete),
        (0..32usize, 0..32usize, -2..6i64).prop_map(|(node, parent, index)| Step::Move {
            node,
            parent,
            index
        }),
        (0..32usize, any::<i32>()).prop_map(|(i, v)| Step::SetX(i, v)),
        (0..32usize, any::<u8>()).prop_map(|(i, v)| Step::SetName(i, v)),
        (0..32usize).prop_map(Step::SetBadAlpha),
        (0..32usize).prop_map(Step::AttachBody),
        any::<u16>().prop_map(Step::ResizeScene),
        (0..32usize, 0..32usize).prop_map(|(a, b)| Step::Pair(a, b)),
        Just(Step::Undo),
        Just(Step::Redo),
    ]
}

/// Entity ids in walk order; index 0 is always the root.
fn ids(doc: &Document) -> Vec<EntityId> {
    doc.walk().map(|e| e.id.clone()).collect()
}

fn pick(ids: &[EntityId], i: usize) -> EntityId {
    ids[i % ids.len()].clone()
}

/// Translate a step into an operation, or `None` for undo/redo.
fn to_operation(step: &Step, doc: &Document) -> Option<Operation> {
    let ids = ids(doc);
    Some(match step {
        Step::AddSprite { parent, index, x } => Operation::AddNode {
            subtree: json!({"type": "sprite", "editor": {"name": "s"}}),
            parent: pick(&ids, *parent),
            index: *index,
            x: f64::from(*x),
            y: 0.0,
        },
        Step::AddGroup { parent, index } => Operation::AddNode {
            subtree: json!({"type": "group", "children": [{"type": "tile-sprite"}]}),
            parent: pick(&ids, *parent),
            index: *index,
            x: 0.0,
            y: 0.0,
        },
        Step::Delete(i) => Operation::delete(&pick(&ids, *i)),
        Step::Move {
            node,
            parent,
            index,
        } => Operation::move_to(&pick(&ids, *node), &pick(&ids, *parent), *index),
        Step::SetX(i, v) => Operation::change(&pick(&ids, *i), "x", json!(v)),
        Step::SetName(i, v) => Operation::change(&pick(&ids, *i), "name", json!(format!("n{v}"))),
        Step::SetBadAlpha(i) => Operation::change(&pick(&ids, *i), "alpha", json!("opaque")),
        Step::AttachBody(i) => {
            Operation::change(&pick(&ids, *i), "body", json!({"shape": "rect", "width": 8}))
        }
        Step::ResizeScene(w) => Operation::change_settings("width", json!(w)),
        Step::Pair(a, b) => Operation::composite([
            Operation::change(&pick(&ids, *a), "angle", json!(45)),
            Operation::delete(&pick(&ids, *b)),
        ]),
        Step::Undo | Step::Redo => return None,
    })
}

fn assert_tree_consistent(doc: &Document) {
    let visited: Vec<&Entity> = doc.walk().collect();
    assert_eq!(visited.len(), doc.len(), "every entity is reachable from the root");
    let unique: HashSet<&EntityId> = visited.iter().map(|e| &e.id).collect();
    assert_eq!(unique.len(), visited.len(), "no entity is reachable twice");
    assert!(doc.root().parent.is_none());
    assert!(doc.root().is_group());
    for entity in &visited {
        if let Some(children) = entity.kind.children() {
            for child in children {
                assert_eq!(doc.get(child).unwrap().parent.as_ref(), Some(&entity.id));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn undo_and_redo_move_between_observed_states(steps in prop::collection::vec(step_strategy(), 1..40)) {
        let mut engine = OperationEngine::new(Document::new());

        for step in &steps {
            let before = engine.document().capture_snapshot();
            match to_operation(step, engine.document()) {
                Some(op) => match engine.apply(op) {
                    Ok(()) => {
                        let after = engine.document().capture_snapshot();
                        engine.undo().unwrap();
                        prop_assert_eq!(&engine.document().capture_snapshot(), &before);
                        engine.redo().unwrap();
                        prop_assert_eq!(&engine.document().capture_snapshot(), &after);
                    }
                    Err(_) => {
                        prop_assert_eq!(&engine.document().capture_snapshot(), &before);
                    }
                },
                None => {
                    let result = if matches!(step, Step::Undo) { engine.undo() } else { engine.redo() };
                    if result.is_err() {
                        prop_assert_eq!(&engine.document().capture_snapshot(), &before);
                    }
                }
            }
            assert_tree_consistent(engine.document());
        }
    }

    #[test]
    fn undoing_everything_restores_the_initial_document(steps in prop::collection::vec(step_strategy(), 1..30)) {
        let mut engine = OperationEngine::new(Document::new());
        let initial = engine.document().capture_snapshot();

        let mut applied = 0usize;
        for step in &steps {
            if let Some(op) = to_operation(step, engine.document()) {
                if engine.apply(op).is_ok() {
                    applied += 1;
                }
            }
        }
        let last = engine.document().capture_snapshot();

        for _ in 0..applied {
            engine.undo().unwrap();
        }
        prop_assert_eq!(engine.undo(), Err(OpError::EmptyHistory));
        prop_assert_eq!(&engine.document().capture_snapshot(), &initial);

        for _ in 0..applied {
            engine.redo().unwrap();
        }
        prop_assert_eq!(&engine.document().capture_snapshot(), &last);
    }

    #[test]
    fn rejected_composites_leave_no_trace(a in 0..32usize, steps in prop::collection::vec(step_strategy(), 0..15)) {
        let mut engine = OperationEngine::new(Document::new());
        for step in &steps {
            if let Some(op) = to_operation(step, engine.document()) {
                let _ = engine.apply(op);
            }
        }
        engine.mark_clean();
        let before = engine.document().capture_snapshot();
        let undo_len = engine.history().undo_len();

        let target = pick(&ids(engine.document()), a);
        let root = engine.document().root_id().clone();
        let op = Operation::composite([
            Operation::change(&target, "y", json!(12)),
            Operation::add_node(json!({"type": "sprite"}), &root, 1.0, 1.0),
            Operation::change(&target, "visible", json!(3)),
        ]);
        let err = engine.apply(op).unwrap_err();

        let is_expected = matches!(err, OpError::Composite { index: 2, .. });
        prop_assert!(is_expected);
        prop_assert_eq!(&engine.document().capture_snapshot(), &before);
        prop_assert!(!engine.is_dirty());
        prop_assert_eq!(engine.history().undo_len(), undo_len);
    }
}
