//! Scenario tests for the document and operation engine.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use tessel_model::prelude::*;

// -- helpers ----------------------------------------------------------------

fn add(engine: &mut OperationEngine, parent: &EntityId, subtree: serde_json::Value) -> EntityId {
    engine
        .apply(Operation::add_node(subtree, parent, 0.0, 0.0))
        .unwrap();
    engine.document().children(parent).unwrap().last().unwrap().clone()
}

fn names(doc: &Document, group: &EntityId) -> Vec<String> {
    doc.children(group)
        .unwrap()
        .iter()
        .map(|c| doc.get(c).unwrap().editor.name.clone())
        .collect()
}

fn sprite(name: &str) -> serde_json::Value {
    json!({"type": "sprite", "editor": {"name": name}})
}

// -- scenarios --------------------------------------------------------------

#[test]
fn delete_group_and_undo_restores_children_in_order() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let group = add(&mut engine, &root, json!({"type": "group", "editor": {"name": "enemies"}}));
    for name in ["a", "b", "c"] {
        add(&mut engine, &group, sprite(name));
    }
    let before = engine.document().capture_snapshot();

    engine.apply(Operation::delete(&group)).unwrap();
    assert_eq!(engine.document().len(), 1);

    engine.undo().unwrap();
    assert_eq!(names(engine.document(), &group), ["a", "b", "c"]);
    assert_eq!(engine.document().capture_snapshot(), before);
}

#[test]
fn move_into_own_descendant_is_a_cycle() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let outer = add(&mut engine, &root, json!({"type": "group"}));
    let inner = add(&mut engine, &outer, json!({"type": "group"}));

    let err = engine
        .apply(Operation::move_to(&outer, &inner, 0))
        .unwrap_err();
    assert!(matches!(err, OpError::Cycle { .. }));
    assert_eq!(engine.document().get(&outer).unwrap().parent.as_ref(), Some(&root));
}

#[test]
fn move_under_own_grandchild_is_a_cycle() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let outer = add(&mut engine, &root, json!({"type": "group"}));
    let mid = add(&mut engine, &outer, json!({"type": "group"}));
    let inner = add(&mut engine, &mid, json!({"type": "group"}));
    let before = engine.document().capture_snapshot();

    let err = engine
        .apply(Operation::move_to(&outer, &inner, 0))
        .unwrap_err();
    assert!(matches!(err, OpError::Cycle { .. }));
    assert_eq!(engine.document().capture_snapshot(), before);
}

#[test]
fn move_reorders_and_undo_puts_it_back() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let a = add(&mut engine, &root, sprite("a"));
    add(&mut engine, &root, sprite("b"));
    add(&mut engine, &root, sprite("c"));

    engine
        .apply(Operation::move_to(&a, &root, -1))
        .unwrap();
    assert_eq!(names(engine.document(), &root), ["b", "c", "a"]);
    engine.undo().unwrap();
    assert_eq!(names(engine.document(), &root), ["a", "b", "c"]);
}

#[test]
fn reparenting_updates_back_links() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let group = add(&mut engine, &root, json!({"type": "group"}));
    let hero = add(&mut engine, &root, sprite("hero"));

    engine
        .apply(Operation::move_to(&hero, &group, 0))
        .unwrap();
    assert_eq!(engine.document().ancestors(&hero).unwrap(), vec![group.clone(), root.clone()]);
    assert!(engine.document().is_descendant(&hero, &group));
}

#[test]
fn pasted_subtree_with_existing_ids_gets_fresh_ones() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let original = add(&mut engine, &root, sprite("hero"));

    let copy = json!({"type": "sprite", "id": original.as_str(), "editor": {"name": "hero"}});
    let pasted = add(&mut engine, &root, copy);

    assert_ne!(pasted, original);
    assert_eq!(engine.document().len(), 3);

    // Undo removes the copy, not the original.
    engine.undo().unwrap();
    assert!(engine.document().contains(&original));
    assert!(!engine.document().contains(&pasted));

    // Redo brings the copy back under the same id.
    engine.redo().unwrap();
    assert!(engine.document().contains(&pasted));
}

#[test]
fn create_name_avoids_sibling_names() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    assert_eq!(engine.document().create_name(&root, "sprite"), "sprite");
    add(&mut engine, &root, sprite("sprite"));
    add(&mut engine, &root, sprite("sprite1"));
    assert_eq!(engine.document().create_name(&root, "sprite"), "sprite2");
}

#[test]
fn dirty_flag_follows_edits_and_saves() {
    let mut engine = OperationEngine::new(Document::new());
    assert!(!engine.is_dirty());
    engine
        .apply(Operation::change_settings("snap.enabled", json!(true)))
        .unwrap();
    assert!(engine.is_dirty());
    engine.mark_clean();
    assert!(!engine.is_dirty());
    engine.undo().unwrap();
    assert!(engine.is_dirty());
}

#[test]
fn composite_is_one_undo_step_with_one_event() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let a = add(&mut engine, &root, sprite("a"));
    let b = add(&mut engine, &root, sprite("b"));

    let events = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&events);
    engine.on_change(move |_| *counter.borrow_mut() += 1);

    let undo_before = engine.history().undo_len();
    engine
        .apply(Operation::composite([
            Operation::change(&a, "x", json!(10)),
            Operation::change(&b, "x", json!(20)),
        ]))
        .unwrap();
    assert_eq!(*events.borrow(), 1);
    assert_eq!(engine.history().undo_len(), undo_before + 1);

    engine.undo().unwrap();
    assert_eq!(engine.document().get(&a).unwrap().transform.x, 0.0);
    assert_eq!(engine.document().get(&b).unwrap().transform.x, 0.0);
    assert_eq!(*events.borrow(), 2);
}

#[test]
fn failed_composite_reports_the_failing_step() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let hero = add(&mut engine, &root, sprite("hero"));
    let before = engine.document().capture_snapshot();

    let err = engine
        .apply(Operation::composite([
            Operation::delete(&hero),
            Operation::change(&hero, "x", json!(1)),
        ]))
        .unwrap_err();

    assert!(matches!(err, OpError::Composite { index: 1, .. }));
    assert!(matches!(err.root_cause(), OpError::NotFound { .. }));
    assert_eq!(engine.document().capture_snapshot(), before);
}

#[test]
fn button_and_tile_properties_round_trip_through_undo() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let button = add(&mut engine, &root, json!({"type": "button"}));
    let tile = add(&mut engine, &root, json!({"type": "tile-sprite"}));

    engine
        .apply(Operation::change(&button, "callback", json!("onStart")))
        .unwrap();
    engine
        .apply(Operation::change(&tile, "tilePosition.x", json!(8)))
        .unwrap();
    assert_eq!(
        engine.document().property(&button, "callback").unwrap(),
        json!("onStart")
    );

    engine.undo().unwrap();
    engine.undo().unwrap();
    assert_eq!(engine.document().property(&button, "callback").unwrap(), json!(null));
    assert_eq!(engine.document().property(&tile, "tilePosition.x").unwrap(), json!(0.0));
}

#[test]
fn unknown_setting_is_rejected() {
    let mut engine = OperationEngine::new(Document::new());
    let err = engine
        .apply(Operation::change_settings("fps", json!(60)))
        .unwrap_err();
    assert!(matches!(err, OpError::InvalidSetting { .. }));
    assert!(!engine.can_undo());
}

#[test]
fn add_then_delete_leaves_the_tree_as_it_was() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    add(&mut engine, &root, sprite("keep"));
    let before = engine.document().capture_snapshot();

    let temp = add(&mut engine, &root, sprite("temp"));
    engine.apply(Operation::delete(&temp)).unwrap();
    assert_eq!(engine.document().capture_snapshot(), before);
    assert!(!engine.document().contains(&temp));
}

#[test]
fn body_path_on_a_body_less_sprite_is_rejected_without_side_effects() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();
    let hero = add(&mut engine, &root, sprite("hero"));
    engine.mark_clean();
    let undo_depth = engine.history().undo_len();

    let err = engine
        .apply(Operation::change(&hero, "body.width", json!(120)))
        .unwrap_err();
    assert!(matches!(err, OpError::InvalidPath { .. }));
    assert!(!engine.is_dirty());
    assert_eq!(engine.history().undo_len(), undo_depth);
    assert!(engine.document().get(&hero).unwrap().kind.body().is_none());
}

#[test]
fn add_at_a_non_finite_position_is_rejected() {
    let mut engine = OperationEngine::new(Document::new());
    let root = engine.document().root_id().clone();

    for (x, y, path) in [(f64::NAN, 0.0, "x"), (0.0, f64::INFINITY, "y")] {
        let err = engine
            .apply(Operation::add_node(sprite("ghost"), &root, x, y))
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidValue { path: ref p, .. } if p == path));
    }
    assert_eq!(engine.document().len(), 1);
    assert!(!engine.is_dirty());
    assert!(!engine.can_undo());
}
