#![allow(clippy::float_cmp)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::color::color_of;
use crate::doc::SceneObject;

fn make_object(id: &str, position: Vec3) -> SceneObject {
    SceneObject {
        id: id.to_owned(),
        kind: ObjectKind::Cube,
        position,
        rotation: [0.0, 0.0, 0.0],
        scale: [1.0, 1.0, 1.0],
        color: "#06b6d4".to_owned(),
        owner_id: "u1".to_owned(),
        owner_name: "Ada".to_owned(),
        created_at: "2026-01-01T00:00:00Z".to_owned(),
    }
}

fn scene_with(id: &str, position: Vec3) -> SceneStore {
    let mut scene = SceneStore::new();
    scene.add(make_object(id, position));
    scene
}

// =============================================================
// Click vs drag
// =============================================================

#[test]
fn press_and_release_without_motion_selects() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    assert!(ctl.on_pointer_down(&scene, "o1", [0.0, 1.0, 0.0]).is_empty());
    let actions = ctl.on_pointer_up(&mut scene);

    assert!(actions.is_empty());
    assert_eq!(scene.selected(), Some("o1"));
    assert!(!scene.is_dragging());
    assert_eq!(ctl.gesture(), &Gesture::Idle);
}

#[test]
fn small_motion_stays_a_click() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    ctl.on_pointer_down(&scene, "o1", [0.0, 1.0, 0.0]);
    ctl.on_pointer_move(&mut scene, [0.05, 1.0, 0.0]);
    assert!(!scene.is_dragging());
    assert!(matches!(ctl.gesture(), Gesture::Pressed { .. }));

    ctl.on_pointer_up(&mut scene);
    assert_eq!(scene.selected(), Some("o1"));
    assert_eq!(scene.get("o1").unwrap().position, [0.0, 1.0, 0.0]);
}

#[test]
fn drag_updates_store_and_persists_once_on_release() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    // Grab the object half a unit to the right of its center.
    ctl.on_pointer_down(&scene, "o1", [0.5, 1.0, 0.0]);
    assert!(ctl.on_pointer_move(&mut scene, [1.5, 1.0, 0.0]).is_empty());
    assert!(scene.is_dragging());

    assert!(ctl.on_pointer_move(&mut scene, [2.5, 1.0, 0.0]).is_empty());
    assert_eq!(scene.get("o1").unwrap().position, [2.0, 1.0, 0.0]);
    assert!(ctl.on_pointer_move(&mut scene, [3.5, 1.0, 1.0]).is_empty());
    assert_eq!(scene.get("o1").unwrap().position, [3.0, 1.0, 1.0]);

    let actions = ctl.on_pointer_up(&mut scene);
    assert_eq!(actions, vec![Action::PersistPosition { id: "o1".into(), position: [3.0, 1.0, 1.0] }]);
    assert!(!scene.is_dragging());
    assert_eq!(scene.selected(), None);
}

#[test]
fn drag_clamps_height_at_floor() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    ctl.on_pointer_down(&scene, "o1", [0.0, 1.0, 0.0]);
    ctl.on_pointer_move(&mut scene, [0.0, 0.5, 0.0]);
    ctl.on_pointer_move(&mut scene, [1.0, -3.0, 0.0]);

    assert_eq!(scene.get("o1").unwrap().position, [1.0, 0.0, 0.0]);
}

#[test]
fn drag_of_object_removed_mid_gesture_persists_nothing() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    ctl.on_pointer_down(&scene, "o1", [0.0, 1.0, 0.0]);
    ctl.on_pointer_move(&mut scene, [1.0, 1.0, 0.0]);
    scene.remove("o1");
    ctl.on_pointer_move(&mut scene, [2.0, 1.0, 0.0]);

    assert!(ctl.on_pointer_up(&mut scene).is_empty());
    assert!(!scene.is_dragging());
}

#[test]
fn pointer_down_on_unknown_object_is_ignored() {
    let mut scene = SceneStore::new();
    let mut ctl = InteractionController::new();

    ctl.on_pointer_down(&scene, "ghost", [0.0; 3]);
    assert_eq!(ctl.gesture(), &Gesture::Idle);
    assert!(ctl.on_pointer_up(&mut scene).is_empty());
}

#[test]
fn background_click_clears_selection() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();
    scene.select(Some("o1"));

    ctl.on_background_click(&mut scene);
    assert_eq!(scene.selected(), None);
}

// =============================================================
// Delete confirmation
// =============================================================

#[test]
fn double_click_then_confirm_removes_and_persists_delete() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();
    scene.select(Some("o1"));

    let prompt = ctl.on_double_click(&scene, "o1");
    assert_eq!(prompt, vec![Action::ConfirmDelete { id: "o1".into() }]);
    assert_eq!(ctl.pending_delete(), Some("o1"));

    let actions = ctl.confirm_delete(&mut scene);
    assert_eq!(actions, vec![Action::PersistDelete { id: "o1".into() }]);
    assert!(scene.is_empty());
    assert_eq!(scene.selected(), None);
    assert_eq!(ctl.pending_delete(), None);
}

#[test]
fn cancel_delete_keeps_object() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    ctl.on_double_click(&scene, "o1");
    ctl.cancel_delete();

    assert!(ctl.confirm_delete(&mut scene).is_empty());
    assert!(scene.contains("o1"));
}

#[test]
fn double_click_on_unknown_object_opens_nothing() {
    let scene = SceneStore::new();
    let mut ctl = InteractionController::new();
    assert!(ctl.on_double_click(&scene, "ghost").is_empty());
    assert_eq!(ctl.pending_delete(), None);
}

#[test]
fn confirm_delete_of_dragged_object_ends_drag() {
    let mut scene = scene_with("o1", [0.0, 1.0, 0.0]);
    let mut ctl = InteractionController::new();

    ctl.on_pointer_down(&scene, "o1", [0.0, 1.0, 0.0]);
    ctl.on_pointer_move(&mut scene, [1.0, 1.0, 0.0]);
    ctl.on_double_click(&scene, "o1");
    ctl.confirm_delete(&mut scene);

    assert!(!scene.is_dragging());
    assert_eq!(ctl.gesture(), &Gesture::Idle);
    assert!(ctl.on_pointer_up(&mut scene).is_empty());
}

// =============================================================
// Add
// =============================================================

#[test]
fn add_object_builds_insert_inside_spawn_square() {
    let identity = Identity::new("u1", "Ada");
    let ctl = InteractionController::new();
    let mut rng = StdRng::seed_from_u64(7);

    let actions = ctl.add_object(ObjectKind::Sphere, &identity, &mut rng, "2026-01-01T00:00:00Z");
    let [Action::PersistInsert(record)] = actions.as_slice() else {
        panic!("expected one insert, got {actions:?}");
    };

    assert_eq!(record.kind, ObjectKind::Sphere);
    assert!(record.position[0].abs() <= SPAWN_SQUARE / 2.0);
    assert!(record.position[2].abs() <= SPAWN_SQUARE / 2.0);
    assert_eq!(record.position[1], SPAWN_HEIGHT);
    assert_eq!(record.rotation, [0.0, 0.0, 0.0]);
    assert_eq!(record.scale, [1.0, 1.0, 1.0]);
    assert_eq!(record.color, color_of("u1"));
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.user_name, "Ada");
    assert!(uuid::Uuid::parse_str(&record.id).is_ok());
}

#[test]
fn add_object_leaves_store_untouched_and_ids_differ() {
    let identity = Identity::new("u1", "Ada");
    let ctl = InteractionController::new();
    let mut rng = StdRng::seed_from_u64(1);

    let first = ctl.add_object(ObjectKind::Cube, &identity, &mut rng, "t");
    let second = ctl.add_object(ObjectKind::Cube, &identity, &mut rng, "t");
    let (Action::PersistInsert(a), Action::PersistInsert(b)) = (&first[0], &second[0]) else {
        panic!("expected inserts");
    };
    assert_ne!(a.id, b.id);
}
