#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn gesture_default_is_idle() {
    assert_eq!(Gesture::default(), Gesture::Idle);
    assert_eq!(Gesture::Idle.target(), None);
}

#[test]
fn gesture_target_reports_object() {
    let pressed = Gesture::Pressed { id: "o1".into(), start: [0.0; 3], offset: [0.0; 3] };
    let dragging = Gesture::Dragging { id: "o2".into(), offset: [0.0; 3] };
    assert_eq!(pressed.target(), Some("o1"));
    assert_eq!(dragging.target(), Some("o2"));
}

#[test]
fn distance_is_euclidean() {
    assert_eq!(distance([0.0, 0.0, 0.0], [3.0, 4.0, 0.0]), 5.0);
    assert_eq!(distance([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]), 0.0);
}

#[test]
fn sub_is_componentwise() {
    assert_eq!(sub([3.0, 2.0, 1.0], [1.0, 1.0, 1.0]), [2.0, 1.0, 0.0]);
}

#[test]
fn pointer_input_deserializes_tagged_json() {
    let down: PointerInput = serde_json::from_str(r#"{"type":"down","id":"o1","hit":[1,2,3]}"#).unwrap();
    assert_eq!(down, PointerInput::Down { id: "o1".into(), hit: [1.0, 2.0, 3.0] });

    let up: PointerInput = serde_json::from_str(r#"{"type":"up"}"#).unwrap();
    assert_eq!(up, PointerInput::Up);

    let dbl: PointerInput = serde_json::from_str(r#"{"type":"double_click","id":"o1"}"#).unwrap();
    assert_eq!(dbl, PointerInput::DoubleClick { id: "o1".into() });

    let bg: PointerInput = serde_json::from_str(r#"{"type":"background_click"}"#).unwrap();
    assert_eq!(bg, PointerInput::BackgroundClick);
}
