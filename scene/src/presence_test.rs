use serde_json::json;

use super::*;

const NOW: &str = "2026-01-01T00:00:00Z";

fn user(user_id: &str, session: &str) -> PresenceUser {
    PresenceUser {
        id: session.to_owned(),
        user_id: user_id.to_owned(),
        user_name: "Bob".to_owned(),
        color: "#ef4444".to_owned(),
        position: [0.0, 0.0, 0.0],
        last_seen: NOW.to_owned(),
    }
}

#[test]
fn upsert_same_user_with_new_session_replaces() {
    let mut store = PresenceStore::new();
    store.upsert(user("u2", "s1"));
    store.upsert(user("u2", "s2"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("u2").unwrap().id, "s2");
}

#[test]
fn remove_by_user_id() {
    let mut store = PresenceStore::new();
    store.upsert(user("u2", "s1"));
    store.upsert(user("u3", "s3"));
    assert!(store.remove("u2").is_some());
    assert!(store.remove("u2").is_none());
    let remaining: Vec<&str> = store.list().iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(remaining, vec!["u3"]);
}

#[test]
fn clear_empties_store() {
    let mut store = PresenceStore::new();
    store.upsert(user("u2", "s1"));
    store.clear();
    assert!(store.is_empty());
    assert!(store.list().is_empty());
}

#[test]
fn parse_presence_reads_full_payload() {
    let payload = json!({
        "id": "sess-9",
        "userId": "u2",
        "userName": "Bob",
        "color": "#ef4444",
        "position": [1.0, 0.0, -1.0],
        "online_at": "2025-12-31T23:59:59Z"
    });
    let parsed = parse_presence(&payload, NOW).unwrap();
    assert_eq!(parsed.id, "sess-9");
    assert_eq!(parsed.user_name, "Bob");
    assert_eq!(parsed.position, [1.0, 0.0, -1.0]);
    assert_eq!(parsed.last_seen, NOW);
}

#[test]
fn parse_presence_fills_defaults() {
    let parsed = parse_presence(&json!({ "userId": "u7" }), NOW).unwrap();
    assert_eq!(parsed.id, "u7");
    assert_eq!(parsed.user_name, "User");
    assert_eq!(parsed.color, "#3b82f6");
    assert_eq!(parsed.position, [0.0, 0.0, 0.0]);
}

#[test]
fn parse_presence_tolerates_bad_position() {
    let parsed = parse_presence(&json!({ "userId": "u7", "position": "up" }), NOW).unwrap();
    assert_eq!(parsed.position, [0.0, 0.0, 0.0]);
}

#[test]
fn parse_presence_drops_missing_or_blank_user_id() {
    assert!(parse_presence(&json!({ "userName": "Ghost" }), NOW).is_none());
    assert!(parse_presence(&json!({ "userId": "  " }), NOW).is_none());
    assert!(parse_presence(&json!({ "userId": 42 }), NOW).is_none());
    assert!(parse_presence(&json!("u2"), NOW).is_none());
}
