use super::*;
use crate::net::scripted::{message, system_message};
use crate::state::store::MemoryStore;
use std::rc::Rc;

fn reconciler() -> MessageReconciler {
    MessageReconciler::new(PresenceFilter::default())
}

fn push(data: serde_json::Value) -> InboundEvent {
    InboundEvent::SendMessage(data)
}

fn ids(r: &MessageReconciler) -> Vec<String> {
    r.snapshot().into_iter().map(|m| m.id).collect()
}

fn assert_unique_ids(r: &MessageReconciler) {
    let all = ids(r);
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(all.len(), unique.len(), "duplicate ids in {all:?}");
}

// =============================================================
// seed / merge_history
// =============================================================

#[test]
fn seed_is_idempotent() {
    let mut r = reconciler();
    r.seed(vec![message("m1", "a", "one")]);
    r.seed(vec![message("m2", "b", "two")]);
    assert_eq!(ids(&r), vec!["m1"]);
}

#[test]
fn seed_then_identical_replay_does_not_duplicate() {
    let cached = vec![message("m1", "a", "one"), message("m2", "b", "two")];
    let mut r = reconciler();
    r.seed(cached.clone());
    let added = r.merge_history(&cached);
    assert_eq!(added, 0);
    assert_eq!(r.len(), cached.len());
}

#[test]
fn rejoin_appends_only_new_history_after_cached() {
    let mut r = reconciler();
    r.seed(vec![message("m1", "a", "one")]);
    r.merge_history(&[message("m1", "a", "one"), message("m2", "b", "two")]);
    assert_eq!(ids(&r), vec!["m1", "m2"]);
}

#[test]
fn merge_history_filters_presence_noise_only() {
    let mut r = reconciler();
    r.merge_history(&[
        system_message("s1", "alice joined the party"),
        message("m1", "alice", "hi"),
        system_message("s2", "bob left"),
        system_message("s3", "room renamed to lobby"),
        message("m2", "carol", "I left my keys"),
    ]);
    assert_eq!(ids(&r), vec!["m1", "s3", "m2"]);
}

#[test]
fn seed_drops_presence_noise_from_old_caches() {
    let mut r = reconciler();
    r.seed(vec![system_message("s1", "Bob Joined"), message("m1", "a", "x")]);
    assert_eq!(ids(&r), vec!["m1"]);
}

#[test]
fn empty_history_yields_empty_snapshot() {
    let mut r = reconciler();
    assert_eq!(r.merge_history(&[]), 0);
    assert!(r.snapshot().is_empty());
    assert!(r.is_empty());
}

// =============================================================
// append_local
// =============================================================

#[test]
fn local_echo_is_last_entry_immediately() {
    let mut r = reconciler();
    r.merge_history(&[message("m1", "bob", "yo")]);
    let sent = r.append_local("hi", "alice", "a.png", 42).expect("not sealed");
    let snapshot = r.snapshot();
    let last = snapshot.last().expect("log has entries");
    assert_eq!(last.body, "hi");
    assert_eq!(last.sender_nickname, "alice");
    assert_eq!(last.sender_icon, "a.png");
    assert_eq!(last.timestamp, 42);
    assert!(!last.is_system_message);
    assert_eq!(last.id, sent.id);
}

#[test]
fn local_echoes_get_fresh_ids() {
    let mut r = reconciler();
    let a = r.append_local("same", "alice", "", 1).expect("not sealed");
    let b = r.append_local("same", "alice", "", 1).expect("not sealed");
    assert_ne!(a.id, b.id);
    assert_eq!(r.len(), 2);
}

// =============================================================
// append_inbound
// =============================================================

#[test]
fn inbound_message_is_appended_with_defaults() {
    let mut r = reconciler();
    let applied = r.append_inbound(&push(serde_json::json!({ "body": "hey" })), 99);
    assert_eq!(applied, Applied::Appended);
    let msg = &r.snapshot()[0];
    assert_eq!(msg.sender_nickname, "Unknown");
    assert_eq!(msg.sender_icon, "");
    assert_eq!(msg.timestamp, 99);
}

#[test]
fn non_message_events_are_ignored() {
    let mut r = reconciler();
    let typing = InboundEvent::TypingPresence(serde_json::json!({ "usersTyping": ["bob"] }));
    let other = InboundEvent::Other { kind: "ping".to_owned(), data: serde_json::Value::Null };
    assert_eq!(r.append_inbound(&typing, 1), Applied::Ignored);
    assert_eq!(r.append_inbound(&other, 1), Applied::Ignored);
    assert!(r.is_empty());
}

#[test]
fn malformed_payload_is_dropped_without_panicking() {
    let mut r = reconciler();
    assert_eq!(r.append_inbound(&push(serde_json::json!("not an object")), 1), Applied::Ignored);
    assert_eq!(r.append_inbound(&push(serde_json::json!([1, 2])), 1), Applied::Ignored);
    assert!(r.is_empty());
}

#[test]
fn inbound_presence_noise_is_filtered() {
    let mut r = reconciler();
    let applied = r.append_inbound(
        &push(serde_json::json!({ "permId": "s1", "isSystemMessage": true, "body": "dave joined the party" })),
        1,
    );
    assert_eq!(applied, Applied::Filtered);
    assert!(r.is_empty());
}

#[test]
fn inbound_with_known_id_is_duplicate() {
    let mut r = reconciler();
    r.merge_history(&[message("m1", "bob", "yo")]);
    let applied = r.append_inbound(&push(serde_json::json!({ "permId": "m1", "userNickname": "bob", "body": "yo" })), 1);
    assert_eq!(applied, Applied::Duplicate);
    assert_eq!(r.len(), 1);
}

#[test]
fn server_echo_with_local_id_is_suppressed() {
    let mut r = reconciler();
    let sent = r.append_local("hi", "alice", "", 1).expect("not sealed");
    let applied = r.append_inbound(
        &push(serde_json::json!({ "permId": sent.id, "userNickname": "alice", "body": "hi" })),
        2,
    );
    assert_eq!(applied, Applied::Duplicate);
    assert_eq!(r.len(), 1);
}

#[test]
fn server_echo_with_new_id_is_suppressed_once() {
    let mut r = reconciler();
    r.append_local("hi", "alice", "", 1).expect("not sealed");
    let echo = push(serde_json::json!({ "permId": "srv-1", "userNickname": "alice", "body": "hi" }));
    assert_eq!(r.append_inbound(&echo, 2), Applied::Duplicate);
    // A second copy of the same server message dedups by id.
    assert_eq!(r.append_inbound(&echo, 3), Applied::Duplicate);
    // A genuinely new identical message from the same user is shown.
    let again = push(serde_json::json!({ "permId": "srv-2", "userNickname": "alice", "body": "hi" }));
    assert_eq!(r.append_inbound(&again, 4), Applied::Appended);
    assert_eq!(r.len(), 2);
}

#[test]
fn echoes_match_oldest_pending_send_in_order() {
    let mut r = reconciler();
    r.append_local("one", "alice", "", 1).expect("not sealed");
    r.append_local("two", "alice", "", 2).expect("not sealed");
    assert_eq!(
        r.append_inbound(&push(serde_json::json!({ "permId": "s2", "userNickname": "alice", "body": "two" })), 3),
        Applied::Duplicate
    );
    assert_eq!(
        r.append_inbound(&push(serde_json::json!({ "permId": "s1", "userNickname": "alice", "body": "one" })), 4),
        Applied::Duplicate
    );
    let bodies: Vec<_> = r.snapshot().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec!["one", "two"]);
}

#[test]
fn other_users_same_text_is_not_suppressed() {
    let mut r = reconciler();
    r.append_local("hi", "alice", "", 1).expect("not sealed");
    let applied = r.append_inbound(&push(serde_json::json!({ "permId": "x", "userNickname": "bob", "body": "hi" })), 2);
    assert_eq!(applied, Applied::Appended);
    assert_eq!(r.len(), 2);
}

#[test]
fn same_nickname_same_text_after_unrelated_traffic_is_appended() {
    let mut r = reconciler();
    r.append_local("hi", "Anonymous", "", 1).expect("not sealed");
    for n in 0..50 {
        let unrelated = push(serde_json::json!({ "permId": format!("u{n}"), "userNickname": "bob", "body": "chatter" }));
        assert_eq!(r.append_inbound(&unrelated, 2), Applied::Appended);
    }
    let other_anonymous = push(serde_json::json!({ "permId": "srv-99", "userNickname": "Anonymous", "body": "hi" }));
    assert_eq!(r.append_inbound(&other_anonymous, 3), Applied::Appended);
    assert_eq!(r.len(), 52);
    assert_unique_ids(&r);
}

#[test]
fn unrelated_message_drops_pending_echoes() {
    let mut r = reconciler();
    let first = r.append_local("one", "alice", "", 1).expect("not sealed");
    r.append_local("two", "alice", "", 2).expect("not sealed");
    let from_bob = push(serde_json::json!({ "permId": "b1", "userNickname": "bob", "body": "hey" }));
    assert_eq!(r.append_inbound(&from_bob, 3), Applied::Appended);

    let late_copy = push(serde_json::json!({ "permId": "s2", "userNickname": "alice", "body": "two" }));
    assert_eq!(r.append_inbound(&late_copy, 4), Applied::Appended);
    // The local id still dedups after the window closed.
    let by_local_id = push(serde_json::json!({ "permId": first.id, "userNickname": "alice", "body": "one" }));
    assert_eq!(r.append_inbound(&by_local_id, 5), Applied::Duplicate);
    assert_eq!(r.len(), 4);
}

#[test]
fn history_containing_own_echo_is_not_duplicated() {
    let mut r = reconciler();
    r.append_local("hi", "alice", "", 1).expect("not sealed");
    r.merge_history(&[message("srv-9", "alice", "hi"), message("m2", "bob", "yo")]);
    let bodies: Vec<_> = r.snapshot().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec!["hi", "yo"]);
}

#[test]
fn arrival_order_is_kept_over_timestamps() {
    let mut r = reconciler();
    r.merge_history(&[ChatMessage { timestamp: 500, ..message("m1", "a", "late stamp") }]);
    r.append_inbound(&push(serde_json::json!({ "permId": "m2", "body": "early stamp", "timestamp": 1 })), 2);
    r.append_local("mine", "alice", "", 3).expect("not sealed");
    let bodies: Vec<_> = r.snapshot().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec!["late stamp", "early stamp", "mine"]);
}

#[test]
fn mixed_sources_never_produce_duplicate_ids() {
    let mut r = reconciler();
    r.seed(vec![message("m1", "a", "1"), message("m2", "b", "2")]);
    r.merge_history(&[message("m2", "b", "2"), message("m3", "c", "3"), message("m1", "a", "1")]);
    for round in 0..5_i64 {
        r.append_local("ping", "alice", "", round).expect("not sealed");
        r.append_inbound(&push(serde_json::json!({ "permId": "m3", "body": "3" })), round);
        r.append_inbound(&push(serde_json::json!({ "userNickname": "alice", "body": "ping", "timestamp": round })), round);
        r.append_inbound(&push(serde_json::json!({ "userNickname": "zed", "body": "z", "timestamp": round })), round);
        r.merge_history(&[message("m4", "d", "4"), message("m4", "d", "4")]);
    }
    assert_unique_ids(&r);
}

// =============================================================
// seal / persist
// =============================================================

#[test]
fn sealed_log_ignores_all_mutations() {
    let mut r = reconciler();
    r.merge_history(&[message("m1", "a", "1")]);
    let before = r.snapshot();
    r.seal();
    assert_eq!(r.append_inbound(&push(serde_json::json!({ "permId": "m9", "body": "late" })), 1), Applied::Sealed);
    assert!(r.append_local("late", "alice", "", 1).is_none());
    assert_eq!(r.merge_history(&[message("m2", "b", "2")]), 0);
    assert_eq!(r.snapshot(), before);
    assert!(r.is_sealed());
}

#[test]
fn persist_writes_log_under_room_key() {
    let store = SessionStore::new(Rc::new(MemoryStore::default()), None);
    let mut r = reconciler();
    r.merge_history(&[message("m1", "a", "1")]);
    r.persist(&store, "R1").expect("persist");
    assert_eq!(store.load_log("R1").expect("read"), r.snapshot());
}

#[test]
fn custom_presence_pattern_is_applied() {
    let mut r = MessageReconciler::new(PresenceFilter::new("(?i)entered").expect("valid pattern"));
    r.merge_history(&[system_message("s1", "bob entered"), system_message("s2", "bob joined")]);
    assert_eq!(ids(&r), vec!["s2"]);
}

#[test]
fn invalid_presence_pattern_is_config_error() {
    assert!(matches!(PresenceFilter::new("("), Err(ChatError::Config(_))));
}
