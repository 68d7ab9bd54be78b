use super::*;
use futures::executor::block_on;
use serde_json::json;

#[test]
fn encode_request_carries_type_data_and_callback() {
    let raw = encode_request(MessageKind::JoinSession, json!({ "sessionId": "R1" }), Some("cb-1"))
        .expect("encode");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["type"], "joinSession");
    assert_eq!(value["data"]["sessionId"], "R1");
    assert_eq!(value["callbackId"], "cb-1");
}

#[test]
fn encode_push_omits_callback() {
    let raw = encode_request(MessageKind::SendMessage, json!({ "body": "hi" }), None).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert!(value.get("callbackId").is_none());
}

#[test]
fn decode_envelope_defaults_missing_data() {
    let envelope = decode_envelope(r#"{"type":"userList"}"#).expect("decode");
    assert_eq!(envelope.kind, "userList");
    assert_eq!(envelope.data, serde_json::Value::Null);
    assert_eq!(envelope.callback_id, None);
}

#[test]
fn decode_envelope_rejects_garbage() {
    assert!(matches!(decode_envelope("not json"), Err(TransportError::Protocol(_))));
    assert!(matches!(decode_envelope(r#"{"data":{}}"#), Err(TransportError::Protocol(_))));
}

#[test]
fn reply_with_error_field_is_rejection() {
    let envelope = decode_envelope(r#"{"type":"joinSession","data":{"errorMessage":"no such room"}}"#)
        .expect("decode");
    assert_eq!(reply_result(&envelope), Err(TransportError::Rejected("no such room".to_owned())));
}

#[test]
fn route_resolves_matching_waiter() {
    let pending = PendingReplies::default();
    let (id, rx) = pending.register();
    let envelope = WireEnvelope {
        kind: "createSession".to_owned(),
        data: json!({ "sessionId": "R1" }),
        callback_id: Some(id),
    };
    assert_eq!(pending.route(envelope), None);
    assert!(pending.is_empty());
    assert_eq!(block_on(rx), Ok(Ok(json!({ "sessionId": "R1" }))));
}

#[test]
fn route_passes_pushes_and_unknown_callbacks_through() {
    let pending = PendingReplies::default();
    let (_id, _rx) = pending.register();

    let push = WireEnvelope { kind: "sendMessage".to_owned(), data: json!({ "body": "hi" }), callback_id: None };
    assert_eq!(pending.route(push), Some(InboundEvent::SendMessage(json!({ "body": "hi" }))));

    let stray = WireEnvelope { kind: "joinSession".to_owned(), data: json!({}), callback_id: Some("cb-99".to_owned()) };
    assert!(matches!(pending.route(stray), Some(InboundEvent::Other { .. })));
    assert_eq!(pending.len(), 1);
}

#[test]
fn callback_ids_are_unique() {
    let pending = PendingReplies::default();
    let (a, _ra) = pending.register();
    let (b, _rb) = pending.register();
    assert_ne!(a, b);
}

#[test]
fn fail_all_closes_every_request() {
    let pending = PendingReplies::default();
    let (_a, ra) = pending.register();
    let (b, rb) = pending.register();
    pending.cancel(&b);
    pending.fail_all();
    assert_eq!(block_on(ra), Ok(Err(TransportError::Closed)));
    assert!(block_on(rb).is_err());
    assert!(pending.is_empty());
}

#[test]
fn finish_socket_fails_waiters_before_notifying() {
    let pending = PendingReplies::default();
    let closed = Cell::new(false);
    let (_id, rx) = pending.register();
    let notified = Cell::new(0);

    finish_socket(&closed, &pending, &|| {
        assert!(pending.is_empty());
        notified.set(notified.get() + 1);
    });

    assert!(closed.get());
    assert_eq!(notified.get(), 1);
    assert_eq!(block_on(rx), Ok(Err(TransportError::Closed)));
}
