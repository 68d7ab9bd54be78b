use super::*;

#[test]
fn closed_transport_maps_to_connection_error() {
    let err = TransportError::Closed.into_room_error();
    assert!(matches!(err, ChatError::Connection(_)));
    assert!(err.is_terminal());
}

#[test]
fn rejected_request_maps_to_room_resolution_error() {
    let err = TransportError::Rejected("no such room".to_owned()).into_room_error();
    assert_eq!(err, ChatError::RoomResolution("no such room".to_owned()));
}

#[test]
fn store_errors_become_recoverable_cache_errors() {
    let err: ChatError = StoreError::Corrupt { key: "k".to_owned(), reason: "eof".to_owned() }.into();
    assert!(matches!(err, ChatError::Cache(_)));
    assert!(!err.is_terminal());
    assert!(err.to_string().contains("corrupt cached value under k"));
}

#[test]
fn malformed_event_is_not_terminal() {
    assert!(!ChatError::MalformedEvent("missing data".to_owned()).is_terminal());
}
