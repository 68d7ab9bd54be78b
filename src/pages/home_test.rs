use super::*;

#[test]
fn create_requires_nickname() {
    assert_eq!(create_target("  "), Err(NICKNAME_REQUIRED));
    assert_eq!(create_target("alice"), Ok("/chat?nickname=alice".to_owned()));
}

#[test]
fn join_requires_room_and_nickname() {
    assert_eq!(join_target("", "alice"), Err(ROOM_AND_NICKNAME_REQUIRED));
    assert_eq!(join_target("R1", " "), Err(ROOM_AND_NICKNAME_REQUIRED));
    assert_eq!(join_target("R1", "bob"), Ok("/chat?nickname=bob&roomId=R1".to_owned()));
}

#[test]
fn join_target_encodes_values() {
    assert_eq!(
        join_target("room #1", "bob"),
        Ok("/chat?nickname=bob&roomId=room%20%231".to_owned())
    );
}
