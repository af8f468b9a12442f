use std::path::PathBuf;

use crew::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::Validation("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let unauthorized = Error::Unauthorized("no user".to_string());
    assert_eq!(unauthorized.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::not_found("task", "tsk-1");
    assert_eq!(missing.exit_code(), exit_codes::NOT_FOUND);

    let op = Error::LockFailed(PathBuf::from("locks/team-1.lock"));
    assert_eq!(op.exit_code(), exit_codes::INTERNAL);
}

#[test]
fn kinds_follow_taxonomy() {
    assert_eq!(Error::Validation("x".into()).kind(), "validation");
    assert_eq!(Error::Unauthorized("x".into()).kind(), "unauthorized");
    assert_eq!(Error::not_found("team", "t").kind(), "not_found");
    assert_eq!(Error::NoAvailableMembers("t".into()).kind(), "not_found");
    let conflict = Error::Conflict {
        kind: "team",
        id: "t".into(),
        expected: 1,
        found: 2,
    };
    assert_eq!(conflict.kind(), "conflict");
    let relocated = Error::Relocated {
        kind: "project",
        id: "prj-1".into(),
    };
    assert_eq!(relocated.kind(), "conflict");
    assert_eq!(relocated.exit_code(), exit_codes::NOT_FOUND);
    assert_eq!(Error::OperationFailed("x".into()).kind(), "internal");
}

#[test]
fn internal_errors_get_stable_prefix() {
    let err = Error::OperationFailed("disk full".to_string());
    assert!(err.public_message().starts_with("internal storage failure"));
    assert!(err.public_message().contains("disk full"));

    let err = Error::not_found("project", "prj-1");
    assert_eq!(err.public_message(), "project not found: prj-1");
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::not_found("member", "mbr-9");
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::NOT_FOUND);
    assert_eq!(json.kind, "not_found");
    assert!(json.error.contains("member not found"));
    let details = json.details.expect("details");
    assert_eq!(details["id"], "mbr-9");
}
