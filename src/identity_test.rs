use super::*;
use serde_json::json;

#[test]
fn anonymous_has_no_roles_or_name() {
    let anon = Identity::anonymous();
    assert!(!anon.is_authenticated());
    assert_eq!(anon.username(), "");
    assert!(anon.roles().is_empty());
    assert!(!anon.otp_pending());
}

#[test]
fn empty_false_and_garbage_normalize_identically() {
    let anon = Identity::anonymous();
    assert_eq!(Identity::from_probe(&json!({})), anon);
    assert_eq!(Identity::from_probe(&json!({ "is_authenticated": false })), anon);
    assert_eq!(Identity::from_probe(&json!({ "authenticated": false, "username": "ghost" })), anon);
    assert_eq!(Identity::from_probe(&json!("yes")), anon);
    assert_eq!(Identity::from_probe(&json!(null)), anon);
    assert_eq!(Identity::from_probe(&json!({ "is_authenticated": "true" })), anon);
    assert_eq!(Identity::from_body(&Body::Empty), anon);
}

#[test]
fn staff_or_superuser_is_admin() {
    let staff = Identity::from_probe(&json!({ "is_authenticated": true, "username": "ann", "is_staff": true }));
    assert!(staff.is_admin());
    assert_eq!(staff.roles(), &BTreeSet::from([Role::Admin]));
    assert_eq!(staff.username(), "ann");

    let root = Identity::from_probe(&json!({ "authenticated": true, "username": "root", "is_superuser": true }));
    assert!(root.is_admin());
}

#[test]
fn plain_user_has_user_role() {
    let user = Identity::from_probe(&json!({
        "is_authenticated": true,
        "username": " bob ",
        "is_staff": false,
        "is_superuser": false,
    }));
    assert!(user.is_authenticated());
    assert!(!user.is_admin());
    assert_eq!(user.roles(), &BTreeSet::from([Role::User]));
    assert_eq!(user.username(), "bob");
}

#[test]
fn otp_pending_read_from_payload() {
    let id = Identity::from_probe(&json!({ "authenticated": true, "username": "a", "otp_pending": true }));
    assert!(id.otp_pending());
}

#[test]
fn anonymous_cannot_be_otp_pending() {
    assert!(!Identity::anonymous().with_otp_pending(true).otp_pending());
    assert!(!Identity::from_probe(&json!({ "authenticated": false, "otp_pending": true })).otp_pending());
}

#[test]
fn serializes_roles_lowercase() {
    let json = serde_json::to_value(Identity::authenticated("ann", true)).unwrap();
    assert_eq!(json["roles"], json!(["admin"]));
    assert_eq!(json["authenticated"], json!(true));
}
