use std::path::PathBuf;

use version_sync::warning::SyncWarning;

// ============================================================================
// SyncWarning Display Tests
// ============================================================================

#[test]
fn test_sync_warning_fetch_failed_display() {
    let warning = SyncWarning::FetchFailed {
        remote: "origin".to_string(),
        reason: "network unreachable".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("Could not fetch from 'origin'"),
        "Message should name the remote, got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("network unreachable"),
        "Message should contain the reason, got: {}",
        display_msg
    );
}

#[test]
fn test_sync_warning_field_not_found_display() {
    let warning = SyncWarning::FieldNotFound {
        path: PathBuf::from("fxmanifest.lua"),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("fxmanifest.lua"),
        "Message should contain the path, got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("skipped"),
        "Message should say the manifest was skipped, got: {}",
        display_msg
    );
}

#[test]
fn test_sync_warning_push_failed_with_hint() {
    let warning = SyncWarning::PushFailed {
        remote: "origin".to_string(),
        branch: "main".to_string(),
        reason: "403 Permission denied".to_string(),
        hint: Some("use a token"),
    };

    let display_msg = warning.to_string();
    assert_eq!(
        display_msg,
        "Push of 'main' to 'origin' failed: 403 Permission denied (use a token)"
    );
}

#[test]
fn test_sync_warning_push_failed_without_hint() {
    let warning = SyncWarning::PushFailed {
        remote: "origin".to_string(),
        branch: "main".to_string(),
        reason: "connection reset".to_string(),
        hint: None,
    };

    assert_eq!(
        warning.to_string(),
        "Push of 'main' to 'origin' failed: connection reset"
    );
}
