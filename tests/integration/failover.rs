//! Per-user completion key failover.

use voxtask::users::{CredentialSlot, UserDirectory};

use crate::helpers::{Harness, OWNER};

#[tokio::test]
async fn rejected_primary_switches_to_secondary_and_sticks() {
    let h = Harness::in_memory();
    h.completion.reject_key("key-a");

    let reply = h.say("what's on my list", r#"{"action":"list"}"#).await;
    assert!(reply.success, "{:?}", reply.error);
    assert_eq!(h.completion.keys_used(), vec!["key-a", "key-b"]);

    let stored = h.users.profile(OWNER).await.unwrap().unwrap();
    assert_eq!(stored.credentials.active, CredentialSlot::Secondary);

    // Next command starts from the persisted secondary key.
    let reply = h.say("what's on my list", r#"{"action":"list"}"#).await;
    assert!(reply.success);
    assert_eq!(h.completion.keys_used(), vec!["key-a", "key-b", "key-b"]);
}

#[tokio::test]
async fn both_keys_rejected_gives_spoken_credential_error() {
    let h = Harness::in_memory();
    h.completion.reject_key("key-a");
    h.completion.reject_key("key-b");

    let reply = h.say("list", r#"{"action":"list"}"#).await;
    assert!(!reply.success);
    assert_eq!(reply.error.unwrap().code, "CREDENTIAL_REJECTED");
    assert!(reply.response.contains("API key"));
    assert_eq!(h.completion.keys_used().len(), 2);
}

#[tokio::test]
async fn user_without_keys_gets_configuration_error() {
    let mut profile = crate::helpers::profile();
    profile.credentials.primary = None;
    profile.credentials.secondary = None;
    let h = Harness::with_profile(
        std::sync::Arc::new(voxtask::tasks::MemoryTaskStore::new()),
        profile,
    );

    let reply = h.say("list", r#"{"action":"list"}"#).await;
    assert_eq!(reply.error.unwrap().code, "CONFIGURATION_MISSING");
    assert!(h.completion.keys_used().is_empty());
}
