//! TOML configuration load/save.

use voxtask::AppConfig;
use voxtask::config::StorageBackend;
use voxtask::users::{CredentialSlot, UserProfile};

#[test]
fn config_with_users_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.server.port = 8088;
    config.email.api_key = "re_123".into();
    config.reminders.tick_interval_secs = 30;
    config.storage.backend = StorageBackend::Memory;
    let mut user = UserProfile::new("u1", "Ada");
    user.email = Some("ada@example.com".into());
    user.credentials.primary = Some("key-a".into());
    user.credentials.secondary = Some("key-b".into());
    user.credentials.active = CredentialSlot::Secondary;
    config.users.push(user.clone());

    config.save_to_file(&path).unwrap();
    let loaded = AppConfig::from_file(&path).unwrap();

    assert_eq!(loaded.server.port, 8088);
    assert_eq!(loaded.email.api_key, "re_123");
    assert_eq!(loaded.reminders.tick_interval_secs, 30);
    assert_eq!(loaded.storage.backend, StorageBackend::Memory);
    assert_eq!(loaded.users, vec![user]);
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[completion]
model = "gemini-2.0-flash"

[[users]]
id = "u1"
name = "Ada"
"#,
    )
    .unwrap();

    let loaded = AppConfig::from_file(&path).unwrap();
    let defaults = AppConfig::default();
    assert_eq!(loaded.completion.model, "gemini-2.0-flash");
    assert_eq!(loaded.completion.base_url, defaults.completion.base_url);
    assert_eq!(loaded.server.port, defaults.server.port);
    assert_eq!(loaded.users.len(), 1);
    assert!(loaded.users[0].email_reminders);
    assert_eq!(loaded.users[0].credentials.active, CredentialSlot::Primary);
}

#[test]
fn invalid_toml_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();
    let err = AppConfig::from_file(&path).unwrap_err();
    assert_eq!(err.code(), "CONFIG_INVALID");
}
