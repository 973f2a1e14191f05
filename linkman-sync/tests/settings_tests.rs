use linkman_sync::{SettingsBackend, SettingsGateway, SqliteSettings};
use linkman_types::{ExtraHeader, SettingKey, Settings, SettingsPatch};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

// ── Gateway ─────────────────────────────────────────────────────

#[test]
fn empty_store_reads_defaults() {
    let gateway = SettingsGateway::in_memory();
    assert_eq!(gateway.read().unwrap(), Settings::default());
}

#[test]
fn write_persists_only_patched_fields() {
    let gateway = SettingsGateway::in_memory();
    gateway
        .write(SettingsPatch::default().backend_url("http://a").api_key("k1"))
        .unwrap();
    let after = gateway
        .write(SettingsPatch::default().api_key("k2"))
        .unwrap();

    assert_eq!(after.backend_url, "http://a");
    assert_eq!(after.api_key, "k2");
    assert!(!after.auto_sync);
    assert_eq!(gateway.read().unwrap(), after);
}

#[test]
fn extra_headers_round_trip_through_store() {
    let gateway = SettingsGateway::in_memory();
    let headers = vec![
        ExtraHeader::new("X-One", "1"),
        ExtraHeader::new("X-Two", "2"),
    ];
    gateway
        .write(SettingsPatch::default().extra_headers(headers.clone()))
        .unwrap();
    assert_eq!(gateway.read().unwrap().extra_headers, headers);
}

#[tokio::test]
async fn write_notifies_subscribers_with_touched_keys() {
    let gateway = SettingsGateway::in_memory();
    let mut events = gateway.subscribe();

    gateway
        .write(SettingsPatch::default().auto_sync(true).api_key("k"))
        .unwrap();

    let event = events.recv().await.unwrap();
    assert!(event.touched(SettingKey::AutoSync));
    assert!(event.touched(SettingKey::ApiKey));
    assert!(!event.touched(SettingKey::BackendUrl));
    assert!(event.settings.auto_sync);
}

#[tokio::test]
async fn empty_patch_does_not_notify() {
    let gateway = SettingsGateway::in_memory();
    let mut events = gateway.subscribe();

    gateway.write(SettingsPatch::default()).unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn write_without_subscribers_succeeds() {
    let gateway = SettingsGateway::in_memory();
    assert!(gateway
        .write(SettingsPatch::default().auto_sync(true))
        .unwrap()
        .auto_sync);
}

#[test]
fn corrupt_value_is_serialization_error() {
    let backend = Arc::new(SqliteSettings::open_in_memory().unwrap());
    backend
        .set(SettingKey::AutoSync.as_str(), serde_json::json!("yes"))
        .unwrap();
    let gateway = SettingsGateway::new(backend);
    assert!(gateway.read().is_err());
}

// ── SQLite store ────────────────────────────────────────────────

#[test]
fn sqlite_get_missing_is_none() {
    let store = SqliteSettings::open_in_memory().unwrap();
    assert_eq!(store.get("backendUrl").unwrap(), None);
}

#[test]
fn sqlite_set_overwrites() {
    let store = SqliteSettings::open_in_memory().unwrap();
    store.set("autoSync", serde_json::json!(true)).unwrap();
    store.set("autoSync", serde_json::json!(false)).unwrap();
    assert_eq!(store.get("autoSync").unwrap(), Some(serde_json::json!(false)));
}

#[test]
fn sqlite_settings_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.db");
    let path = path.to_str().unwrap();

    {
        let gateway = SettingsGateway::new(Arc::new(SqliteSettings::open(path).unwrap()));
        gateway
            .write(
                SettingsPatch::default()
                    .backend_url("https://bookmarks.example")
                    .auto_sync(true),
            )
            .unwrap();
    }

    let gateway = SettingsGateway::new(Arc::new(SqliteSettings::open(path).unwrap()));
    let settings = gateway.read().unwrap();
    assert_eq!(settings.backend_url, "https://bookmarks.example");
    assert!(settings.auto_sync);
}
