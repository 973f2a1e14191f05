use linkman_types::{ExtraHeader, SettingKey, Settings, SettingsPatch};
use pretty_assertions::assert_eq;

#[test]
fn default_settings_are_unconfigured() {
    let s = Settings::default();
    assert!(s.backend_url().is_none());
    assert!(!s.auto_sync);
    assert!(s.extra_headers.is_empty());
}

#[test]
fn backend_url_is_trimmed() {
    let s = Settings {
        backend_url: "  http://localhost:3000/ ".into(),
        ..Default::default()
    };
    assert_eq!(s.backend_url(), Some("http://localhost:3000"));
}

#[test]
fn blank_backend_url_is_unset() {
    let s = Settings {
        backend_url: "   ".into(),
        ..Default::default()
    };
    assert!(s.backend_url().is_none());
}

#[test]
fn settings_use_persisted_key_names() {
    let s = Settings {
        backend_url: "http://b".into(),
        api_key: "k".into(),
        auto_sync: true,
        extra_headers: vec![ExtraHeader::new("X-Team", "core")],
    };
    let json = serde_json::to_value(&s).unwrap();
    for key in SettingKey::ALL {
        assert!(json.get(key.as_str()).is_some(), "missing {key}");
    }
}

#[test]
fn extra_header_parse() {
    let h = ExtraHeader::parse(" X-Trace : abc:def ").unwrap();
    assert_eq!(h, ExtraHeader::new("X-Trace", "abc:def"));
    assert!(ExtraHeader::parse("no-colon").is_err());
    assert!(ExtraHeader::parse(": value").is_err());
}

#[test]
fn patch_keys_follow_set_fields() {
    let patch = SettingsPatch::default().auto_sync(true).api_key("k");
    assert_eq!(patch.keys(), vec![SettingKey::ApiKey, SettingKey::AutoSync]);
    assert!(SettingsPatch::default().is_empty());
}
