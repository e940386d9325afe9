use super::*;

#[test]
fn new_applies_defaults() {
    let config = QueueConfig::new("https://queue.example.com");
    assert_eq!(config.reannounce_ms, DEFAULT_REANNOUNCE_MS);
    assert_eq!(config.heartbeat_ms, DEFAULT_HEARTBEAT_MS);
    assert_eq!(config.storage_area, StorageArea::Session);
    assert_eq!(config.locale, Locale::En);
    assert!(config.validate().is_ok());
}

#[test]
fn missing_backend_url_is_fatal() {
    assert_eq!(QueueConfig::new("").validate(), Err(ConfigError::MissingBackendUrl));
    assert_eq!(QueueConfig::new("   ").validate(), Err(ConfigError::MissingBackendUrl));
}

#[test]
fn backend_url_must_be_http_or_same_origin_path() {
    assert!(QueueConfig::new("/queue").validate().is_ok());
    assert!(matches!(
        QueueConfig::new("ftp://queue.example.com").validate(),
        Err(ConfigError::InvalidUrl { field: "backendUrl", .. })
    ));
    assert!(matches!(
        QueueConfig::new("//queue.example.com").validate(),
        Err(ConfigError::InvalidUrl { field: "backendUrl", .. })
    ));
}

#[test]
fn channel_url_must_be_websocket() {
    let mut config = QueueConfig::new("https://queue.example.com");
    config.channel_url = Some("https://queue.example.com/ws".to_owned());
    assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { field: "channelUrl", .. })));
}

#[test]
fn zero_intervals_are_rejected() {
    let mut config = QueueConfig::new("https://queue.example.com");
    config.reannounce_ms = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("reannounceMs")));

    let mut config = QueueConfig::new("https://queue.example.com");
    config.heartbeat_ms = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("heartbeatMs")));
}

#[test]
fn cap_below_base_is_rejected() {
    let mut config = QueueConfig::new("https://queue.example.com");
    config.reannounce_ms = 2000;
    config.max_reannounce_ms = Some(1000);
    assert_eq!(config.validate(), Err(ConfigError::CapBelowBase { base: 2000, cap: 1000 }));
}

#[test]
fn from_json_reads_camel_case_options() {
    let config = QueueConfig::from_json(
        r#"{
            "backendUrl": "https://queue.example.com",
            "leaveUrl": "https://queue.example.com/leave",
            "params": {"site": "shop", "tier": 2},
            "storageKey": "waitroom-id",
            "storageArea": "local",
            "reannounceMs": 1500,
            "maxReannounceMs": 9000,
            "heartbeatMs": 20000,
            "content": "<p>hold on</p>",
            "style": "background:#000",
            "locale": "ko"
        }"#,
    )
    .expect("parse config");

    assert_eq!(config.backend_url, "https://queue.example.com");
    assert_eq!(config.leave_url.as_deref(), Some("https://queue.example.com/leave"));
    assert_eq!(config.params.get("site").map(String::as_str), Some("shop"));
    assert_eq!(config.params.get("tier").map(String::as_str), Some("2"));
    assert_eq!(config.storage_key.as_deref(), Some("waitroom-id"));
    assert_eq!(config.storage_area, StorageArea::Local);
    assert_eq!(config.cadence(), Cadence { base_ms: 1500, cap_ms: Some(9000), heartbeat_ms: 20_000 });
    assert_eq!(config.content.as_ref().map(|c| c.render(3)).as_deref(), Some("<p>hold on</p>"));
    assert_eq!(config.style.as_deref(), Some("background:#000"));
    assert_eq!(config.locale, Locale::Ko);
    assert!(config.validate().is_ok());
}

#[test]
fn from_json_leaves_missing_backend_to_validation() {
    let config = QueueConfig::from_json("{}").expect("parse config");
    assert_eq!(config.validate(), Err(ConfigError::MissingBackendUrl));
}

#[test]
fn from_json_rejects_malformed_text() {
    assert!(matches!(QueueConfig::from_json("{"), Err(ConfigError::Parse(_))));
    assert!(matches!(QueueConfig::from_json(r#"{"reannounceMs": "fast"}"#), Err(ConfigError::Parse(_))));
}

#[test]
fn channel_target_prefers_explicit_url() {
    let mut config = QueueConfig::new("https://queue.example.com");
    assert_eq!(config.channel_target(), "wss://queue.example.com/channel");
    config.channel_url = Some("wss://push.example.com/q".to_owned());
    assert_eq!(config.channel_target(), "wss://push.example.com/q");
}

#[test]
fn same_origin_paths_resolve_to_absolute_urls() {
    let mut config = QueueConfig::new("/api");
    config.leave_url = Some("/api/leave".to_owned());
    assert_eq!(config.channel_target(), "/api/channel");

    config.resolve_against("https://shop.example.com/");
    assert_eq!(config.backend_url, "https://shop.example.com/api");
    assert_eq!(config.leave_url.as_deref(), Some("https://shop.example.com/api/leave"));
    assert_eq!(config.channel_target(), "wss://shop.example.com/api/channel");
    assert!(config.validate().is_ok());
}

#[test]
fn absolute_urls_are_left_alone_by_resolve() {
    let mut config = QueueConfig::new("http://queue.example.com");
    config.resolve_against("https://shop.example.com");
    assert_eq!(config.backend_url, "http://queue.example.com");
    assert_eq!(config.leave_url, None);
    assert_eq!(config.channel_target(), "ws://queue.example.com/channel");
}
