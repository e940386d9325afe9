use super::*;
use serde_json::json;

#[test]
fn decode_signal_reads_event_envelope() {
    let signal = decode_signal(r#"{"event":"status","data":{"uuid":"abc","position":3,"status":"WAITING"}}"#);
    assert_eq!(
        signal,
        Some(ChannelSignal::Message {
            event: "status".to_owned(),
            data: json!({"uuid":"abc","position":3,"status":"WAITING"}),
        })
    );
}

#[test]
fn decode_signal_drops_malformed_text() {
    assert_eq!(decode_signal("{\"data\":1}"), None);
    assert_eq!(decode_signal("<html>"), None);
}

#[test]
fn encode_event_wraps_payload() {
    let text = encode_event("heartbeat", &json!({"uuid": "abc"})).expect("encode");
    let value: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value, json!({"event": "heartbeat", "data": {"uuid": "abc"}}));
}

#[test]
fn channel_error_displays_cause() {
    assert_eq!(ChannelError::Open("blocked".to_owned()).to_string(), "channel open failed: blocked");
}
