use super::*;
use serde_json::json;

#[test]
fn from_value_accepts_complete_payload() {
    let status = QueueStatus::from_value(&json!({"uuid": "abc", "position": 150, "status": "WAITING"}))
        .expect("valid status");
    assert_eq!(status.uuid, "abc");
    assert_eq!(status.position, 150);
    assert_eq!(status.state, QueueState::Waiting);
}

#[test]
fn from_value_defaults_missing_position_to_zero() {
    let status = QueueStatus::from_value(&json!({"uuid": "abc", "status": "ACTIVE"})).expect("valid status");
    assert_eq!(status.position, 0);
    assert_eq!(status.state, QueueState::Active);
}

#[test]
fn from_value_accepts_integral_float_position() {
    let status =
        QueueStatus::from_value(&json!({"uuid": "abc", "position": 12.0, "status": "WAITING"})).expect("valid status");
    assert_eq!(status.position, 12);
}

#[test]
fn from_value_rejects_null_and_empty_object() {
    assert_eq!(QueueStatus::from_value(&Value::Null), Err(StatusError::Null));
    assert_eq!(QueueStatus::from_value(&json!({})), Err(StatusError::Missing("uuid")));
}

#[test]
fn from_value_rejects_non_object() {
    assert_eq!(QueueStatus::from_value(&json!("WAITING")), Err(StatusError::NotObject));
    assert_eq!(QueueStatus::from_value(&json!([1, 2])), Err(StatusError::NotObject));
}

#[test]
fn from_value_requires_status() {
    assert_eq!(
        QueueStatus::from_value(&json!({"uuid": "abc", "position": 1})),
        Err(StatusError::Missing("status"))
    );
}

#[test]
fn from_value_rejects_unknown_state_and_blank_uuid() {
    let err = QueueStatus::from_value(&json!({"uuid": "abc", "status": "PAUSED"})).unwrap_err();
    assert!(matches!(err, StatusError::Invalid { field: "status", .. }));

    let err = QueueStatus::from_value(&json!({"uuid": "  ", "status": "ACTIVE"})).unwrap_err();
    assert!(matches!(err, StatusError::Invalid { field: "uuid", .. }));
}

#[test]
fn from_value_rejects_negative_or_fractional_position() {
    let err = QueueStatus::from_value(&json!({"uuid": "abc", "position": -1, "status": "WAITING"})).unwrap_err();
    assert!(matches!(err, StatusError::Invalid { field: "position", .. }));

    let err = QueueStatus::from_value(&json!({"uuid": "abc", "position": 1.5, "status": "WAITING"})).unwrap_err();
    assert!(matches!(err, StatusError::Invalid { field: "position", .. }));
}

#[test]
fn queue_state_wire_names_match_serde() {
    for state in [QueueState::Waiting, QueueState::Active, QueueState::Empty, QueueState::Expired] {
        let encoded = serde_json::to_value(state).expect("serialize state");
        assert_eq!(encoded, json!(state.as_wire()));
        assert_eq!(QueueState::from_wire(state.as_wire()), Some(state));
    }
}

#[test]
fn only_empty_and_expired_are_terminal() {
    assert!(!QueueState::Waiting.is_terminal());
    assert!(!QueueState::Active.is_terminal());
    assert!(QueueState::Empty.is_terminal());
    assert!(QueueState::Expired.is_terminal());
}

#[test]
fn leave_notice_flattens_params_next_to_uuid() {
    let mut params = BTreeMap::new();
    params.insert("site".to_owned(), "shop".to_owned());
    let notice = LeaveNotice { uuid: "abc".to_owned(), params };
    assert_eq!(serde_json::to_value(&notice).expect("serialize"), json!({"uuid": "abc", "site": "shop"}));
}

#[test]
fn join_request_omits_absent_uuid() {
    let request = JoinRequest::default();
    assert_eq!(serde_json::to_value(&request).expect("serialize"), json!({}));

    let request = JoinRequest { uuid: Some("abc".to_owned()), params: BTreeMap::new() };
    assert_eq!(serde_json::to_value(&request).expect("serialize"), json!({"uuid": "abc"}));
}

#[test]
fn envelope_decode_defaults_missing_data() {
    let envelope = Envelope::decode(r#"{"event":"status"}"#).expect("decode");
    assert_eq!(envelope.event, STATUS_EVENT);
    assert_eq!(envelope.data, Value::Null);
}

#[test]
fn envelope_decode_rejects_garbage() {
    assert!(Envelope::decode("not json").is_err());
}
