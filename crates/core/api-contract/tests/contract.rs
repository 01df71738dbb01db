use api_contract::{ApiResponse, PointDto, WritePointRequest};
use domain::{PointKind, PointValue, PollState, WriteValue};

#[test]
fn point_dto_is_camel_case() {
    let dto = PointDto {
        pv: "Portenta:do0".to_string(),
        name: "do0".to_string(),
        kind: PointKind::Boolean,
        bus: "DO".to_string(),
        index: 0,
        poll_period_seconds: 6.0,
        readback: Some(PointValue::Bool(true)),
        commanded: None,
        poll_state: PollState::Polled,
        last_error: None,
        readback_at_ms: Some(1_700_000_000_000),
    };
    let value = serde_json::to_value(dto).expect("serialize");
    assert_eq!(value["pv"], "Portenta:do0");
    assert_eq!(value["kind"], "boolean");
    assert_eq!(value["readback"], true);
    assert_eq!(value["pollState"], "polled");
    assert_eq!(value["pollPeriodSeconds"], 6.0);
    assert!(value["commanded"].is_null());
    assert!(value.get("poll_state").is_none());
}

#[test]
fn write_request_accepts_any_scalar() {
    let req: WritePointRequest = serde_json::from_str(r#"{"value":"on"}"#).expect("parse");
    assert_eq!(req.value, WriteValue::Text("on".to_string()));
    let req: WritePointRequest = serde_json::from_str(r#"{"value":2.5}"#).expect("parse");
    assert_eq!(req.value, WriteValue::Number(2.5));
    let req: WritePointRequest = serde_json::from_str(r#"{"value":false}"#).expect("parse");
    assert_eq!(req.value, WriteValue::Bool(false));
    assert!(serde_json::from_str::<WritePointRequest>(r#"{"value":null}"#).is_err());
}

#[test]
fn error_envelope_carries_point_code() {
    let value = serde_json::to_value(ApiResponse::<()>::error(
        "POINT.WRITE_REJECTED",
        "device rejected write to do0: unexpected response: ERR bad pin",
    ))
    .expect("serialize");
    assert_eq!(value["success"], false);
    assert!(value["data"].is_null());
    assert_eq!(value["error"]["code"], "POINT.WRITE_REJECTED");
}
