use super::*;

fn sample_frame() -> Frame {
    Frame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 42,
        event: events::GAME_STATE.to_owned(),
        status: Status::Request,
        data: serde_json::json!({
            "players": [
                {"username": "ada", "money": 12.5, "probes": [{"id": "p1", "pos": {"x": 1.5, "y": 2.25}}]}
            ],
            "map": {"tiles": [{"coord": {"x": 3, "y": 4}, "owner": null}]},
            "over": false
        }),
    }
}

// =============================================================
// Status
// =============================================================

#[test]
fn status_numeric_mapping_matches_wire_enum() {
    assert_eq!(Status::Request.as_i32(), 0);
    assert_eq!(Status::Done.as_i32(), 1);
    assert_eq!(Status::Error.as_i32(), 2);
}

#[test]
fn status_round_trips_from_wire_values() {
    assert_eq!(Status::from_i32(0).expect("status"), Status::Request);
    assert_eq!(Status::from_i32(1).expect("status"), Status::Done);
    assert_eq!(Status::from_i32(2).expect("status"), Status::Error);
}

#[test]
fn status_from_wire_rejects_out_of_range_value() {
    let err = Status::from_i32(99).expect_err("status should be invalid");
    assert!(matches!(err, CodecError::InvalidStatus(99)));
}

#[test]
fn status_serializes_as_lowercase_json() {
    assert_eq!(serde_json::to_string(&Status::Request).expect("serialize"), "\"request\"");
    assert_eq!(serde_json::to_string(&Status::Done).expect("serialize"), "\"done\"");
}

#[test]
fn status_rejects_non_lowercase_json() {
    assert!(serde_json::from_str::<Status>("\"Error\"").is_err());
}

// =============================================================
// Frame helpers
// =============================================================

#[test]
fn request_frame_has_no_parent() {
    let frame = Frame::request("r1", events::JOIN_QUEUE, serde_json::json!({"qid": "q"}));
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(!frame.is_ack());
    assert_eq!(frame.event, "join_queue");
}

#[test]
fn reply_links_to_request_and_carries_envelope() {
    let request = Frame::request("r1", events::BUILD_FACTORY_ACTION, serde_json::json!({}));
    let ack = Ack { success: false, msg: Some("not enough money".to_owned()) };
    let reply = request.reply("a1", &ack);

    assert_eq!(reply.parent_id.as_deref(), Some("r1"));
    assert_eq!(reply.status, Status::Error);
    assert!(reply.is_ack());
    assert_eq!(Ack::from_frame(&reply), Some(ack));
}

#[test]
fn ack_from_request_frame_is_none() {
    let frame = Frame::request("r1", events::GAME_STATE, serde_json::json!({"success": true}));
    assert!(Ack::from_frame(&frame).is_none());
}

#[test]
fn ack_falls_back_to_status_when_payload_is_bare() {
    let frame = Frame {
        id: "a".to_owned(),
        parent_id: Some("r".to_owned()),
        ts: 0,
        event: events::LEAVE_QUEUE.to_owned(),
        status: Status::Done,
        data: serde_json::json!({}),
    };
    let ack = Ack::from_frame(&frame).expect("ack");
    assert!(ack.success);
    assert!(ack.msg.is_none());
}

#[test]
fn ack_payload_success_overrides_status() {
    let frame = Frame {
        id: "a".to_owned(),
        parent_id: Some("r".to_owned()),
        ts: 0,
        event: events::JOIN_QUEUE.to_owned(),
        status: Status::Done,
        data: serde_json::json!({"success": false, "msg": "queue full"}),
    };
    let ack = Ack::from_frame(&frame).expect("ack");
    assert!(!ack.success);
    assert_eq!(ack.msg.as_deref(), Some("queue full"));
}

// =============================================================
// JSON codec
// =============================================================

#[test]
fn json_round_trip_preserves_frame() {
    let frame = sample_frame();
    let text = to_json(&frame).expect("encode");
    assert_eq!(from_json(&text).expect("decode"), frame);
}

#[test]
fn json_defaults_optional_keys() {
    let frame = from_json(r#"{"id":"x","event":"start_game","status":"request"}"#).expect("decode");
    assert!(frame.parent_id.is_none());
    assert_eq!(frame.ts, 0);
    assert_eq!(frame.data, Value::Null);
}

#[test]
fn json_rejects_missing_event() {
    let err = from_json(r#"{"id":"x","status":"request"}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

// =============================================================
// Protobuf codec
// =============================================================

#[test]
fn encode_decode_round_trip_preserves_frame() {
    let frame = sample_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn ack_frame_round_trips() {
    let request = Frame::request("r1", events::MOVE_PROBES, serde_json::json!({}));
    let reply = request.reply("a1", &Ack { success: true, msg: None });
    assert_eq!(decode_frame(&encode_frame(&reply)).expect("decode"), reply);
}

#[test]
fn decode_frame_rejects_malformed_bytes() {
    let err = decode_frame(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_frame_rejects_invalid_wire_status() {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 1,
        event: events::GAME_STATE.to_owned(),
        status: 77,
        data: Some(json_to_proto_value(&serde_json::json!({}))),
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let err = decode_frame(&bytes).expect_err("status should fail");
    assert!(matches!(err, CodecError::InvalidStatus(77)));
}

#[test]
fn decode_frame_defaults_missing_data_to_empty_object() {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 1,
        event: events::GAME_RESULT.to_owned(),
        status: Status::Request.as_i32(),
        data: None,
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn integral_numbers_stay_integral() {
    let frame = Frame::request("c", events::BUILD_FACTORY_ACTION, serde_json::json!({"coord": {"x": 7, "y": 0}}));
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data["coord"]["x"], serde_json::json!(7));
    assert!(decoded.data["coord"]["x"].is_i64());
}

#[test]
fn nan_number_decodes_to_null() {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 1,
        event: events::GAME_STATE.to_owned(),
        status: Status::Request.as_i32(),
        data: Some(prost_types::Value { kind: Some(prost_types::value::Kind::NumberValue(f64::NAN)) }),
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    assert_eq!(decode_frame(&bytes).expect("decode").data, Value::Null);
}
