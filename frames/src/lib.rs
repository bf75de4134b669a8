//! Shared frame model and codecs for the realtime game channel.
//!
//! Every message between the game view and the game server is a [`Frame`]:
//! a named event with a JSON payload. Player intents travel as
//! [`Status::Request`] frames; the server answers some of them with an
//! acknowledgement frame ([`Status::Done`] or [`Status::Error`]) whose
//! `parent_id` names the request. Server pushes (`start_game`, `game_state`,
//! ...) are request frames with no parent.
//!
//! Payloads stay flexible (`serde_json::Value`); the typed views live in the
//! engine crate. Frames can be carried as JSON text or as protobuf binary.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event names used on the wire.
pub mod events {
    // Outbound intents.
    pub const CREATE_QUEUE: &str = "create_queue";
    pub const JOIN_QUEUE: &str = "join_queue";
    pub const LEAVE_QUEUE: &str = "leave_queue";
    pub const RESIGN_GAME: &str = "action_resign_game";
    pub const BUILD_FACTORY_ACTION: &str = "action_build_factory";
    pub const BUILD_TURRET_ACTION: &str = "action_build_turret";
    pub const MOVE_PROBES: &str = "action_move_probes";
    pub const EXPLODE_PROBES: &str = "action_explode_probes";
    pub const PROBES_ATTACK: &str = "action_probes_attack";

    // Inbound server events.
    pub const START_GAME: &str = "start_game";
    pub const GAME_STATE: &str = "game_state";
    pub const GAME_RESULT: &str = "game_result";
    pub const BUILD_FACTORY: &str = "build_factory";
    pub const BUILD_TURRET: &str = "build_turret";
    pub const BUILD_PROBE: &str = "build_probe";
    pub const TURRET_FIRE_PROBE: &str = "turret_fire_probe";
}

/// Error returned by the frame decoders.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireFrame`.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The `status` integer on the wire does not map to a known [`Status`] variant.
    #[error("invalid frame status: {0}")]
    InvalidStatus(i32),
    /// The text could not be parsed as a JSON frame.
    #[error("failed to parse json frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle status of a frame in a request/acknowledgement exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Intent from the client, or a server push.
    Request,
    /// Positive acknowledgement of a request.
    Done,
    /// Rejection of a request.
    Error,
}

impl Status {
    /// Convert status into wire enum integer value.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Request => WireFrameStatus::Request as i32,
            Self::Done => WireFrameStatus::Done as i32,
            Self::Error => WireFrameStatus::Error as i32,
        }
    }

    fn from_i32(value: i32) -> Result<Self, CodecError> {
        match WireFrameStatus::try_from(value) {
            Ok(WireFrameStatus::Request) => Ok(Self::Request),
            Ok(WireFrameStatus::Done) => Ok(Self::Done),
            Ok(WireFrameStatus::Error) => Ok(Self::Error),
            Err(_) => Err(CodecError::InvalidStatus(value)),
        }
    }
}

/// A single message on the realtime channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame.
    pub id: String,
    /// ID of the request frame this acknowledges, if any.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Milliseconds since the Unix epoch when the frame was created (0 if unknown).
    #[serde(default)]
    pub ts: i64,
    /// Event name, e.g. `"game_state"`. See [`events`].
    pub event: String,
    /// Lifecycle position of the frame.
    pub status: Status,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Build a request frame.
    #[must_use]
    pub fn request(id: impl Into<String>, event: &str, data: Value) -> Self {
        Self { id: id.into(), parent_id: None, ts: 0, event: event.to_owned(), status: Status::Request, data }
    }

    /// Build the acknowledgement of this frame.
    #[must_use]
    pub fn reply(&self, id: impl Into<String>, ack: &Ack) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(self.id.clone()),
            ts: 0,
            event: self.event.clone(),
            status: if ack.success { Status::Done } else { Status::Error },
            data: serde_json::json!({ "success": ack.success, "msg": ack.msg }),
        }
    }

    /// Whether this frame acknowledges an earlier request.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.parent_id.is_some() && self.status != Status::Request
    }
}

/// Acknowledgement envelope attached to a reply frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
}

impl Ack {
    /// Read the envelope from a reply frame.
    ///
    /// An explicit `success` in the payload wins; otherwise the frame status
    /// decides. Returns `None` for frames that are not acknowledgements.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        if !frame.is_ack() {
            return None;
        }
        let success = frame
            .data
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(frame.status == Status::Done);
        let msg = frame
            .data
            .get("msg")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Some(Self { success, msg })
    }
}

/// Serialize a frame as JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the payload cannot be serialized.
pub fn to_json(frame: &Frame) -> Result<String, CodecError> {
    Ok(serde_json::to_string(frame)?)
}

/// Parse a frame from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text or missing required keys.
pub fn from_json(text: &str) -> Result<Frame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = frame_to_wire(frame);

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot run out of buffer.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::InvalidStatus`] for out-of-range status values.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    wire_to_frame(wire)
}

fn frame_to_wire(frame: &Frame) -> WireFrame {
    WireFrame {
        id: frame.id.clone(),
        parent_id: frame.parent_id.clone(),
        ts: frame.ts,
        event: frame.event.clone(),
        status: frame.status.as_i32(),
        data: Some(json_to_proto_value(&frame.data)),
    }
}

fn wire_to_frame(wire: WireFrame) -> Result<Frame, CodecError> {
    Ok(Frame {
        id: wire.id,
        parent_id: wire.parent_id,
        ts: wire.ts,
        event: wire.event,
        status: Status::from_i32(wire.status)?,
        data: wire
            .data
            .map_or(Value::Object(Map::new()), |v| proto_to_json_value(&v)),
    })
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue { values: v.iter().map(json_to_proto_value).collect() }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        Kind::NullValue(_) => Value::Null,
        // Integral grid coordinates survive the f64 trip; keep them integral on the way back.
        Kind::NumberValue(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
            #[allow(clippy::cast_possible_truncation)]
            let int = *v as i64;
            Value::Number(int.into())
        }
        Kind::NumberValue(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::BoolValue(v) => Value::Bool(*v),
        Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json_value).collect()),
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, tag = "4")]
    event: String,
    #[prost(enumeration = "WireFrameStatus", tag = "5")]
    status: i32,
    #[prost(message, optional, tag = "6")]
    data: Option<prost_types::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireFrameStatus {
    Request = 0,
    Done = 1,
    Error = 2,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
