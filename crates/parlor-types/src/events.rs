use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ChannelName, ChannelRecord, Envelope, IdOnly, MessageRecord, Record};
use crate::models::ChannelId;

/// Events pushed by the server over the realtime socket.
///
/// Wire names follow the server's event names (`newChannel`, ...). Delivery is
/// at-least-once and unordered across entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum PushEvent {
    #[serde(rename = "newChannel")]
    ChannelAdded(Envelope<ChannelRecord>),

    #[serde(rename = "renameChannel")]
    ChannelRenamed(Envelope<Record<ChannelId, ChannelName>>),

    #[serde(rename = "removeChannel")]
    ChannelRemoved(Envelope<IdOnly<ChannelId>>),

    #[serde(rename = "newMessage")]
    MessageAdded(Envelope<MessageRecord>),
}

impl PushEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChannelAdded(_) => "newChannel",
            Self::ChannelRenamed(_) => "renameChannel",
            Self::ChannelRemoved(_) => "removeChannel",
            Self::MessageAdded(_) => "newMessage",
        }
    }

    /// Validate a payload against the shape its event name promises.
    pub fn decode(kind: &str, payload: Value) -> Result<Self, DecodeError> {
        let shape = |e: serde_json::Error| DecodeError::Shape {
            event: kind.to_string(),
            reason: e.to_string(),
        };
        match kind {
            "newChannel" => serde_json::from_value(payload).map(Self::ChannelAdded).map_err(shape),
            "renameChannel" => serde_json::from_value(payload).map(Self::ChannelRenamed).map_err(shape),
            "removeChannel" => serde_json::from_value(payload).map(Self::ChannelRemoved).map_err(shape),
            "newMessage" => serde_json::from_value(payload).map(Self::MessageAdded).map_err(shape),
            other => Err(DecodeError::UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown push event `{0}`")]
    UnknownEvent(String),

    #[error("malformed `{event}` payload: {reason}")]
    Shape { event: String, reason: String },
}

/// One text frame read from the push socket.
///
/// `seq` is the server's monotonic stream cursor; servers that do not keep an
/// event log omit it.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFrame {
    pub seq: Option<u64>,
    pub event: PushEvent,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    seq: Option<u64>,
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Serialize)]
struct OutFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(flatten)]
    event: &'a PushEvent,
}

impl PushFrame {
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let event = PushEvent::decode(&raw.event, raw.payload)?;
        Ok(Self { seq: raw.seq, event })
    }

    pub fn to_json(&self) -> String {
        let out = OutFrame {
            seq: self.seq,
            event: &self.event,
        };
        serde_json::to_string(&out).unwrap_or_default()
    }
}
