use std::borrow::Cow;

use serde::Serialize;

use crate::broker::PolledMessage;

/// One consumed message, ready for the external sink. Created once per
/// polled message and never mutated afterwards.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Incident {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    /// Broker timestamp in epoch milliseconds, only when the broker
    /// supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at_ms: Option<i64>,
}

impl Incident {
    /// Builds the incident for one polled message.
    pub fn from_message(message: PolledMessage) -> Self {
        Self {
            topic: message.topic,
            partition: message.partition,
            offset: message.offset,
            payload: message.payload,
            occurred_at_ms: message.timestamp_ms,
        }
    }

    /// Message body as text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
