use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use thiserror::Error;

use crate::partition::Assignment;

pub mod memory;

/// Offset bounds currently retrievable from a partition. `latest` is the
/// exclusive upper bound; an empty partition has `earliest == latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub earliest: i64,
    pub latest: i64,
}

impl Watermark {
    /// Creates a watermark from the broker-reported bounds.
    pub fn new(earliest: i64, latest: i64) -> Self {
        Self { earliest, latest }
    }

    /// True when the partition currently holds no messages.
    pub fn is_empty(self) -> bool {
        self.earliest == self.latest
    }

    /// True when `offset` addresses a currently retrievable message.
    pub fn contains(self, offset: i64) -> bool {
        offset >= self.earliest && offset < self.latest
    }
}

/// Message handed back by a consumer poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolledMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    /// Broker-assigned timestamp in epoch milliseconds, when one exists.
    pub timestamp_ms: Option<i64>,
}

/// Consumer-handle tuning forwarded to the underlying client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerOptions {
    /// Upper bound on a single message's size, when the caller caps it.
    pub message_max_bytes: Option<usize>,
}

/// Failure surfaced by the broker client collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("topic {topic} was not found on the broker")]
    UnknownTopic { topic: String },
    #[error("partition {partition} of topic {topic} was not found on the broker")]
    UnknownPartition { topic: String, partition: i32 },
    #[error("broker client failure: {message}")]
    Client { message: String },
}

impl BrokerError {
    /// Wraps an underlying connectivity or protocol failure.
    pub fn client(message: impl Into<String>) -> Self {
        BrokerError::Client {
            message: message.into(),
        }
    }

    /// Distinguishes the tolerated metadata race from every other failure.
    pub fn is_unknown_partition(&self) -> bool {
        matches!(self, BrokerError::UnknownPartition { .. })
    }
}

/// Metadata queries the engine performs before assigning partitions.
pub trait BrokerMetadata {
    /// Topic names mapped to their currently known partition ids.
    fn topics(&self) -> Result<BTreeMap<String, BTreeSet<i32>>, BrokerError>;

    /// Current earliest/latest offsets for one partition.
    fn watermarks(&self, topic: &str, partition: i32) -> Result<Watermark, BrokerError>;
}

/// Poll handle owned by exactly one fetch cycle.
pub trait BrokerConsumer {
    /// Pins the handle to the given starting positions.
    fn assign(&mut self, topic: &str, assignments: &[Assignment]) -> Result<(), BrokerError>;

    /// Blocks up to `timeout` for the next message. `None` means the timeout
    /// expired with nothing to deliver, which is not an error.
    fn poll(&mut self, timeout: Duration) -> Result<Option<PolledMessage>, BrokerError>;

    /// Releases the handle. Must be idempotent.
    fn close(&mut self);
}

/// Full client surface consumed by the engine. One consumer handle is built
/// per fetch cycle and never reused across cycles.
pub trait BrokerClient: BrokerMetadata {
    type Consumer: BrokerConsumer;

    /// Builds a fresh consumer handle for one fetch cycle.
    fn consumer(&self, options: &ConsumerOptions) -> Result<Self::Consumer, BrokerError>;
}
