//! Incidra: checkpointed incremental consumption of partitioned message
//! logs. Resolves offset specifications against live watermarks, expands
//! partition specifications into validated assignments, and drives bounded
//! fetch cycles that never re-deliver or silently skip a message across
//! invocations.

pub mod broker;
pub mod checkpoint;
pub mod config;
pub mod consumer;
pub mod incident;
pub mod offset;
pub mod partition;

pub use broker::memory::{MemoryBroker, MemoryConsumer};
pub use broker::{
    BrokerClient, BrokerConsumer, BrokerError, BrokerMetadata, ConsumerOptions, PolledMessage,
    Watermark,
};
pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, JsonFileCheckpointStore};
pub use config::{
    ConfigError, FetchConfig, DEFAULT_MAX_MESSAGES, DEFAULT_MESSAGE_MAX_BYTES,
    DEFAULT_POLL_TIMEOUT,
};
pub use consumer::{run_fetch_cycle, CycleOutcome, CycleStats, FetchError, IncrementalConsumer};
pub use incident::Incident;
pub use offset::{OffsetError, OffsetParseError, OffsetSpec};
pub use partition::{AssignError, Assignment, PartitionAssigner, PartitionSpec};
