//! Deterministic in-memory broker used by tests and embedded runs. The real
//! wire client lives with the transport collaborator; this implementation
//! models the same contract over plain maps.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::{
    BrokerClient, BrokerConsumer, BrokerError, BrokerMetadata, ConsumerOptions, PolledMessage,
    Watermark,
};
use crate::partition::Assignment;

#[derive(Debug, Clone)]
struct StoredRecord {
    payload: Vec<u8>,
    timestamp_ms: Option<i64>,
}

/// One partition log: a base offset (everything older has expired) plus the
/// records appended after it.
#[derive(Debug, Clone, Default)]
struct PartitionLog {
    base_offset: i64,
    records: Vec<StoredRecord>,
}

impl PartitionLog {
    fn watermark(&self) -> Watermark {
        Watermark::new(self.base_offset, self.base_offset + self.records.len() as i64)
    }

    fn record_at(&self, offset: i64) -> Option<&StoredRecord> {
        if offset < self.base_offset {
            return None;
        }
        usize::try_from(offset - self.base_offset)
            .ok()
            .and_then(|index| self.records.get(index))
    }
}

/// In-memory broker holding a fixed topology of topics and partitions.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    topics: BTreeMap<String, BTreeMap<i32, PartitionLog>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a topic with the given partition ids, all initially empty.
    pub fn with_topic(
        mut self,
        topic: impl Into<String>,
        partitions: impl IntoIterator<Item = i32>,
    ) -> Self {
        let logs = partitions
            .into_iter()
            .map(|partition| (partition, PartitionLog::default()))
            .collect();
        self.topics.insert(topic.into(), logs);
        self
    }

    /// Starts a partition's log at `base_offset`, as if older messages had
    /// already been expired by retention.
    pub fn with_partition_base(mut self, topic: &str, partition: i32, base_offset: i64) -> Self {
        let log = self
            .topics
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default();
        log.base_offset = base_offset;
        self
    }

    /// Appends a message without a broker timestamp and returns its offset.
    pub fn append(&mut self, topic: &str, partition: i32, payload: impl Into<Vec<u8>>) -> i64 {
        self.push(topic, partition, payload.into(), None)
    }

    /// Appends a message carrying a broker timestamp and returns its offset.
    pub fn append_at(
        &mut self,
        topic: &str,
        partition: i32,
        payload: impl Into<Vec<u8>>,
        timestamp_ms: i64,
    ) -> i64 {
        self.push(topic, partition, payload.into(), Some(timestamp_ms))
    }

    fn push(
        &mut self,
        topic: &str,
        partition: i32,
        payload: Vec<u8>,
        timestamp_ms: Option<i64>,
    ) -> i64 {
        let log = self
            .topics
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default();
        let offset = log.base_offset + log.records.len() as i64;
        log.records.push(StoredRecord {
            payload,
            timestamp_ms,
        });
        offset
    }

    fn log(&self, topic: &str, partition: i32) -> Result<&PartitionLog, BrokerError> {
        let logs = self
            .topics
            .get(topic)
            .ok_or_else(|| BrokerError::UnknownTopic {
                topic: topic.to_string(),
            })?;
        logs.get(&partition)
            .ok_or_else(|| BrokerError::UnknownPartition {
                topic: topic.to_string(),
                partition,
            })
    }
}

impl BrokerMetadata for MemoryBroker {
    fn topics(&self) -> Result<BTreeMap<String, BTreeSet<i32>>, BrokerError> {
        Ok(self
            .topics
            .iter()
            .map(|(name, logs)| (name.clone(), logs.keys().copied().collect()))
            .collect())
    }

    fn watermarks(&self, topic: &str, partition: i32) -> Result<Watermark, BrokerError> {
        Ok(self.log(topic, partition)?.watermark())
    }
}

impl BrokerClient for MemoryBroker {
    type Consumer = MemoryConsumer;

    fn consumer(&self, _options: &ConsumerOptions) -> Result<Self::Consumer, BrokerError> {
        Ok(MemoryConsumer {
            broker: self.clone(),
            topic: String::new(),
            cursors: Vec::new(),
            next: 0,
            closed: false,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    partition: i32,
    next_offset: i64,
}

/// Poll handle over a snapshot of the broker state, delivering assigned
/// partitions round-robin until each is drained.
#[derive(Debug)]
pub struct MemoryConsumer {
    broker: MemoryBroker,
    topic: String,
    cursors: Vec<Cursor>,
    next: usize,
    closed: bool,
}

impl BrokerConsumer for MemoryConsumer {
    fn assign(&mut self, topic: &str, assignments: &[Assignment]) -> Result<(), BrokerError> {
        for assignment in assignments {
            self.broker.log(topic, assignment.partition)?;
        }
        self.topic = topic.to_string();
        self.cursors = assignments
            .iter()
            .map(|assignment| Cursor {
                partition: assignment.partition,
                next_offset: assignment.start_offset,
            })
            .collect();
        self.next = 0;
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Option<PolledMessage>, BrokerError> {
        if self.closed {
            return Err(BrokerError::client("poll on a closed consumer handle"));
        }
        if self.cursors.is_empty() {
            return Ok(None);
        }
        for step in 0..self.cursors.len() {
            let index = (self.next + step) % self.cursors.len();
            let cursor = self.cursors[index];
            let record = match self
                .broker
                .log(&self.topic, cursor.partition)
                .ok()
                .and_then(|log| log.record_at(cursor.next_offset))
            {
                Some(record) => record.clone(),
                None => continue,
            };
            self.cursors[index].next_offset += 1;
            self.next = (index + 1) % self.cursors.len();
            return Ok(Some(PolledMessage {
                topic: self.topic.clone(),
                partition: cursor.partition,
                offset: cursor.next_offset,
                payload: record.payload,
                timestamp_ms: record.timestamp_ms,
            }));
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
