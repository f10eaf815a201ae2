use log::debug;
use thiserror::Error;

use crate::broker::{BrokerError, BrokerMetadata};
use crate::offset::{OffsetError, OffsetSpec};

/// Which partitions of a topic a fetch targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionSpec {
    /// Every partition currently known to the broker.
    All,
    /// Exactly one explicitly named partition.
    Single(i32),
    /// An explicit list of partitions.
    List(Vec<i32>),
}

impl PartitionSpec {
    /// True when individually unassignable partitions are dropped instead of
    /// failing the cycle. An explicit single request fails loudly (an
    /// operator typo must surface); list and discovery expansions tolerate
    /// partitions vanishing between the metadata read and the offset query.
    pub fn tolerates_unknown_partitions(&self) -> bool {
        !matches!(self, PartitionSpec::Single(_))
    }
}

/// Concrete starting position for one partition, handed to the poll step.
/// Created fresh each cycle and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub partition: i32,
    pub start_offset: i64,
}

/// Failure while expanding a partition spec into assignments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("partition {partition} of topic {topic}: {source}")]
    Offset {
        topic: String,
        partition: i32,
        #[source]
        source: OffsetError,
    },
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Expands a partition spec into concrete assignments for one topic,
/// resolving each partition's starting offset against its current watermark.
pub struct PartitionAssigner<'a, M: BrokerMetadata> {
    metadata: &'a M,
    topic: &'a str,
}

impl<'a, M: BrokerMetadata> PartitionAssigner<'a, M> {
    pub fn new(metadata: &'a M, topic: &'a str) -> Self {
        Self { metadata, topic }
    }

    /// Partition ids the spec names. `All` enumerates the topic's current
    /// partitions from broker metadata and fails on an unknown topic;
    /// `Single` and `List` pass through verbatim, preserving input order.
    pub fn expand(&self, spec: &PartitionSpec) -> Result<Vec<i32>, AssignError> {
        match spec {
            PartitionSpec::Single(partition) => Ok(vec![*partition]),
            PartitionSpec::List(partitions) => Ok(partitions.clone()),
            PartitionSpec::All => {
                let topics = self.metadata.topics()?;
                let partitions =
                    topics
                        .get(self.topic)
                        .ok_or_else(|| BrokerError::UnknownTopic {
                            topic: self.topic.to_string(),
                        })?;
                Ok(partitions.iter().copied().collect())
            }
        }
    }

    /// Resolves one partition's starting offset against its current
    /// watermark. Out-of-range offsets and unknown partitions propagate.
    pub fn assign_one(
        &self,
        partition: i32,
        offset: OffsetSpec,
    ) -> Result<Assignment, AssignError> {
        let watermark = self.metadata.watermarks(self.topic, partition)?;
        let start_offset = offset
            .resolve(watermark)
            .map_err(|source| AssignError::Offset {
                topic: self.topic.to_string(),
                partition,
                source,
            })?;
        Ok(Assignment {
            partition,
            start_offset,
        })
    }

    /// Builds the assignment set for the spec. Partitions whose watermark
    /// query reports them unknown are dropped when the spec tolerates it;
    /// every other failure propagates.
    pub fn assign(
        &self,
        spec: &PartitionSpec,
        offset: OffsetSpec,
    ) -> Result<Vec<Assignment>, AssignError> {
        let tolerant = spec.tolerates_unknown_partitions();
        let mut assignments = Vec::new();
        for partition in self.expand(spec)? {
            match self.assign_one(partition, offset) {
                Ok(assignment) => assignments.push(assignment),
                Err(AssignError::Broker(err)) if tolerant && err.is_unknown_partition() => {
                    debug!(
                        "dropping vanished partition {partition} of topic {}",
                        self.topic
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(assignments)
    }
}
