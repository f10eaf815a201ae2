use log::{debug, warn};
use thiserror::Error;

use crate::broker::{BrokerClient, BrokerConsumer, BrokerError, ConsumerOptions};
use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::config::FetchConfig;
use crate::incident::Incident;
use crate::offset::OffsetSpec;
use crate::partition::{AssignError, Assignment, PartitionAssigner};

/// Counters accumulated over one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Partitions named by the spec, after discovery expansion.
    pub partitions_considered: usize,
    /// Partitions skipped because their starting offset already reached the
    /// latest watermark.
    pub partitions_caught_up: usize,
    /// Partitions dropped because they vanished between the metadata read
    /// and the offset query.
    pub partitions_dropped: usize,
    /// Poll calls issued.
    pub polls: usize,
    /// Poll calls that returned nothing before the timeout.
    pub empty_polls: usize,
    /// Messages delivered as incidents.
    pub messages: usize,
    /// Total payload bytes across delivered messages.
    pub payload_bytes: usize,
}

/// Result of one fetch cycle. The caller persists `checkpoint` and hands
/// `incidents` to the sink.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Incidents in delivery order.
    pub incidents: Vec<Incident>,
    /// Working checkpoint including every delivered message.
    pub checkpoint: Checkpoint,
    pub stats: CycleStats,
    /// Poll-phase failure that ended the cycle early. Progress made before
    /// the failure is retained in `incidents` and `checkpoint`.
    pub interrupted: Option<BrokerError>,
}

/// Failure surfaced by a fetch cycle. Setup either fully succeeds or fails
/// before any polling; a setup failure never advances the checkpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Assign(#[from] AssignError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    /// Polling failed after the cycle had already delivered messages. The
    /// checkpoint entries for those messages stand, and the incidents are
    /// carried here so the sink still receives them.
    #[error("fetch cycle interrupted after {} message(s): {source}", .incidents.len())]
    Interrupted {
        incidents: Vec<Incident>,
        #[source]
        source: BrokerError,
    },
}

/// Drives checkpointed incremental consumption of one topic.
///
/// Each cycle builds a fresh consumer handle from the broker client and
/// releases it on every exit path; the only state surviving between cycles
/// is the checkpoint the caller persists.
pub struct IncrementalConsumer<'a, B: BrokerClient> {
    broker: &'a B,
    config: &'a FetchConfig,
}

impl<'a, B: BrokerClient> IncrementalConsumer<'a, B> {
    pub fn new(broker: &'a B, config: &'a FetchConfig) -> Self {
        Self { broker, config }
    }

    /// Runs one bounded fetch cycle starting from `checkpoint`.
    pub fn run_cycle(&self, checkpoint: &Checkpoint) -> Result<CycleOutcome, FetchError> {
        let mut stats = CycleStats::default();
        let assignments = self.plan_assignments(checkpoint, &mut stats)?;
        let mut outcome = CycleOutcome {
            incidents: Vec::new(),
            checkpoint: checkpoint.clone(),
            stats,
            interrupted: None,
        };
        if assignments.is_empty() {
            debug!("nothing to poll for topic {}", self.config.topic);
            return Ok(outcome);
        }

        let options = ConsumerOptions {
            message_max_bytes: self.config.message_max_bytes,
        };
        let mut consumer = self.broker.consumer(&options)?;
        if let Err(err) = consumer.assign(&self.config.topic, &assignments) {
            consumer.close();
            return Err(err.into());
        }
        self.poll_assigned(&mut consumer, &mut outcome);
        consumer.close();
        Ok(outcome)
    }

    /// Computes per-partition starting offsets from the checkpoint (or the
    /// configured default), skips partitions that are already caught up,
    /// and re-validates the remaining starts through the assigner. The
    /// first fatal error aborts before any polling.
    fn plan_assignments(
        &self,
        checkpoint: &Checkpoint,
        stats: &mut CycleStats,
    ) -> Result<Vec<Assignment>, FetchError> {
        let topic = self.config.topic.as_str();
        let assigner = PartitionAssigner::new(self.broker, topic);
        let tolerant = self.config.partitions.tolerates_unknown_partitions();
        let mut assignments = Vec::new();
        for partition in assigner.expand(&self.config.partitions)? {
            stats.partitions_considered += 1;
            let watermark = match self.broker.watermarks(topic, partition) {
                Ok(watermark) => watermark,
                Err(err) if tolerant && err.is_unknown_partition() => {
                    stats.partitions_dropped += 1;
                    debug!("partition {partition} of topic {topic} vanished before assignment");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let start = match checkpoint.last_processed(partition) {
                Some(last) => last + 1,
                None => self
                    .config
                    .default_offset
                    .resolve(watermark)
                    .map_err(|source| AssignError::Offset {
                        topic: topic.to_string(),
                        partition,
                        source,
                    })?,
            };
            if start >= watermark.latest {
                stats.partitions_caught_up += 1;
                debug!(
                    "partition {partition} of topic {topic} caught up at offset {start} (latest {})",
                    watermark.latest
                );
                continue;
            }
            match assigner.assign_one(partition, OffsetSpec::Numeric(start)) {
                Ok(assignment) => assignments.push(assignment),
                Err(AssignError::Broker(err)) if tolerant && err.is_unknown_partition() => {
                    stats.partitions_dropped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(
            "assigning {} partition(s) of topic {topic}",
            assignments.len()
        );
        Ok(assignments)
    }

    /// Polls up to the configured budget, advancing the working checkpoint
    /// for each delivered message. An empty poll counts against the budget;
    /// a poll failure ends the loop and is recorded on the outcome with the
    /// progress made before it.
    fn poll_assigned<C: BrokerConsumer>(&self, consumer: &mut C, outcome: &mut CycleOutcome) {
        for _ in 0..self.config.max_messages {
            outcome.stats.polls += 1;
            match consumer.poll(self.config.poll_timeout) {
                Ok(Some(message)) => {
                    outcome.stats.messages += 1;
                    outcome.stats.payload_bytes += message.payload.len();
                    outcome.checkpoint.advance(message.partition, message.offset);
                    debug!(
                        "consumed {}:{} offset {}",
                        message.topic, message.partition, message.offset
                    );
                    outcome.incidents.push(Incident::from_message(message));
                }
                Ok(None) => {
                    outcome.stats.empty_polls += 1;
                }
                Err(err) => {
                    warn!(
                        "poll failed after {} message(s): {err}",
                        outcome.stats.messages
                    );
                    outcome.interrupted = Some(err);
                    return;
                }
            }
        }
    }
}

/// Loads the checkpoint, runs one cycle, persists the updated checkpoint,
/// and returns the delivered incidents.
///
/// When polling was interrupted mid-cycle the checkpoint is persisted
/// first — failure stalls a checkpoint, never regresses it — and the
/// incidents delivered before the failure ride along on the error.
pub fn run_fetch_cycle<B, S>(
    config: &FetchConfig,
    broker: &B,
    store: &mut S,
) -> Result<Vec<Incident>, FetchError>
where
    B: BrokerClient,
    S: CheckpointStore,
{
    let checkpoint = store.load()?;
    debug!(
        "starting fetch cycle for topic {} with {} checkpointed partition(s)",
        config.topic,
        checkpoint.len()
    );
    let outcome = IncrementalConsumer::new(broker, config).run_cycle(&checkpoint)?;
    store.save(&outcome.checkpoint)?;
    match outcome.interrupted {
        Some(source) => Err(FetchError::Interrupted {
            incidents: outcome.incidents,
            source,
        }),
        None => Ok(outcome.incidents),
    }
}
