use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::broker::{BrokerError, BrokerMetadata};
use crate::offset::{OffsetError, OffsetSpec};
use crate::partition::PartitionSpec;

/// Default poll budget per fetch cycle.
pub const DEFAULT_MAX_MESSAGES: usize = 50;
/// Default cap on a single message's size (1 MiB).
pub const DEFAULT_MESSAGE_MAX_BYTES: usize = 1_048_576;
/// Fixed short timeout bounding each poll call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for one fetch cycle, supplied by the scheduling
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub topic: String,
    pub partitions: PartitionSpec,
    pub default_offset: OffsetSpec,
    pub max_messages: usize,
    pub message_max_bytes: Option<usize>,
    pub poll_timeout: Duration,
}

impl FetchConfig {
    /// Creates a config polling every partition of `topic` from the earliest
    /// retained offset with the default budget.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partitions: PartitionSpec::All,
            default_offset: OffsetSpec::Earliest,
            max_messages: DEFAULT_MAX_MESSAGES,
            message_max_bytes: Some(DEFAULT_MESSAGE_MAX_BYTES),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_partitions(mut self, partitions: PartitionSpec) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_default_offset(mut self, offset: OffsetSpec) -> Self {
        self.default_offset = offset;
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_message_max_bytes(mut self, bytes: usize) -> Self {
        self.message_max_bytes = Some(bytes);
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Parses the collaborator's JSON configuration document.
    ///
    /// `partitions` accepts `"all"` (or nothing) for discovery, a single
    /// integer, an array of integers or numeric strings, or a
    /// comma-separated string. `default_offset` accepts a symbolic token or
    /// an integer and defaults to `earliest`.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let doc = value.as_object().ok_or(ConfigError::NotAnObject)?;
        let topic = doc
            .get("topic")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .ok_or(ConfigError::MissingTopic)?;

        let mut config = FetchConfig::new(topic);
        if let Some(raw) = doc.get("partitions") {
            config.partitions = parse_partitions(raw)?;
        }
        if let Some(raw) = doc.get("default_offset") {
            config.default_offset = parse_offset(raw)?;
        }
        if let Some(raw) = doc.get("max_messages") {
            config.max_messages = parse_positive(raw, "max_messages")?;
        }
        if let Some(raw) = doc.get("message_max_bytes") {
            config.message_max_bytes = Some(parse_positive(raw, "message_max_bytes")?);
        }
        Ok(config)
    }

    /// Pre-flight validation used by the collaborator's connection test.
    ///
    /// The topic must exist, explicitly requested partitions must belong to
    /// it, and a numeric default offset must be retrievable on each of
    /// them. The fetch cycle itself does not run this; it applies its own
    /// assignment-time tolerance instead.
    pub fn validate<M: BrokerMetadata>(&self, metadata: &M) -> Result<(), ConfigError> {
        let topics = metadata.topics()?;
        let known = topics
            .get(&self.topic)
            .ok_or_else(|| BrokerError::UnknownTopic {
                topic: self.topic.clone(),
            })?;

        let requested: Vec<i32> = match &self.partitions {
            PartitionSpec::All => Vec::new(),
            PartitionSpec::Single(partition) => vec![*partition],
            PartitionSpec::List(partitions) => partitions.clone(),
        };
        for partition in requested {
            if !known.contains(&partition) {
                return Err(ConfigError::PartitionNotAssigned {
                    topic: self.topic.clone(),
                    partition,
                    available: known.iter().copied().collect(),
                });
            }
            if matches!(self.default_offset, OffsetSpec::Numeric(_)) {
                let watermark = metadata.watermarks(&self.topic, partition)?;
                self.default_offset
                    .resolve(watermark)
                    .map_err(|source| ConfigError::Offset { partition, source })?;
            }
        }
        Ok(())
    }
}

fn parse_partitions(raw: &Value) -> Result<PartitionSpec, ConfigError> {
    match raw {
        Value::Null => Ok(PartitionSpec::All),
        Value::Number(_) => Ok(PartitionSpec::Single(parse_partition_id(raw)?)),
        Value::String(token) => parse_partition_tokens(token),
        Value::Array(items) => {
            if items.is_empty() {
                return Ok(PartitionSpec::All);
            }
            let partitions = items
                .iter()
                .map(parse_partition_id)
                .collect::<Result<Vec<i32>, ConfigError>>()?;
            Ok(PartitionSpec::List(partitions))
        }
        _ => Err(ConfigError::invalid(
            "partitions",
            "expected \"all\", a partition id, or a list of partition ids",
        )),
    }
}

fn parse_partition_tokens(token: &str) -> Result<PartitionSpec, ConfigError> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(PartitionSpec::All);
    }
    let ids = trimmed
        .split(',')
        .map(|item| {
            item.trim().parse::<i32>().map_err(|_| {
                ConfigError::invalid("partitions", format!("{item:?} is not a partition id"))
            })
        })
        .collect::<Result<Vec<i32>, ConfigError>>()?;
    if ids.len() == 1 {
        Ok(PartitionSpec::Single(ids[0]))
    } else {
        Ok(PartitionSpec::List(ids))
    }
}

fn parse_partition_id(raw: &Value) -> Result<i32, ConfigError> {
    let parsed = match raw {
        Value::Number(number) => number.as_i64().and_then(|id| i32::try_from(id).ok()),
        Value::String(token) => token.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ConfigError::invalid("partitions", format!("{raw} is not a partition id"))
    })
}

fn parse_offset(raw: &Value) -> Result<OffsetSpec, ConfigError> {
    match raw {
        Value::Number(number) => number
            .as_i64()
            .map(OffsetSpec::Numeric)
            .ok_or_else(|| ConfigError::invalid("default_offset", "not a valid offset")),
        Value::String(token) => token
            .parse::<OffsetSpec>()
            .map_err(|err| ConfigError::invalid("default_offset", err.to_string())),
        _ => Err(ConfigError::invalid(
            "default_offset",
            "expected a symbolic token or an integer",
        )),
    }
}

fn parse_positive(raw: &Value, field: &'static str) -> Result<usize, ConfigError> {
    raw.as_u64()
        .and_then(|value| usize::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::invalid(field, "expected a positive integer"))
}

/// Failure parsing or validating a fetch configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fetch configuration must be a JSON object")]
    NotAnObject,
    #[error("fetch configuration is missing a topic name")]
    MissingTopic,
    #[error("field {field} has an unsupported value: {detail}")]
    InvalidField { field: &'static str, detail: String },
    #[error("partition {partition} is not assigned to topic {topic}; available: {available:?}")]
    PartitionNotAssigned {
        topic: String,
        partition: i32,
        available: Vec<i32>,
    },
    #[error("default offset for partition {partition}: {source}")]
    Offset {
        partition: i32,
        #[source]
        source: OffsetError,
    },
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ConfigError {
    fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            detail: detail.into(),
        }
    }
}
