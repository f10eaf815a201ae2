use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Per-partition record of the last successfully processed offset.
///
/// Entries are monotonically non-decreasing: `advance` never regresses a
/// recorded offset, so a failed cycle can stall a checkpoint but never move
/// it backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    offsets: BTreeMap<i32, i64>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last processed offset for `partition`, when a prior cycle recorded one.
    pub fn last_processed(&self, partition: i32) -> Option<i64> {
        self.offsets.get(&partition).copied()
    }

    /// Records `offset` as processed for `partition`. An offset older than
    /// the recorded one is ignored.
    pub fn advance(&mut self, partition: i32, offset: i64) {
        let entry = self.offsets.entry(partition).or_insert(offset);
        if offset > *entry {
            *entry = offset;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Entries in partition order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i64)> + '_ {
        self.offsets.iter().map(|(partition, offset)| (*partition, *offset))
    }

    /// Builds the flat JSON document persisted by stores. Partition ids are
    /// written as decimal string keys.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        for (partition, offset) in &self.offsets {
            doc.insert(partition.to_string(), Value::from(*offset));
        }
        Value::Object(doc)
    }

    /// Parses a persisted document, normalizing keys to integer partition
    /// ids regardless of how an earlier writer spelled them.
    pub fn from_json(value: &Value) -> Result<Self, CheckpointError> {
        let doc = value.as_object().ok_or_else(|| CheckpointError::Malformed {
            detail: "checkpoint document must be a JSON object".to_string(),
        })?;
        let mut offsets = BTreeMap::new();
        for (key, entry) in doc {
            let partition = key
                .trim()
                .parse::<i32>()
                .map_err(|_| CheckpointError::Malformed {
                    detail: format!("partition key {key:?} is not an integer"),
                })?;
            let offset = entry.as_i64().ok_or_else(|| CheckpointError::Malformed {
                detail: format!("offset for partition {partition} is not an integer"),
            })?;
            offsets.insert(partition, offset);
        }
        Ok(Self { offsets })
    }
}

/// Failure loading or persisting checkpoint state.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint state could not be read or written: {0}")]
    Io(#[from] io::Error),
    #[error("persisted checkpoint is malformed: {detail}")]
    Malformed { detail: String },
}

/// Durable mapping from partition id to last processed offset.
///
/// `load` yields an empty checkpoint on the first-ever invocation and `save`
/// fully overwrites the persisted state; the store never merges. Exactly one
/// consumer runs against a store at a time, serialized by the external
/// scheduler, so no locking is involved.
pub trait CheckpointStore {
    fn load(&self) -> Result<Checkpoint, CheckpointError>;
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// File-backed store persisting the checkpoint as a flat JSON object.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load(&self) -> Result<Checkpoint, CheckpointError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Checkpoint::new()),
            Err(err) => return Err(err.into()),
        };
        let value: Value =
            serde_json::from_slice(&raw).map_err(|err| CheckpointError::Malformed {
                detail: err.to_string(),
            })?;
        Checkpoint::from_json(&value)
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let doc = checkpoint.to_json().to_string();
        fs::write(&self.path, doc)?;
        Ok(())
    }
}
