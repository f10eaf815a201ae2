use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::broker::Watermark;

const EARLIEST_TOKENS: [&str; 3] = ["earliest", "smallest", "beginning"];
const LATEST_TOKENS: [&str; 3] = ["latest", "largest", "end"];

/// Requested starting position within a partition. Constructed once per
/// request and resolved against the partition's watermark by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpec {
    /// The oldest offset still retained by the partition.
    Earliest,
    /// The offset of the most recent existing message.
    Latest,
    /// An explicit offset, validated against the watermark bounds.
    Numeric(i64),
}

impl OffsetSpec {
    /// Resolves the spec to a concrete offset within `watermark`.
    ///
    /// `Latest` on an empty partition resolves to `watermark.earliest`:
    /// that position sits at the exclusive upper bound, so callers treat it
    /// as nothing to read rather than as an invalid offset.
    pub fn resolve(self, watermark: Watermark) -> Result<i64, OffsetError> {
        match self {
            OffsetSpec::Earliest => Ok(watermark.earliest),
            OffsetSpec::Latest => {
                if watermark.is_empty() {
                    Ok(watermark.earliest)
                } else {
                    Ok(watermark.latest - 1)
                }
            }
            OffsetSpec::Numeric(requested) => {
                if watermark.contains(requested) {
                    Ok(requested)
                } else {
                    Err(OffsetError::OutOfRange {
                        requested,
                        earliest: watermark.earliest,
                        latest: watermark.latest,
                    })
                }
            }
        }
    }
}

impl FromStr for OffsetSpec {
    type Err = OffsetParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let normalized = token.trim().to_ascii_lowercase();
        if EARLIEST_TOKENS.contains(&normalized.as_str()) {
            return Ok(OffsetSpec::Earliest);
        }
        if LATEST_TOKENS.contains(&normalized.as_str()) {
            return Ok(OffsetSpec::Latest);
        }
        normalized
            .parse::<i64>()
            .map(OffsetSpec::Numeric)
            .map_err(|_| OffsetParseError {
                token: token.to_string(),
            })
    }
}

impl fmt::Display for OffsetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetSpec::Earliest => f.write_str("earliest"),
            OffsetSpec::Latest => f.write_str("latest"),
            OffsetSpec::Numeric(offset) => write!(f, "{offset}"),
        }
    }
}

/// Error raised when a numeric offset lies outside the retrievable range.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum OffsetError {
    #[error("offset {requested} is out of bounds [{earliest}, {latest})")]
    OutOfRange {
        requested: i64,
        earliest: i64,
        latest: i64,
    },
}

/// Error raised for tokens that are neither a symbolic name nor an integer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("offset token {token:?} is not a supported symbolic name or integer")]
pub struct OffsetParseError {
    pub token: String,
}
