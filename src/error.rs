//! Error types for zepp-fit

use thiserror::Error;

/// Errors that can occur while decoding or converting an activity
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Malformed {metric} segment: {segment:?}")]
    Decode { metric: String, segment: String },

    #[error("Missing required field: {0}")]
    MissingData(String),

    #[error("Track id mismatch: summary {summary}, detail {detail}")]
    TrackMismatch { summary: i64, detail: i64 },

    #[error("Unsupported sport type {code} for track {track_id}")]
    UnsupportedSport { code: i64, track_id: String },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output sink failed: {0}")]
    Sink(String),

    #[error("Failed to parse export payload: {0}")]
    ParseError(String),
}

impl ConvertError {
    pub(crate) fn decode(metric: &str, segment: &str) -> Self {
        ConvertError::Decode {
            metric: metric.to_string(),
            segment: segment.to_string(),
        }
    }
}
