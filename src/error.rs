//! Error types for Synheart Band

use thiserror::Error;

/// Errors that can occur while decoding a batch
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Payload field {index} is not numeric: {value:?}")]
    NonNumericField { index: usize, value: String },

    #[error("Payload has {0} fields, expected 20")]
    PayloadLength(usize),
}
