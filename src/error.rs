//! Error types for the transkel library.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias for transkel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, transforming or merging documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing documents.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input violates the structure expected by its filter.
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// No filter configuration is registered under the given identifier.
    #[error("Unknown filter configuration: {0}")]
    UnknownFilter(String),

    /// No step is registered under the given identifier.
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// Step or filter parameters could not be applied.
    #[error("Invalid parameters for {name}: {reason}")]
    InvalidParameters {
        /// Step or filter name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// Coded text does not agree with its code list.
    #[error("Invalid coded text: {0}")]
    InvalidCodedText(String),

    /// A position falls inside a code marker or outside the text.
    #[error("Invalid position {position} in coded text of length {len}")]
    InvalidPosition {
        /// Offending byte offset
        position: usize,
        /// Length of the coded text in bytes
        len: usize,
    },

    /// Segment ranges are unsorted, overlapping or out of bounds.
    #[error("Invalid segmentation: {0}")]
    InvalidSegmentation(String),

    /// A target's segments do not correspond to the source segments.
    #[error("Target '{locale}' of unit '{unit}' has segments not in the source: {ids:?}")]
    SegmentMismatch {
        /// Text unit identifier
        unit: String,
        /// Target locale
        locale: String,
        /// Segment ids found only in the target
        ids: Vec<String>,
    },

    /// Unknown or unusable character encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A batch item does not supply the inputs the pipeline needs.
    #[error("Batch item supplies {supplied} input(s), pipeline requests {requested}")]
    MissingInput {
        /// Inputs supplied by the item
        supplied: usize,
        /// Inputs requested by the pipeline
        requested: usize,
    },

    /// A writer was asked to write without an output target.
    #[error("No output target for input {0}")]
    MissingOutput(usize),

    /// The pipeline was destroyed and cannot be used anymore.
    #[error("Pipeline has been destroyed")]
    PipelineDestroyed,

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify this error for batch reporting.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Error::Io(_) | Error::MissingOutput(_) => FaultKind::Io,
            Error::Malformed(_) | Error::Encoding(_) => FaultKind::Malformed,
            Error::UnknownFilter(_)
            | Error::UnknownStep(_)
            | Error::InvalidParameters { .. }
            | Error::MissingInput { .. }
            | Error::Json(_) => FaultKind::Configuration,
            Error::InvalidCodedText(_)
            | Error::InvalidPosition { .. }
            | Error::InvalidSegmentation(_)
            | Error::SegmentMismatch { .. }
            | Error::PipelineDestroyed
            | Error::Other(_) => FaultKind::Internal,
        }
    }

    pub(crate) fn invalid_parameters(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidParameters {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Coarse classification of a fatal fault, recorded against a batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Stream open/read/write failure
    Io,
    /// Structural violation of the expected format
    Malformed,
    /// Unknown filter/step, bad parameters, missing inputs
    Configuration,
    /// Broken model invariant
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Io => write!(f, "i/o"),
            FaultKind::Malformed => write!(f, "malformed input"),
            FaultKind::Configuration => write!(f, "configuration"),
            FaultKind::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Malformed("unexpected end of file".to_string());
        assert_eq!(err.to_string(), "Malformed input: unexpected end of file");

        let err = Error::MissingInput {
            supplied: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Batch item supplies 1 input(s), pipeline requests 3"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.fault_kind(), FaultKind::Io);
    }

    #[test]
    fn test_fault_kind_classification() {
        assert_eq!(
            Error::Malformed("x".into()).fault_kind(),
            FaultKind::Malformed
        );
        assert_eq!(
            Error::UnknownStep("nope".into()).fault_kind(),
            FaultKind::Configuration
        );
        assert_eq!(Error::PipelineDestroyed.fault_kind(), FaultKind::Internal);
    }
}
