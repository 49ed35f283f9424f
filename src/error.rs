//! Error types of the detector.
//!
//! Everything that can go wrong is detected while building a detector, with
//! two exceptions: the optional timestamp ordering check, and collaborators
//! producing patterns of another width than they announced.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised while configuring or feeding a detector.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// No preset of the catalog has this name.
    #[error("Unknown parameter preset: {name}")]
    ConfigNotFound {
        /// The requested name
        name: String,
    },

    /// Two mutually exclusive parameters are both set.
    #[error("Conflicting parameters: {first} and {second} cannot both be set")]
    ConfigConflict {
        /// One of the parameters
        first: &'static str,
        /// The other one
        second: &'static str,
    },

    /// A parameter is missing or out of its bounds.
    #[error("Invalid parameter: {name} - {reason}")]
    ConfigInvalid {
        /// Path of the parameter, e.g. `sp.potentialPct`
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The parameter document is not valid JSON.
    #[error("Malformed parameter document: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Two collaborators do not agree on the width of the patterns they exchange.
    #[error("Width mismatch between {producer} ({produced}) and {consumer} ({expected})")]
    CollaboratorWidthMismatch {
        /// The collaborator emitting the patterns
        producer: &'static str,
        /// Width it emits
        produced: usize,
        /// The collaborator receiving them
        consumer: &'static str,
        /// Width it accepts
        expected: usize,
    },

    /// A record is older than the one before it.
    #[error("Timestamp {current} precedes previous record at {previous}")]
    NonMonotonicTimestamp {
        /// Timestamp of the last accepted record
        previous: NaiveDateTime,
        /// Timestamp of the rejected one
        current: NaiveDateTime,
    },
}

impl DetectorError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> DetectorError {
        DetectorError::ConfigInvalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type of the detector operations.
pub type Result<T> = std::result::Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = DetectorError::ConfigNotFound {
            name: "nope".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown parameter preset: nope");
    }

    #[test]
    fn test_conflict_display() {
        let error = DetectorError::ConfigConflict {
            first: "localAreaDensity",
            second: "numActiveColumnsPerInhArea",
        };
        assert_eq!(
            error.to_string(),
            "Conflicting parameters: localAreaDensity and numActiveColumnsPerInhArea cannot both be set"
        );
    }

    #[test]
    fn test_invalid_display() {
        let error = DetectorError::invalid("potentialPct", "must be in (0, 1]");
        assert_eq!(
            error.to_string(),
            "Invalid parameter: potentialPct - must be in (0, 1]"
        );
    }

    #[test]
    fn test_width_mismatch_display() {
        let error = DetectorError::CollaboratorWidthMismatch {
            producer: "encoder",
            produced: 454,
            consumer: "pooler",
            expected: 400,
        };
        assert_eq!(
            error.to_string(),
            "Width mismatch between encoder (454) and pooler (400)"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: DetectorError = parse.into();
        assert!(matches!(error, DetectorError::ConfigParse(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DetectorError>();
    }
}
