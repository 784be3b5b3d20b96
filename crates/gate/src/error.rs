use http::StatusCode;
use thiserror::Error;

use crate::policy::PolicySlot;

/// Invalid policy detected while building a [`PolicyStore`](crate::PolicyStore).
///
/// These errors are fatal: the server must not start with a policy it can't enforce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{slot} limit must be non-negative, got {value}")]
    NegativeLimit { slot: PolicySlot, value: i64 },

    #[error("{slot} limit configured twice with different values: {first} and {second}")]
    ConflictingShapes { slot: PolicySlot, first: String, second: String },

    #[error("{shape} is only allowed for unrecognized destinations, not for the {slot} slot")]
    ShapeNotAllowed { slot: PolicySlot, shape: String },

    #[error("invalid policy configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub fn negative(slot: PolicySlot, value: i64) -> Self {
        Self::NegativeLimit { slot, value }
    }

    pub fn conflicting<A: ToString, B: ToString>(slot: PolicySlot, first: A, second: B) -> Self {
        Self::ConflictingShapes { slot, first: first.to_string(), second: second.to_string() }
    }

    pub fn shape_not_allowed<S: ToString>(slot: PolicySlot, shape: S) -> Self {
        Self::ShapeNotAllowed { slot, shape: shape.to_string() }
    }

    pub fn invalid<S: ToString>(str: S) -> Self {
        Self::Invalid { reason: str.to_string() }
    }
}

/// The destination resolver failed to answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("destination lookup failed: {reason}")]
pub struct ResolveError {
    reason: String,
}

impl ResolveError {
    pub fn new<S: ToString>(str: S) -> Self {
        Self { reason: str.to_string() }
    }
}

/// A destination's gate settings block can't be turned into an override.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("gate settings must be an object, got {found}")]
    NotAnObject { found: String },

    #[error("override limit must be non-negative, got {value}")]
    NegativeLimit { value: i64 },

    #[error("override limit must be an integer or null, got {found}")]
    InvalidLimit { found: String },
}

/// Why the gate refused a request.
///
/// The `Display` output doubles as the response body handed to the
/// [`ResponseEmitter`](crate::ResponseEmitter).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("{}", oversized_message(.limit))]
    OversizedPayload { limit: Option<u64> },

    #[error("Not Found")]
    UnrecognizedRejected,
}

impl Rejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OversizedPayload { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnrecognizedRejected => StatusCode::NOT_FOUND,
        }
    }
}

// a predicate can't report its threshold, so the message leaves it out
fn oversized_message(limit: &Option<u64>) -> String {
    match limit {
        Some(limit) => format!("Payload Too Large: request body exceeds the limit of {limit} bytes"),
        None => "Payload Too Large: request body exceeds the allowed size".to_string(),
    }
}
