//! Error types for the Fleetrun core library.
//!
//! Every failure surfaced to a caller is one of four user-facing classes:
//! transport failures (server unreachable), application errors (non-2xx with
//! a structured reason), validation errors (malformed local input, never sent
//! to the server) and precondition violations (short-circuited client-side).
//! Infrastructure variants (config, stream, parse) back those classes.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Transport | Server unreachable, connection dropped |
//! | E2001-E2099 | Api | Non-2xx responses with extracted reason |
//! | E3001-E3099 | Validation | Malformed local input, blocked pre-submit |
//! | E4001-E4099 | Precondition | Privilege/state checks failed client-side |
//! | E5001-E5099 | Stream | Log stream connect/frame errors |
//! | E6001-E6099 | Config | Configuration loading and validation |
//! | E9001-E9099 | General | Serialization, internal invariants |

use thiserror::Error;

/// The main error type for the Fleetrun core library.
#[derive(Debug, Error)]
pub enum FleetrunError {
    // ========================================================================
    // Transport Errors (E1001-E1099)
    // ========================================================================
    /// The server could not be reached at all. Never retried silently.
    #[error("[E1001] Server unreachable: {0}")]
    Transport(String),

    /// The connection dropped mid-response.
    #[error("[E1002] Connection interrupted: {0}")]
    ConnectionInterrupted(String),

    // ========================================================================
    // Application Errors (E2001-E2099)
    // ========================================================================
    /// The server answered with a non-2xx status and a reason we could
    /// extract from the body. `correlation_id` is the server-supplied
    /// request id when one was echoed back.
    #[error("[E2001] Server rejected the request ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },

    /// The requested entity does not exist (or belongs to another project,
    /// which the server reports identically).
    #[error("[E2002] Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // Validation Errors (E3001-E3099)
    // ========================================================================
    /// User-supplied structured input failed to parse. Blocked before any
    /// request is issued.
    #[error("[E3001] Invalid {what}: {message}")]
    Validation { what: String, message: String },

    // ========================================================================
    // Precondition Violations (E4001-E4099)
    // ========================================================================
    /// A client-side precondition check failed (insufficient role, approval
    /// already decided, empty selection). No request is issued.
    #[error("[E4001] Precondition failed: {0}")]
    Precondition(String),

    // ========================================================================
    // Stream Errors (E5001-E5099)
    // ========================================================================
    /// The log stream could not be opened.
    #[error("[E5001] Log stream connect failed for run {run_id}: {message}")]
    StreamConnect { run_id: i64, message: String },

    /// The log stream broke while active. The connection is released and no
    /// automatic reconnect is attempted.
    #[error("[E5002] Log stream interrupted for run {run_id}: {message}")]
    StreamInterrupted { run_id: i64, message: String },

    /// The server signalled a named error event on the stream.
    #[error("[E5003] Log stream error for run {run_id}: {message}")]
    StreamErrorEvent { run_id: i64, message: String },

    // ========================================================================
    // Configuration Errors (E6001-E6099)
    // ========================================================================
    /// Configuration loading or validation failed.
    #[error("[E6001] Configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("[E6002] Missing required configuration: {0}")]
    MissingConfig(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// A response body could not be deserialized into the expected shape.
    #[error("[E9001] Malformed server response: {0}")]
    MalformedResponse(String),

    /// Serialization of a request payload failed.
    #[error("[E9002] Serialization error: {0}")]
    Serialization(String),

    /// An internal invariant was violated.
    #[error("[E9003] Internal error: {0}")]
    Internal(String),
}

/// Coarse error category used for notice rendering and aggregate reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Api,
    Validation,
    Precondition,
    Stream,
    Config,
    General,
}

impl FleetrunError {
    /// Map this error to its user-facing category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FleetrunError::Transport(_) | FleetrunError::ConnectionInterrupted(_) => {
                ErrorCategory::Transport
            }
            FleetrunError::Api { .. } | FleetrunError::NotFound(_) => ErrorCategory::Api,
            FleetrunError::Validation { .. } => ErrorCategory::Validation,
            FleetrunError::Precondition(_) => ErrorCategory::Precondition,
            FleetrunError::StreamConnect { .. }
            | FleetrunError::StreamInterrupted { .. }
            | FleetrunError::StreamErrorEvent { .. } => ErrorCategory::Stream,
            FleetrunError::Config(_) | FleetrunError::MissingConfig(_) => ErrorCategory::Config,
            FleetrunError::MalformedResponse(_)
            | FleetrunError::Serialization(_)
            | FleetrunError::Internal(_) => ErrorCategory::General,
        }
    }

    /// Whether a user-initiated retry can reasonably succeed. No error is
    /// fatal to the process; this only informs notice wording.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            FleetrunError::Validation { .. } | FleetrunError::Precondition(_)
        )
    }

    /// The server-supplied correlation id, when one was attached.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            FleetrunError::Api { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn validation(what: impl Into<String>, message: impl Into<String>) -> Self {
        FleetrunError::Validation {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        FleetrunError::Precondition(message.into())
    }
}

impl From<reqwest::Error> for FleetrunError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            FleetrunError::Transport(err.to_string())
        } else if err.is_body() || err.is_decode() {
            FleetrunError::MalformedResponse(err.to_string())
        } else {
            FleetrunError::ConnectionInterrupted(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FleetrunError {
    fn from(err: serde_json::Error) -> Self {
        FleetrunError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for FleetrunError {
    fn from(err: config::ConfigError) -> Self {
        FleetrunError::Config(err.to_string())
    }
}

/// Result type alias for Fleetrun operations.
pub type FleetrunResult<T> = Result<T, FleetrunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            FleetrunError::Transport("refused".into()).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            FleetrunError::Api {
                status: 409,
                message: "already decided".into(),
                correlation_id: None,
            }
            .category(),
            ErrorCategory::Api
        );
        assert_eq!(
            FleetrunError::validation("extra_vars", "not a JSON object").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            FleetrunError::precondition("approval already decided").category(),
            ErrorCategory::Precondition
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(FleetrunError::Transport("refused".into()).is_recoverable());
        assert!(FleetrunError::StreamInterrupted {
            run_id: 1,
            message: "eof".into()
        }
        .is_recoverable());
        assert!(!FleetrunError::validation("filters", "unknown key").is_recoverable());
        assert!(!FleetrunError::precondition("empty selection").is_recoverable());
    }

    #[test]
    fn test_correlation_id_surfaces() {
        let err = FleetrunError::Api {
            status: 500,
            message: "boom".into(),
            correlation_id: Some("req-42".into()),
        };
        assert_eq!(err.correlation_id(), Some("req-42"));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
