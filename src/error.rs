//! Error types for crew
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation, missing identity, bad config)
//! - 3: Not found or stale write
//! - 4: Internal failure (storage, lock, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the crew CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const INTERNAL: i32 = 4;
}

/// Main error type for crew operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lookups (exit code 3)
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("No available members in team {0}")]
    NoAvailableMembers(String),

    #[error("{kind} {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        kind: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("{kind} {id} kept changing team while it was being locked")]
    Relocated { kind: &'static str, id: String },

    // Internal failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::Unauthorized(_) | Error::InvalidConfig(_) => {
                exit_codes::USER_ERROR
            }

            Error::NotFound { .. }
            | Error::NoAvailableMembers(_)
            | Error::Conflict { .. }
            | Error::Relocated { .. } => exit_codes::NOT_FOUND,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::INTERNAL,
        }
    }

    /// Taxonomy kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::InvalidConfig(_) => "validation",
            Error::Unauthorized(_) => "unauthorized",
            Error::NotFound { .. } | Error::NoAvailableMembers(_) => "not_found",
            Error::Conflict { .. } | Error::Relocated { .. } => "conflict",
            _ => "internal",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == "internal"
    }

    /// Message shown to callers. Internal faults get a stable prefix so the
    /// raw cause never stands alone.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            format!("internal storage failure ({self})")
        } else {
            self.to_string()
        }
    }

    /// Structured fields for JSON output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            Error::NoAvailableMembers(team) => Some(serde_json::json!({ "team_id": team })),
            Error::Conflict {
                kind,
                id,
                expected,
                found,
            } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
                "expected_version": expected,
                "found_version": found,
            })),
            Error::Relocated { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            Error::Validation(message) | Error::InvalidConfig(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for crew operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.public_message(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
