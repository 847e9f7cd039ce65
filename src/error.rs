//! # Harness Error Types
//!
//! Every failure in the harness is terminal for the run. The variants fall into
//! three groups: environment provisioning, unexpected API statuses (the
//! assertion failures), and the plumbing underneath them (HTTP, JSON, config,
//! bundled resources).

use std::path::PathBuf;
use thiserror::Error;

/// Harness operation result type
pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to provision {service}: {source}")]
    Provisioning {
        service: String,
        #[source]
        source: testcontainers::TestcontainersError,
    },

    #[error("{operation}: expected HTTP {expected} but got {actual}: {body}")]
    UnexpectedStatus {
        operation: String,
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {field} - {reason}")]
    InvalidResponse { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to read resource {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture {name}: {reason}")]
    InvalidFixture { name: String, reason: String },
}

impl HarnessError {
    pub fn provisioning(
        service: impl Into<String>,
        source: testcontainers::TestcontainersError,
    ) -> Self {
        Self::Provisioning {
            service: service.into(),
            source,
        }
    }

    pub fn unexpected_status(
        operation: impl Into<String>,
        expected: u16,
        actual: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            expected,
            actual,
            body: body.into(),
        }
    }

    pub fn invalid_response(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }

    /// The actual status code when this error is a failed status expectation
    pub fn actual_status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for HarnessError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
