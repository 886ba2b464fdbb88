//! Error types for registry operations

use crate::registry::ResourceKind;
use thiserror::Error;

/// Errors raised by the registry client
#[derive(Error, Debug)]
pub enum XdmError {
    /// The identifier matches neither notation nor the global table
    #[error("unable to parse ref: \"{0}\"")]
    UnparseableReference(String),

    /// A document or identifier resolved to a kind the caller did not allow
    #[error("mismatched resource type for {reference}: expected {expected}, found {found}")]
    KindMismatch {
        reference: String,
        expected: String,
        found: ResourceKind,
    },

    #[error("could not find resource")]
    NotFound,

    #[error("multiple resources match the parameters ({0} results)")]
    AmbiguousResult(usize),

    #[error("invalid composition: {0}")]
    InvalidComposition(String),

    /// Any non-2xx response from the platform
    #[error("API request failed: {status}{}{}", fmt_opt(.title), fmt_opt(.detail))]
    RemoteRequestFailure {
        status: u16,
        title: Option<String>,
        detail: Option<String>,
    },

    #[error("illegal create: {0}")]
    IllegalCreate(String),

    /// A fetched document does not describe the resource it was fetched for
    #[error("inconsistent response for {reference}: {message}")]
    Inconsistent { reference: String, message: String },

    #[error("field \"{field}\" missing from {reference}")]
    MissingField { reference: String, field: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid global table: {0}")]
    GlobalTable(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_opt(value: &Option<String>) -> String {
    match value {
        Some(v) => format!(" - {}", v),
        None => String::new(),
    }
}

impl XdmError {
    pub(crate) fn missing_field(reference: &str, field: &str) -> Self {
        Self::MissingField {
            reference: reference.to_string(),
            field: field.to_string(),
        }
    }

    /// HTTP status of a failed request, if this error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRequestFailure { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, XdmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_message_includes_title_and_detail() {
        let err = XdmError::RemoteRequestFailure {
            status: 404,
            title: Some("Not Found".to_string()),
            detail: Some("No schema with that id".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "API request failed: 404 - Not Found - No schema with that id"
        );
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_remote_failure_message_without_body() {
        let err = XdmError::RemoteRequestFailure {
            status: 500,
            title: None,
            detail: None,
        };
        assert_eq!(err.to_string(), "API request failed: 500");
    }
}
