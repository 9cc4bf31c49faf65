//! Error types for the BadgeKit API client.
//!
//! # Design
//! Failures detected locally (`Usage`, `InvalidUrl`, `Encode`) never involve
//! a network round trip. Failures reported by the server are classified from
//! the status code and the BadgeKit `code` field of the error body, and carry
//! the server's `message` when one is available.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by `BadgeKitClient` and `BadgeKitApi`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied an incomplete or invalid locator.
    #[error("invalid request: {0}")]
    Usage(String),

    /// The configured base URL is not usable.
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server could not be reached, or the exchange timed out.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body is not valid JSON or not of the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// A payload or token could not be serialized.
    #[error("serialization failed: {0}")]
    Encode(String),

    /// The server reports that the requested resource does not exist.
    #[error("resource not found: {message}")]
    NotFound { status: u16, message: String },

    /// The server rejected a create payload.
    #[error("validation failed: {message}{}", format_fields(.fields))]
    Validation {
        status: u16,
        message: String,
        fields: Vec<String>,
    },

    /// The server already holds a resource with the same key.
    #[error("resource already exists: {message}")]
    Conflict { status: u16, message: String },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The server is older than the version the caller requires.
    #[error("BadgeKit API {required} or newer required, server reports {actual}")]
    UnsupportedServer {
        required: semver::Version,
        actual: semver::Version,
    },
}

impl ApiError {
    /// HTTP status of a server-reported failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Conflict { status, .. }
            | ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn format_fields(fields: &[String]) -> String {
    if fields.is_empty() {
        String::new()
    } else {
        format!(" ({})", fields.join(", "))
    }
}

/// The JSON error body BadgeKit sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Parses an error body; anything that is not a JSON object yields an
    /// empty `ErrorBody` and the raw text is used as the message instead.
    pub(crate) fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Field names listed in `details`. Conflict responses carry an object
    /// there instead of a list, which yields no fields.
    pub(crate) fn fields(&self) -> Vec<String> {
        let Some(serde_json::Value::Array(details)) = &self.details else {
            return Vec::new();
        };
        details
            .iter()
            .filter_map(|detail| detail.get("field")?.as_str().map(str::to_string))
            .collect()
    }
}
