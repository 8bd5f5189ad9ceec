//! Shared primitives for all Rust crates in Tabwarden.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Tabwarden crates.
pub type AppResult<T> = Result<T, AppError>;

/// Logical identifier of the plugin whose cookie endpoint is kept fresh.
///
/// Plugin ids scope everything a coordination session touches: the refresh
/// endpoint resolved through discovery and the shared-store bucket used for
/// cross-tab synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginId(String);

impl PluginId {
    /// Creates a validated plugin identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "plugin id must not be empty or whitespace".to_owned(),
            ));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "plugin id '{trimmed}' must not contain whitespace"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the shared-store bucket name scoped to this plugin.
    #[must_use]
    pub fn cookie_bucket_name(&self) -> String {
        format!("{}-auth-cookie-storage", self.0)
    }
}

impl Display for PluginId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Plugin base URL could not be resolved.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Network-level failure before any HTTP response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Refresh endpoint answered with a non-success status.
    #[error("refresh endpoint returned status {status}: {body}")]
    HttpResponse {
        /// HTTP status code of the failed response.
        status: u16,
        /// Response body detail, as returned by the endpoint.
        body: String,
    },

    /// Successful response whose body does not match the wire contract.
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    /// Shared store read, write, or subscription failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
