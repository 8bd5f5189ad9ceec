use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabwarden_core::{AppError, AppResult};

/// Parses an ISO-8601 expiry timestamp into UTC.
pub fn parse_expires_at(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            AppError::MalformedResponse(format!("invalid expiresAt timestamp '{value}': {error}"))
        })
}

/// Successful refresh payload returned by the cookie endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRefreshResult {
    #[serde(rename = "expiresAt")]
    expires_at: DateTime<Utc>,
}

impl CookieRefreshResult {
    /// Creates a refresh result from a known expiry instant.
    #[must_use]
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    /// Returns the instant the renewed cookie expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the expiry formatted as an RFC 3339 string, as it is written
    /// into the shared store.
    #[must_use]
    pub fn expires_at_rfc3339(&self) -> String {
        self.expires_at.to_rfc3339()
    }
}

/// Lifecycle outcome of the most recent executor run.
///
/// Exactly one variant is current at any instant. Transitions are driven
/// only by the executor's own lifecycle (start, success, failure); the last
/// known good result is carried along so a failure after a prior success
/// never erases it.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// No execution has been triggered yet.
    NotStarted,
    /// An execution is in flight.
    Pending {
        /// Result of the most recent successful refresh, if any.
        last_success: Option<CookieRefreshResult>,
    },
    /// The most recent execution succeeded.
    Succeeded {
        /// Result of that execution.
        result: CookieRefreshResult,
    },
    /// The most recent execution failed.
    Failed {
        /// The error that ended the execution.
        error: AppError,
        /// Result of the most recent successful refresh, if any.
        last_success: Option<CookieRefreshResult>,
    },
}

impl RefreshOutcome {
    /// Returns the most recent successful result, regardless of what
    /// happened since.
    #[must_use]
    pub fn last_known_good(&self) -> Option<&CookieRefreshResult> {
        match self {
            Self::NotStarted => None,
            Self::Pending { last_success } | Self::Failed { last_success, .. } => {
                last_success.as_ref()
            }
            Self::Succeeded { result } => Some(result),
        }
    }

    /// Returns true if any execution has ever succeeded.
    #[must_use]
    pub fn had_prior_success(&self) -> bool {
        self.last_known_good().is_some()
    }
}

/// Externally exposed status, projected from [`RefreshOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieStatus {
    /// No result yet, or a refresh is in flight.
    Loading,
    /// The most recent refresh failed.
    Error,
    /// The most recent refresh succeeded.
    Success,
}

impl CookieStatus {
    /// Returns the status as its wire-facing lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// Point-in-time view of the coordination state handed to observers.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Projected status.
    pub status: CookieStatus,
    /// Error that produced an `Error` status, if any.
    pub error: Option<AppError>,
    /// Last known good result; retained across later failures.
    pub result: Option<CookieRefreshResult>,
}

impl StatusSnapshot {
    /// Projects the exposed status from the current outcome.
    ///
    /// Holds no independent state: the projection is recomputable at any
    /// instant from the outcome alone.
    #[must_use]
    pub fn project(outcome: &RefreshOutcome) -> Self {
        let result = outcome.last_known_good().cloned();
        match outcome {
            RefreshOutcome::NotStarted | RefreshOutcome::Pending { .. } => Self {
                status: CookieStatus::Loading,
                error: None,
                result,
            },
            RefreshOutcome::Succeeded { .. } => Self {
                status: CookieStatus::Success,
                error: None,
                result,
            },
            RefreshOutcome::Failed { error, .. } => Self {
                status: CookieStatus::Error,
                error: Some(error.clone()),
                result,
            },
        }
    }
}
