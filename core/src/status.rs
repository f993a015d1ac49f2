//! Outcome of a single poll step.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::PollError;
use crate::http::HttpResponse;

/// State of a long-running operation as reported by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl PollStatus {
    /// True once no further polling may happen.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PollStatus::InProgress => "InProgress",
            PollStatus::Succeeded => "Succeeded",
            PollStatus::Failed => "Failed",
            PollStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ARM provisioning states that still mean "keep polling".
const IN_FLIGHT_STATES: &[&str] = &[
    "InProgress",
    "Accepted",
    "Running",
    "NotStarted",
    "Creating",
    "Updating",
    "Deleting",
];

impl FromStr for PollStatus {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if IN_FLIGHT_STATES.iter().any(|state| state.eq_ignore_ascii_case(s)) {
            return Ok(PollStatus::InProgress);
        }
        if s.eq_ignore_ascii_case("Succeeded") {
            return Ok(PollStatus::Succeeded);
        }
        if s.eq_ignore_ascii_case("Failed") {
            return Ok(PollStatus::Failed);
        }
        if s.eq_ignore_ascii_case("Canceled") || s.eq_ignore_ascii_case("Cancelled") {
            return Ok(PollStatus::Canceled);
        }
        Err(PollError::UnknownStatus(s.to_string()))
    }
}

/// The `error` object ARM attaches to a failed status payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of one poll step. Immutable once returned.
#[derive(Debug, Clone)]
pub struct PollResult {
    status: PollStatus,
    poll_interval: Duration,
    error: Option<ErrorDetail>,
    response: HttpResponse,
}

impl PollResult {
    pub fn new(
        status: PollStatus,
        poll_interval: Duration,
        error: Option<ErrorDetail>,
        response: HttpResponse,
    ) -> Self {
        Self {
            status,
            poll_interval,
            error,
            response,
        }
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    /// How long to wait before the next poll.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    /// The poll response, body still readable.
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }

    /// Convert a terminal failure into the matching error.
    pub(crate) fn into_failure(self) -> PollError {
        let detail = self.error.unwrap_or_default();
        PollError::OperationFailed {
            status: self.status,
            code: detail.code,
            message: detail
                .message
                .unwrap_or_else(|| format!("operation finished with status {}", self.status)),
        }
    }
}
