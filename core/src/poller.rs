//! The poll state machine.
//!
//! # Design
//! `Poller` follows the host-does-IO split: `build_poll_request` produces the
//! next request and `parse_poll_response` consumes its response, so each
//! step is deterministic and testable without a network. The async driver in
//! `driver.rs` strings the two together.
//!
//! A poller that has produced a terminal status refuses to go on; driving it
//! again is a caller bug and surfaces as `PollError::AlreadyTerminal`.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::classify::{classify, ResponseShape};
use crate::config::PollerConfig;
use crate::error::PollError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RETRY_AFTER};
use crate::locator::{resolve, Locator, LocatorStrategy};
use crate::status::{PollResult, PollStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poller {
    locator: Locator,
    method: HttpMethod,
    config: PollerConfig,
    next_interval: Duration,
    attempts: u32,
    terminal: Option<PollStatus>,
}

impl Poller {
    /// Seed a poller from the response to the initiating request.
    ///
    /// Returns `Ok(None)` when the response shows the operation has already
    /// completed. `target` is the URL the initiating request was sent to.
    pub fn from_response(
        response: &HttpResponse,
        strategy: &LocatorStrategy,
        target: &Url,
        config: &PollerConfig,
    ) -> Result<Option<Self>, PollError> {
        let Some(locator) = resolve(strategy, response, target)? else {
            debug!(status = response.status, "no polling required");
            return Ok(None);
        };
        debug!(poll_url = %locator.poll_url(), "polling required");
        Ok(Some(Self {
            next_interval: retry_after(response).unwrap_or(config.default_interval),
            locator,
            method: HttpMethod::Get,
            config: *config,
            attempts: 0,
            terminal: None,
        }))
    }

    /// Poll with `method` instead of GET.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Wait before the next poll.
    pub fn poll_interval(&self) -> Duration {
        self.next_interval
    }

    /// Wait before the first poll.
    pub fn initial_delay(&self) -> Duration {
        self.config.initial_delay.unwrap_or(self.next_interval)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_done(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn build_poll_request(&self) -> Result<HttpRequest, PollError> {
        self.ensure_live()?;
        Ok(HttpRequest {
            method: self.method,
            url: self.locator.poll_url().to_string(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        })
    }

    /// Classify one poll response and advance the state machine.
    pub fn parse_poll_response(&mut self, response: HttpResponse) -> Result<PollResult, PollError> {
        self.ensure_live()?;
        self.attempts += 1;
        self.next_interval = retry_after(&response).unwrap_or(self.config.default_interval);

        let (status, error) = match classify(&response)? {
            ResponseShape::Accepted => (PollStatus::InProgress, None),
            ResponseShape::EmptySuccess | ResponseShape::ResourceBody => (PollStatus::Succeeded, None),
            ResponseShape::StatusPayload { status, error } => (status.parse::<PollStatus>()?, error),
        };
        if status.is_terminal() {
            self.terminal = Some(status);
        }
        debug!(
            attempt = self.attempts,
            http_status = response.status,
            %status,
            next_interval_ms = self.next_interval.as_millis() as u64,
            "poll step"
        );
        Ok(PollResult::new(status, self.next_interval, error, response))
    }

    fn ensure_live(&self) -> Result<(), PollError> {
        match self.terminal {
            Some(status) => Err(PollError::AlreadyTerminal(status)),
            None => Ok(()),
        }
    }
}

/// Numeric `Retry-After` in seconds. HTTP-date values are ignored.
pub(crate) fn retry_after(response: &HttpResponse) -> Option<Duration> {
    let value = response.header(RETRY_AFTER)?;
    match value.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!(value, "ignoring non-numeric Retry-After");
            None
        }
    }
}
