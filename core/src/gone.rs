//! Waiting for a resource to disappear.
//!
//! Some deletes (and purges of soft-deleted resources) answer synchronously
//! but keep the resource visible for a while. There is no status monitor to
//! poll; the only signal is the resource URL starting to return 404.
//! `GonePoller` is a `PollStep` for that case and runs on the same driver as
//! `Poller`.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::PollerConfig;
use crate::driver::{drive, PollStep, Transport};
use crate::error::PollError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::poller::retry_after;
use crate::status::{PollResult, PollStatus};

/// Polls a resource URL with GET until it returns 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GonePoller {
    url: Url,
    config: PollerConfig,
    attempts: u32,
    done: bool,
}

impl GonePoller {
    pub fn new(url: Url, config: PollerConfig) -> Self {
        Self {
            url,
            config,
            attempts: 0,
            done: false,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn build_poll_request(&self) -> Result<HttpRequest, PollError> {
        if self.done {
            return Err(PollError::AlreadyTerminal(PollStatus::Succeeded));
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.url.to_string(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        })
    }

    /// 404 means gone, any other 2xx means still there.
    pub fn parse_poll_response(&mut self, response: HttpResponse) -> Result<PollResult, PollError> {
        if self.done {
            return Err(PollError::AlreadyTerminal(PollStatus::Succeeded));
        }
        self.attempts += 1;
        let interval = retry_after(&response).unwrap_or(self.config.default_interval);
        let status = match response.status {
            404 => PollStatus::Succeeded,
            200..=299 => PollStatus::InProgress,
            status => {
                return Err(PollError::UnexpectedStatus {
                    status,
                    body: response.body_text(),
                })
            }
        };
        self.done = status.is_terminal();
        debug!(attempt = self.attempts, http_status = response.status, %status, "gone check");
        Ok(PollResult::new(status, interval, None, response))
    }

    /// Poll until the resource is gone. See [`drive`].
    #[tracing::instrument(skip_all, fields(url = %self.url))]
    pub async fn poll_until_done<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        cancel: &CancellationToken,
    ) -> Result<PollResult, PollError> {
        drive(self, transport, cancel).await
    }
}

#[async_trait]
impl PollStep for GonePoller {
    async fn poll<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<PollResult, PollError> {
        let request = self.build_poll_request()?;
        let response = transport.execute(request).await?;
        self.parse_poll_response(response)
    }

    fn initial_delay(&self) -> Duration {
        self.config.initial_delay.unwrap_or(Duration::ZERO)
    }
}
