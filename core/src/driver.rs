//! Driving a poller to completion.
//!
//! # Design
//! The loop runs on the caller's task: one step at a time, a sleep between
//! steps, nothing spawned. Both the sleep and the in-flight step race the
//! caller's `CancellationToken`, so cancellation is observed promptly and no
//! step is started after it fires.
//!
//! `PollStep` is the seam for services whose completion signal does not fit
//! the standard locator conventions; `Poller` is one implementation of it.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{PollError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::poller::Poller;
use crate::status::{PollResult, PollStatus};

/// Executes one HTTP round-trip. Retry policy, auth and TLS live behind this.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

/// One poll of a long-running operation: issue a request, classify the answer.
#[async_trait]
pub trait PollStep: Send {
    async fn poll<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<PollResult, PollError>;

    /// Wait before the first poll.
    fn initial_delay(&self) -> Duration;
}

#[async_trait]
impl PollStep for Poller {
    async fn poll<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<PollResult, PollError> {
        let request = self.build_poll_request()?;
        let response = transport.execute(request).await?;
        self.parse_poll_response(response)
    }

    fn initial_delay(&self) -> Duration {
        Poller::initial_delay(self)
    }
}

/// Drive `step` until it reports a terminal status.
///
/// Returns the final `Succeeded` result. `Failed`/`Canceled` come back as
/// `PollError::OperationFailed`; transport and protocol errors abort the loop
/// as-is.
pub async fn drive<S, T>(step: &mut S, transport: &T, cancel: &CancellationToken) -> Result<PollResult, PollError>
where
    S: PollStep,
    T: Transport + ?Sized,
{
    sleep_or_cancel(step.initial_delay(), cancel).await?;
    let mut attempts = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = step.poll(transport) => result?,
        };
        attempts += 1;
        match result.status() {
            PollStatus::InProgress => {
                debug!(attempts, wait_ms = result.poll_interval().as_millis() as u64, "operation in progress");
                sleep_or_cancel(result.poll_interval(), cancel).await?;
            }
            PollStatus::Succeeded => {
                info!(attempts, "operation succeeded");
                return Ok(result);
            }
            PollStatus::Failed | PollStatus::Canceled => {
                info!(attempts, status = %result.status(), "operation did not succeed");
                return Err(result.into_failure());
            }
        }
    }
}

impl Poller {
    /// Poll until the operation reaches a terminal status. See [`drive`].
    #[tracing::instrument(skip_all, fields(poll_url = %self.locator().poll_url()))]
    pub async fn poll_until_done<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        cancel: &CancellationToken,
    ) -> Result<PollResult, PollError> {
        drive(self, transport, cancel).await
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), PollError> {
    if duration.is_zero() {
        return if cancel.is_cancelled() { Err(PollError::Cancelled) } else { Ok(()) };
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PollError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
