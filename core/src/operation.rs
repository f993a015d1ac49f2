//! Issuing a long-running operation and, optionally, waiting for it.
//!
//! # Design
//! `LroClient` is what a generated resource client would call: it builds the
//! initiating request from a resource ID, sends it through the `Transport`,
//! seeds a `Poller` from the response and decodes whatever model came back.
//! `begin_then_poll` is the blocking convenience that also drives the poller
//! to completion. Every failure leaves as an `OperationError` naming the
//! operation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::classify::is_json;
use crate::config::PollerConfig;
use crate::driver::Transport;
use crate::error::{OperationError, PollError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::locator::LocatorStrategy;
use crate::poller::Poller;
use crate::status::PollResult;

/// Anything that renders to a canonical ARM resource path.
pub trait ResourceId {
    fn id(&self) -> String;
}

impl ResourceId for str {
    fn id(&self) -> String {
        self.to_string()
    }
}

impl ResourceId for String {
    fn id(&self) -> String {
        self.clone()
    }
}

/// Static description of one long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRunningOperation {
    pub name: String,
    pub method: HttpMethod,
    pub api_version: String,
    pub strategy: LocatorStrategy,
    pub poll_method: HttpMethod,
    pub config: Option<PollerConfig>,
}

impl LongRunningOperation {
    pub fn new(name: impl Into<String>, method: HttpMethod, api_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            api_version: api_version.into(),
            strategy: LocatorStrategy::default(),
            poll_method: HttpMethod::Get,
            config: None,
        }
    }

    pub fn with_strategy(mut self, strategy: LocatorStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Poll with the operation's own verb rather than GET.
    pub fn poll_with(mut self, method: HttpMethod) -> Self {
        self.poll_method = method;
        self
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Result of the initiating call.
#[derive(Debug)]
pub struct OperationResponse<M> {
    pub operation: String,
    /// The initiating response, body still readable.
    pub response: HttpResponse,
    /// `None` once the operation is known to be complete.
    pub poller: Option<Poller>,
    /// Decoded from a non-empty JSON body, if any.
    pub model: Option<M>,
    /// The terminal poll result, once polled to completion.
    pub completion: Option<PollResult>,
}

impl<M> OperationResponse<M> {
    /// True once no further polling is possible: the operation completed
    /// synchronously, was polled to success, or its poller saw a terminal
    /// failure.
    pub fn is_done(&self) -> bool {
        self.poller.as_ref().map_or(true, Poller::is_done)
    }

    /// Drive the poller to completion.
    ///
    /// On success the poller is released and the terminal result lands in
    /// `completion`; calling this again is a no-op. On error the poller is
    /// kept: after a transport error or cancellation another call resumes
    /// polling, after a terminal failure it reports `AlreadyTerminal`.
    pub async fn poll_until_done<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        cancel: &CancellationToken,
    ) -> Result<(), OperationError> {
        let Some(poller) = self.poller.as_mut() else {
            return Ok(());
        };
        let result = poller
            .poll_until_done(transport, cancel)
            .await
            .map_err(|e| OperationError::new(&self.operation, e))?;
        self.poller = None;
        self.completion = Some(result);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LroClient<T> {
    base_url: Url,
    transport: T,
    config: PollerConfig,
}

impl<T: Transport> LroClient<T> {
    pub fn new(base_url: &str, transport: T, config: PollerConfig) -> Result<Self, PollError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| PollError::InvalidUrl {
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base_url,
            transport,
            config,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// URL of a resource, `api-version` attached. The ID must be an
    /// absolute path (`/subscriptions/...`).
    pub fn resource_url(&self, id: &(impl ResourceId + ?Sized), api_version: &str) -> Result<Url, PollError> {
        let id = id.id();
        if !id.starts_with('/') {
            return Err(PollError::InvalidUrl {
                value: id,
                reason: "resource ID must start with '/'".to_string(),
            });
        }
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), id);
        let mut url = Url::parse(&raw).map_err(|e| PollError::InvalidUrl {
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        op: &LongRunningOperation,
        id: &(impl ResourceId + ?Sized),
        body: Option<&B>,
    ) -> Result<HttpRequest, PollError> {
        let url = self.resource_url(id, &op.api_version)?;
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        let body = match body {
            Some(body) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(body).map_err(PollError::Serialization)?)
            }
            None => None,
        };
        Ok(HttpRequest {
            method: op.method,
            url: url.to_string(),
            headers,
            body,
        })
    }

    /// Send the initiating request and seed a poller from its response.
    #[tracing::instrument(skip_all, fields(operation = %op.name))]
    pub async fn begin<M, B>(
        &self,
        op: &LongRunningOperation,
        id: &(impl ResourceId + ?Sized),
        body: Option<&B>,
    ) -> Result<OperationResponse<M>, OperationError>
    where
        M: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.begin_inner(op, id, body)
            .await
            .map_err(|e| OperationError::new(&op.name, e))
    }

    /// `begin`, then poll to completion if needed.
    #[tracing::instrument(skip_all, fields(operation = %op.name))]
    pub async fn begin_then_poll<M, B>(
        &self,
        op: &LongRunningOperation,
        id: &(impl ResourceId + ?Sized),
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<OperationResponse<M>, OperationError>
    where
        M: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut started = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OperationError::new(&op.name, PollError::Cancelled)),
            started = self.begin(op, id, body) => started?,
        };
        started.poll_until_done(&self.transport, cancel).await?;
        info!("operation complete");
        Ok(started)
    }

    async fn begin_inner<M, B>(
        &self,
        op: &LongRunningOperation,
        id: &(impl ResourceId + ?Sized),
        body: Option<&B>,
    ) -> Result<OperationResponse<M>, PollError>
    where
        M: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.build_request(op, id, body)?;
        let target = self.resource_url(id, &op.api_version)?;
        debug!(method = %request.method, url = %request.url, "sending initial request");
        let response = self.transport.execute(request).await?;

        let config = op.config.unwrap_or(self.config);
        let poller = Poller::from_response(&response, &op.strategy, &target, &config)?
            .map(|p| p.with_method(op.poll_method));
        let model = decode_model(&response)?;
        Ok(OperationResponse {
            operation: op.name.clone(),
            response,
            poller,
            model,
            completion: None,
        })
    }
}

fn decode_model<M: DeserializeOwned>(response: &HttpResponse) -> Result<Option<M>, PollError> {
    if !response.has_body() || !is_json(response.content_type()) {
        return Ok(None);
    }
    serde_json::from_reader(response.body_reader())
        .map(Some)
        .map_err(PollError::Deserialization)
}
