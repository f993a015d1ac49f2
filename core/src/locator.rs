//! Locating the poll target from an initiating response.
//!
//! # Design
//! Azure services disagree on how an asynchronous operation is announced.
//! Rather than guessing one universal rule, each convention is an explicit
//! `LocatorStrategy` variant and the operation declares which one it uses.
//!
//! The rules differ on what an absent locator means:
//! - header conventions treat a missing header on HTTP 202 as a broken
//!   response, and on any other 2xx/3xx as "already done";
//! - the query-parameter convention treats a missing `Location` as
//!   "already done" whatever the status.

use url::Url;

use crate::error::PollError;
use crate::http::{HttpResponse, AZURE_ASYNC_OPERATION, LOCATION};

/// How an operation announces where to poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// `Azure-AsyncOperation`, falling back to `Location`.
    #[default]
    AsyncOperationHeader,
    /// `Location` only.
    LocationHeader,
    /// A token carried in the `Location` query and polled against the
    /// resource itself, e.g. API Management's `asyncId`.
    LocationQueryParameter { parameter: String },
}

impl LocatorStrategy {
    pub fn async_id() -> Self {
        LocatorStrategy::LocationQueryParameter {
            parameter: "asyncId".to_string(),
        }
    }
}

/// Where subsequent polls are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    AsyncOperation(Url),
    Location(Url),
    QueryParameter { target: Url, name: String, value: String },
}

impl Locator {
    pub fn poll_url(&self) -> Url {
        match self {
            Locator::AsyncOperation(url) | Locator::Location(url) => url.clone(),
            Locator::QueryParameter { target, name, value } => {
                let mut url = target.clone();
                url.query_pairs_mut().append_pair(name, value);
                url
            }
        }
    }
}

/// Work out the locator for `response`, or `None` when no polling is needed.
///
/// `target` is the resource URL the initiating request was sent to.
pub fn resolve(
    strategy: &LocatorStrategy,
    response: &HttpResponse,
    target: &Url,
) -> Result<Option<Locator>, PollError> {
    if !(200..400).contains(&response.status) {
        return Err(PollError::UnexpectedStatus {
            status: response.status,
            body: response.body_text(),
        });
    }

    match strategy {
        LocatorStrategy::AsyncOperationHeader => {
            if let Some(value) = response.header(AZURE_ASYNC_OPERATION) {
                return absolute_url(AZURE_ASYNC_OPERATION, value).map(|u| Some(Locator::AsyncOperation(u)));
            }
            if let Some(value) = response.header(LOCATION) {
                return absolute_url(LOCATION, value).map(|u| Some(Locator::Location(u)));
            }
            missing(response.status, AZURE_ASYNC_OPERATION)
        }
        LocatorStrategy::LocationHeader => match response.header(LOCATION) {
            Some(value) => absolute_url(LOCATION, value).map(|u| Some(Locator::Location(u))),
            None => missing(response.status, LOCATION),
        },
        LocatorStrategy::LocationQueryParameter { parameter } => {
            let Some(value) = response.header(LOCATION) else {
                return Ok(None);
            };
            let location = absolute_url(LOCATION, value)?;
            let token = location
                .query_pairs()
                .find(|(k, _)| k == parameter.as_str())
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PollError::MissingQueryParameter {
                    parameter: parameter.clone(),
                    location: value.to_string(),
                })?;
            Ok(Some(Locator::QueryParameter {
                target: target.clone(),
                name: parameter.clone(),
                value: token,
            }))
        }
    }
}

fn missing(status: u16, header: &'static str) -> Result<Option<Locator>, PollError> {
    if status == 202 {
        Err(PollError::MissingLocator { status, header })
    } else {
        Ok(None)
    }
}

fn absolute_url(header: &'static str, value: &str) -> Result<Url, PollError> {
    let invalid = |reason: String| PollError::InvalidLocator {
        header,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}
