//! Long-running-operation polling for Azure Resource Manager style APIs.
//!
//! # Overview
//! A write or delete against ARM may finish synchronously or hand back a
//! locator to poll. This crate decides which from the initiating response,
//! polls the locator until the operation reaches a terminal status, and
//! reports failures with the operation's name attached.
//!
//! # Design
//! - `Poller` is a host-does-IO state machine: `build_poll_request` /
//!   `parse_poll_response`. It never touches the network itself.
//! - `Poller::poll_until_done` is the async driver: sequential polls,
//!   `Retry-After`-aware sleeps, prompt cancellation via `CancellationToken`.
//!   The loop itself is `driver::drive`, generic over `PollStep`, so
//!   service-specific pollers such as `GonePoller` reuse it.
//! - `LroClient` issues the initiating call through a caller-supplied
//!   `Transport` and exposes `begin` / `begin_then_poll`.
//! - Locator conventions (`Azure-AsyncOperation`, `Location`, a query token
//!   such as `asyncId`) are explicit `LocatorStrategy` variants.
//! - Response bodies are buffered once as `Bytes` and stay readable after the
//!   poller has inspected them.

pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod gone;
pub mod http;
pub mod locator;
pub mod operation;
pub mod poller;
pub mod status;

pub use config::{PollerConfig, DEFAULT_POLL_INTERVAL};
pub use driver::{drive, PollStep, Transport};
pub use error::{ErrorKind, OperationError, PollError, TransportError};
pub use gone::GonePoller;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use locator::{Locator, LocatorStrategy};
pub use operation::{LongRunningOperation, LroClient, OperationResponse, ResourceId};
pub use poller::Poller;
pub use status::{ErrorDetail, PollResult, PollStatus};

pub use tokio_util::sync::CancellationToken;
