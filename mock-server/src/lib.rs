use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
pub const LOCATION: &str = "location";
pub const RETRY_AFTER: &str = "retry-after";

/// Knobs for how long emulated operations stay in flight.
#[derive(Clone, Copy, Debug)]
pub struct MockSettings {
    /// Polls answered "in progress" before an operation finishes.
    pub polls_until_done: u32,
    /// Sent as `Retry-After` on every in-flight answer.
    pub retry_after_secs: u64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            polls_until_done: 2,
            retry_after_secs: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "provisioningState")]
    pub provisioning_state: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Deserialize)]
pub struct ResourceInput {
    #[serde(default)]
    pub properties: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Canceled,
}

impl Outcome {
    fn for_name(name: &str) -> Self {
        if name.starts_with("fail-") {
            Outcome::Failed
        } else if name.starts_with("cancel-") {
            Outcome::Canceled
        } else {
            Outcome::Succeeded
        }
    }
}

#[derive(Debug)]
struct Operation {
    resource: String,
    remaining: u32,
    outcome: Outcome,
}

impl Operation {
    /// Count one poll. True once the operation has finished.
    fn advance(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }
}

#[derive(Default)]
struct Store {
    resources: HashMap<String, Resource>,
    operations: HashMap<Uuid, Operation>,
}

#[derive(Clone)]
pub struct AppState {
    base_url: Arc<str>,
    settings: MockSettings,
    store: Arc<RwLock<Store>>,
}

impl AppState {
    fn start(&self, store: &mut Store, resource: &str, outcome: Outcome) -> Uuid {
        let id = Uuid::new_v4();
        store.operations.insert(
            id,
            Operation {
                resource: resource.to_string(),
                remaining: self.settings.polls_until_done,
                outcome,
            },
        );
        id
    }

    fn retry_after(&self) -> (&'static str, String) {
        (RETRY_AFTER, self.settings.retry_after_secs.to_string())
    }
}

pub fn app(base_url: impl Into<String>, settings: MockSettings) -> Router {
    let base_url: String = base_url.into();
    let state = AppState {
        base_url: base_url.trim_end_matches('/').into(),
        settings,
        store: Arc::default(),
    };
    Router::new()
        .route(
            "/resources/{name}",
            get(get_resource).put(put_resource).delete(delete_resource),
        )
        .route("/resources/{name}/restart", post(restart_resource))
        .route("/operations/{id}", get(get_operation))
        .route("/operationResults/{id}", get(get_operation_result))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockSettings::default()).await
}

pub async fn run_with(listener: TcpListener, settings: MockSettings) -> Result<(), std::io::Error> {
    let base_url = format!("http://{}", listener.local_addr()?);
    info!(%base_url, "mock ARM server listening");
    axum::serve(listener, app(base_url, settings)).await
}

/// `sync-*` completes inline; everything else is announced with
/// `Azure-AsyncOperation` and finishes after a few polls.
async fn put_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<ResourceInput>,
) -> Response {
    let mut store = state.store.write().await;
    let mut resource = Resource {
        id: format!("/resources/{name}"),
        name: name.clone(),
        provisioning_state: "Succeeded".to_string(),
        properties: input.properties,
    };

    if name.starts_with("sync-") {
        store.resources.insert(name, resource.clone());
        return (StatusCode::OK, Json(resource)).into_response();
    }

    resource.provisioning_state = "Creating".to_string();
    store.resources.insert(name.clone(), resource.clone());
    let op = state.start(&mut store, &name, Outcome::for_name(&name));
    info!(%name, %op, "create accepted");
    (
        StatusCode::CREATED,
        [
            (AZURE_ASYNC_OPERATION, format!("{}/operations/{op}", state.base_url)),
            state.retry_after(),
        ],
        Json(resource),
    )
        .into_response()
}

async fn get_operation(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let mut store = state.store.write().await;
    let Some(op) = store.operations.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !op.advance() {
        return ([state.retry_after()], Json(json!({ "status": "InProgress" }))).into_response();
    }

    let (resource, outcome) = (op.resource.clone(), op.outcome);
    store.operations.remove(&id);
    let (provisioning_state, body) = match outcome {
        Outcome::Succeeded => ("Succeeded", json!({ "status": "Succeeded" })),
        Outcome::Failed => (
            "Failed",
            json!({
                "status": "Failed",
                "error": { "code": "ProvisioningFailed", "message": format!("provisioning {resource} failed") },
            }),
        ),
        Outcome::Canceled => ("Canceled", json!({ "status": "Canceled" })),
    };
    if let Some(r) = store.resources.get_mut(&resource) {
        r.provisioning_state = provisioning_state.to_string();
    }
    Json(body).into_response()
}

#[derive(Deserialize)]
struct AsyncQuery {
    #[serde(rename = "asyncId")]
    async_id: Option<Uuid>,
}

/// Plain reads, plus the `asyncId` poll target used by delete.
async fn get_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<AsyncQuery>,
) -> Response {
    let mut store = state.store.write().await;
    let Some(async_id) = query.async_id else {
        return match store.resources.get(&name) {
            Some(resource) => Json(resource.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        };
    };

    let Some(op) = store.operations.get_mut(&async_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !op.advance() {
        return (StatusCode::ACCEPTED, [state.retry_after()]).into_response();
    }
    store.operations.remove(&async_id);
    store.resources.remove(&name);
    StatusCode::OK.into_response()
}

/// Deletes are announced through `Location` carrying an `asyncId`.
async fn delete_resource(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let mut store = state.store.write().await;
    if !store.resources.contains_key(&name) {
        return StatusCode::NO_CONTENT.into_response();
    }
    let op = state.start(&mut store, &name, Outcome::Succeeded);
    info!(%name, %op, "delete accepted");
    (
        StatusCode::ACCEPTED,
        [
            (LOCATION, format!("{}/resources/{name}?asyncId={op}", state.base_url)),
            state.retry_after(),
        ],
    )
        .into_response()
}

/// Actions are announced through a plain `Location`.
async fn restart_resource(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let mut store = state.store.write().await;
    if !store.resources.contains_key(&name) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let op = state.start(&mut store, &name, Outcome::Succeeded);
    (
        StatusCode::ACCEPTED,
        [
            (LOCATION, format!("{}/operationResults/{op}", state.base_url)),
            state.retry_after(),
        ],
    )
        .into_response()
}

async fn get_operation_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let mut store = state.store.write().await;
    let Some(op) = store.operations.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !op.advance() {
        return (StatusCode::ACCEPTED, [state.retry_after()]).into_response();
    }
    store.operations.remove(&id);
    StatusCode::NO_CONTENT.into_response()
}
