use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, MockSettings, Resource};
use tower::{Service, ServiceExt};

const BASE: &str = "http://mock.test";

fn mock() -> Router {
    app(
        BASE,
        MockSettings {
            polls_until_done: 1,
            retry_after_secs: 3,
        },
    )
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn header(response: &axum::response::Response, name: &str) -> String {
    response.headers()[name].to_str().unwrap().to_string()
}

/// Strip the advertised base so the path can be replayed through the router.
fn local(url: &str) -> &str {
    url.strip_prefix(BASE).unwrap()
}

async fn send(app: &mut axum::routing::RouterIntoService<String>, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

// --- create ---

#[tokio::test]
async fn sync_create_completes_inline() {
    let resp = mock()
        .oneshot(json_request("PUT", "/resources/sync-a", r#"{"properties":{"size":1}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("azure-asyncoperation").is_none());
    let resource: Resource = body_json(resp).await;
    assert_eq!(resource.provisioning_state, "Succeeded");
    assert_eq!(resource.properties["size"], 1);
}

#[tokio::test]
async fn async_create_announces_operation() {
    let resp = mock()
        .oneshot(json_request("PUT", "/resources/db", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(header(&resp, "azure-asyncoperation").starts_with("http://mock.test/operations/"));
    assert_eq!(header(&resp, "retry-after"), "3");
    let resource: Resource = body_json(resp).await;
    assert_eq!(resource.provisioning_state, "Creating");
}

#[tokio::test]
async fn create_operation_runs_to_success() {
    let mut app = mock().into_service();

    let resp = send(&mut app, json_request("PUT", "/resources/db", "{}")).await;
    let op_url = header(&resp, "azure-asyncoperation");

    let resp = send(&mut app, empty_request("GET", local(&op_url))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "InProgress");

    let resp = send(&mut app, empty_request("GET", local(&op_url))).await;
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "Succeeded");

    let resp = send(&mut app, empty_request("GET", "/resources/db")).await;
    let resource: Resource = body_json(resp).await;
    assert_eq!(resource.provisioning_state, "Succeeded");

    // Finished operations are forgotten.
    let resp = send(&mut app, empty_request("GET", local(&op_url))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failing_create_reports_error_detail() {
    let mut app = mock().into_service();

    let resp = send(&mut app, json_request("PUT", "/resources/fail-db", "{}")).await;
    let op_url = header(&resp, "azure-asyncoperation");
    send(&mut app, empty_request("GET", local(&op_url))).await;

    let resp = send(&mut app, empty_request("GET", local(&op_url))).await;
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["error"]["code"], "ProvisioningFailed");
}

#[tokio::test]
async fn unknown_operation_is_404() {
    let resp = mock()
        .oneshot(empty_request("GET", "/operations/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_of_missing_resource_is_no_content() {
    let resp = mock().oneshot(empty_request("DELETE", "/resources/ghost")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn delete_polls_through_async_id() {
    let mut app = mock().into_service();
    send(&mut app, json_request("PUT", "/resources/sync-a", "{}")).await;

    let resp = send(&mut app, empty_request("DELETE", "/resources/sync-a")).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let location = header(&resp, "location");
    assert!(location.contains("?asyncId="));

    let resp = send(&mut app, empty_request("GET", local(&location))).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&mut app, empty_request("GET", local(&location))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, empty_request("GET", "/resources/sync-a")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- actions ---

#[tokio::test]
async fn restart_polls_through_location() {
    let mut app = mock().into_service();
    send(&mut app, json_request("PUT", "/resources/sync-a", "{}")).await;

    let resp = send(&mut app, empty_request("POST", "/resources/sync-a/restart")).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let location = header(&resp, "location");
    assert!(location.starts_with("http://mock.test/operationResults/"));

    let resp = send(&mut app, empty_request("GET", local(&location))).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = send(&mut app, empty_request("GET", local(&location))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn restart_of_missing_resource_is_404() {
    let resp = mock()
        .oneshot(empty_request("POST", "/resources/ghost/restart"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
