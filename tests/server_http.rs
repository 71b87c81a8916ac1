//! End-to-end tests against a listening server.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use serde_json::{json, Value};
use waypost::Middleware;

mod common;

use common::{local_builder, start, PeopleController};

struct Stamp {
    scope: Option<&'static str>,
    value: &'static str,
}

impl Middleware for Stamp {
    fn path(&self) -> Option<&str> {
        self.scope
    }

    fn handle<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .append("x-stamp", HeaderValue::from_static(self.value));
            response
        })
    }
}

fn stamps(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("x-stamp")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_data_responses() {
    let (mut server, base) = start(local_builder().controller(PeopleController::default)).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/person/42", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"code": 200, "message": "SUCCESS", "content": {"id": "42", "name": "John Doe"}})
    );

    let response = client
        .post(format!("{}/person", base))
        .json(&json!({"name": "Jane"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"code": 201, "content": {"id": 7, "name": "Jane"}})
    );

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_handler_error_is_recovered() {
    let (mut server, base) = start(local_builder().controller(PeopleController::default)).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/person/1/boom", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 500);
    assert!(body["message"].as_str().unwrap().contains("boom"));

    // still serving
    let response = client.get(format!("{}/person/1", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // malformed JSON body surfaces as a handler error
    let response = client
        .post(format!("{}/person", base))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_raw_responses() {
    let (mut server, base) = start(local_builder().controller(PeopleController::default)).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/person/9/card", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "Person #9\nName: John Doe\n");

    let response = client.get(format!("{}/person/9/broken-card", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"code": 500, "message": "INTERNAL_SERVER_ERROR: card printer on fire"})
    );

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_and_request_id() {
    let (mut server, base) = start(local_builder().controller(PeopleController::default)).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/animals", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"code": 404, "message": "NOT_FOUND: /animals"})
    );

    let response = client
        .get(format!("{}/person/1", base))
        .header("x-request-id", "client-chosen")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "client-chosen");

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_middlewares_run_in_order_and_scope() {
    let builder = local_builder()
        .middleware(|| Stamp { scope: None, value: "global" })
        .middleware(|| Stamp { scope: Some("/person/"), value: "person" })
        .controller(PeopleController::default);
    let (mut server, base) = start(builder).await;
    let client = reqwest::Client::new();

    // the first declared middleware sees the response last
    let response = client.get(format!("{}/person/1", base)).send().await.unwrap();
    assert_eq!(stamps(&response), vec!["person", "global"]);

    let response = client.get(format!("{}/personal", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(stamps(&response), vec!["global"]);

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_invalid_middleware_scope_aborts_build() {
    let err = local_builder()
        .middleware(|| Stamp { scope: Some("person"), value: "x" })
        .controller(PeopleController::default)
        .build()
        .unwrap_err();
    assert_eq!(err, waypost::RouteError::InvalidRoutePath("person".into()));
}
