use api::{middleware::log_request, routes::routes, state::AppState};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware::from_fn,
    response::Response,
};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::convert::Infallible;
use tower::ServiceExt;
use tower::util::BoxCloneService;

pub struct TestApp {
    pub service: BoxCloneService<Request<Body>, Response, Infallible>,
    pub state: AppState,
}

/// Router over a fresh in-memory database, without face verification.
pub async fn make_test_app() -> TestApp {
    let db = setup_test_db().await;
    let state = AppState::with_threshold(db, None, 0.6);

    let router = Router::new()
        .nest("/api", routes(state.clone()))
        .layer(from_fn(log_request));

    TestApp {
        service: router.into_service().boxed_clone(),
        state,
    }
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        self.state.db()
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.service.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }
}
