#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use base64::Engine as _;
use serde_json::Value;
use shoppingcart::{
    app_router,
    auth::DirectoryAuthenticator,
    config::DuplicateItemPolicy,
    metrics::HttpMetrics,
    repositories::{CartStore, InMemoryCartStore},
    services::{CartService, ShoppingCartService},
    AppState,
};
use tower::ServiceExt;

/// Directory user that maps to owner id 1
pub const OWNER: (&str, &str) = ("test", "password");
/// Directory user that maps to owner id 2
pub const OTHER_OWNER: (&str, &str) = ("hacker", "password");

/// Helper harness for spinning up the application over the in-memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(DuplicateItemPolicy::Merge)
    }

    pub fn with_policy(policy: DuplicateItemPolicy) -> Self {
        Self::with_store(Arc::new(InMemoryCartStore::new()), policy)
    }

    pub fn with_store(store: Arc<dyn CartStore>, policy: DuplicateItemPolicy) -> Self {
        let carts: Arc<dyn ShoppingCartService> = Arc::new(CartService::new(store));
        let metrics = Arc::new(HttpMetrics::new("test").expect("metrics registry"));
        let state = AppState::new(carts, Arc::new(DirectoryAuthenticator::default()), metrics)
            .with_duplicate_item_policy(policy);

        Self {
            router: app_router(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        credentials: Option<(&str, &str)>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some((name, password)) = credentials {
            builder = builder.header("authorization", basic_auth(name, password));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests made as [`OWNER`].
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(OWNER)).await
    }

    /// Creates a cart as [`OWNER`] and returns its id.
    pub async fn create_cart(&self) -> i64 {
        let response = self
            .request_authenticated(Method::POST, "/v1/shoppingcart", None)
            .await;
        assert_eq!(response.status(), 201);
        response_json(response).await["id"]
            .as_i64()
            .expect("cart id")
    }
}

pub fn basic_auth(name: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", name, password));
    format!("Basic {}", encoded)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 response")
}
