//! Shopping Cart Service Library
//!
//! Per-user shopping carts over HTTP: the cart service with its ownership and
//! merge rules, the stores it persists through, and the axum surface around it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::{
    auth::Authenticator, config::DuplicateItemPolicy, metrics::HttpMetrics,
    services::ShoppingCartService,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<dyn ShoppingCartService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub metrics: Arc<HttpMetrics>,
    pub duplicate_item_policy: DuplicateItemPolicy,
}

impl AppState {
    pub fn new(
        carts: Arc<dyn ShoppingCartService>,
        authenticator: Arc<dyn Authenticator>,
        metrics: Arc<HttpMetrics>,
    ) -> Self {
        Self {
            carts,
            authenticator,
            metrics,
            duplicate_item_policy: DuplicateItemPolicy::default(),
        }
    }

    pub fn with_duplicate_item_policy(mut self, policy: DuplicateItemPolicy) -> Self {
        self.duplicate_item_policy = policy;
        self
    }
}

/// `/v1` cart routes behind basic auth
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    handlers::carts::cart_routes().route_layer(middleware::from_fn_with_state(
        state,
        auth::auth_middleware,
    ))
}

/// Full application router: cart API, health, metrics, API docs, and the
/// request id, tracing and metrics middleware.
pub fn app_router(state: AppState) -> Router {
    let instrumented = Router::new()
        .merge(api_v1_routes(state.clone()))
        .merge(handlers::health::health_routes())
        .route("/metrics", get(metrics::metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_http_metrics,
        ));

    Router::new()
        .merge(instrumented)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
