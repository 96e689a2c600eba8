/*!
 * # Metrics Module
 *
 * Prometheus metrics for the cart API, kept on a registry owned by
 * [`HttpMetrics`] rather than the process-wide default registry. The client
 * is built once at startup and shared through `AppState`.
 *
 * - `http_requests_total{method,path,status}`
 * - `http_request_duration_seconds{method,path}`
 * - `cart_operations_total{operation,outcome}`
 */

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;
use tracing::error;

use crate::{errors::ServiceError, AppState};

/// Cart operations tracked by `cart_operations_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    Create,
    Get,
    Empty,
    AddProduct,
    RemoveProduct,
}

impl CartOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Empty => "empty",
            Self::AddProduct => "add_product",
            Self::RemoveProduct => "remove_product",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    cart_operations_total: IntCounterVec,
}

impl HttpMetrics {
    /// Creates the collectors under `namespace` and registers them on a
    /// fresh registry.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests by method, route and status")
                .namespace(namespace),
            &["method", "path", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds by method and route",
            )
            .namespace(namespace)
            .buckets(vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["method", "path"],
        )?;
        let cart_operations_total = IntCounterVec::new(
            Opts::new("cart_operations_total", "Cart service calls by operation and outcome")
                .namespace(namespace),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(cart_operations_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            cart_operations_total,
        })
    }

    pub fn observe_request(&self, method: &str, path: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(seconds);
    }

    /// Counts one cart operation; the outcome is `ok` or the error kind.
    pub fn record_cart_operation<T>(
        &self,
        operation: CartOperation,
        result: &Result<T, ServiceError>,
    ) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => err.kind().as_str(),
        };
        self.cart_operations_total
            .with_label_values(&[operation.as_str(), outcome])
            .inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, ServiceError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ServiceError::Internal(format!("failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| ServiceError::Internal(format!("metrics are not UTF-8: {}", e)))
    }
}

/// Records count and latency for every matched route.
pub async fn track_http_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    state.metrics.observe_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_observed_requests() {
        let metrics = HttpMetrics::new("shoppingcart").unwrap();
        metrics.observe_request("GET", "/v1/shoppingcart/:id", 200, 0.01);
        metrics.observe_request("GET", "/v1/shoppingcart/:id", 404, 0.02);

        let body = metrics.render().unwrap();
        assert!(body.contains("shoppingcart_http_requests_total"));
        assert!(body.contains(r#"path="/v1/shoppingcart/:id""#));
        assert!(body.contains(r#"status="404""#));
        assert!(body.contains("shoppingcart_http_request_duration_seconds_bucket"));
    }

    #[test]
    fn cart_operation_outcome_uses_error_kind() {
        let metrics = HttpMetrics::new("test").unwrap();
        metrics.record_cart_operation(CartOperation::Get, &Ok::<_, ServiceError>(()));
        metrics.record_cart_operation::<()>(CartOperation::Get, &Err(ServiceError::CartNotFound));

        let body = metrics.render().unwrap();
        assert!(body.contains(r#"test_cart_operations_total{operation="get",outcome="ok"} 1"#));
        assert!(body.contains(
            r#"test_cart_operations_total{operation="get",outcome="not_found"} 1"#
        ));
    }

    #[test]
    fn clients_do_not_share_state() {
        let first = HttpMetrics::new("a").unwrap();
        let second = HttpMetrics::new("a").unwrap();
        first.record_cart_operation(CartOperation::Create, &Ok::<_, ServiceError>(()));

        assert!(first.render().unwrap().contains("a_cart_operations_total"));
        assert!(!second.render().unwrap().contains(r#"operation="create""#));
    }
}
