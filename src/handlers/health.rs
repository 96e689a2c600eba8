use axum::{routing::get, Router};

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health-check",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_check() -> &'static str {
    "OK"
}

pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health-check", get(health_check))
}
