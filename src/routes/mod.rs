use axum::routing::{get, post};
use axum::Router;

pub mod estimate;
pub mod health;

use estimate::AppState;

/// API routes without the Swagger UI and middleware layers.
pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health_check))
        .route(
            "/api/v1/solar/estimate",
            post(estimate::estimate_solar_potential),
        )
        .with_state(state)
}
