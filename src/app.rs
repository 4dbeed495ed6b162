use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/pages/:slug", get(handlers::page))
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/:slug", get(handlers::report))
        .with_state(state)
}
