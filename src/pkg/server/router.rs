use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::{Router, routing::get};

use super::handlers;
use super::handlers::probes::{healthz, livez};
use super::state::AppState;

// multipart framing on top of the file itself
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn build_routes(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + FORM_OVERHEAD;
    Router::new()
        .route("/flows", post(handlers::flows::create))
        .route(
            "/flows/:flow_id",
            get(handlers::flows::retrieve).delete(handlers::flows::close),
        )
        .route("/flows/:flow_id/analyze", post(handlers::flows::analyze))
        .route(
            "/flows/:flow_id/wallet",
            post(handlers::flows::connect_wallet).delete(handlers::flows::disconnect_wallet),
        )
        .route("/flows/:flow_id/submit", post(handlers::flows::submit))
        .route("/flows/:flow_id/reset", post(handlers::flows::reset))
        .route("/ledger", get(handlers::ledger::recent))
        .route("/ledger/verify", post(handlers::ledger::verify_upload))
        .route("/ledger/:resume_hash", get(handlers::ledger::retrieve))
        .route("/digest", post(handlers::ledger::digest))
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
