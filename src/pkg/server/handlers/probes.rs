use axum::extract::State;
use sqlx::query;
use standard_error::{Interpolate, StandardError};

use crate::{pkg::server::state::AppState, prelude::Result};

pub async fn livez() -> Result<()> {
    tracing::debug!("service is live");
    Ok(())
}

pub async fn healthz(State(state): State<AppState>) -> Result<()> {
    query("select 1")
        .execute(&*state.db_pool)
        .await
        .map_err(|e| StandardError::new("ERR-DB-000").interpolate_err(e.to_string()))?;
    tracing::debug!("service is healthy");
    Ok(())
}
