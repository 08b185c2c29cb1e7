use standard_error::{Interpolate, StandardError};

use crate::{pkg::internal::ledger::MIGRATOR, pkg::server::state::db_pool, prelude::Result};

pub async fn apply() -> Result<()> {
    let pool = db_pool().await?;
    tracing::debug!("connected to db");
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StandardError::new("ERR-DB-000").interpolate_err(e.to_string()))?;
    pool.close().await;
    println!("Migrations applied successfully");
    Ok(())
}
