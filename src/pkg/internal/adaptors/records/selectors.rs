use sqlx::SqliteConnection;

use super::spec::RecordEntry;
use crate::pkg::internal::error::LedgerError;

pub struct RecordSelector<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> RecordSelector<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        RecordSelector { pool }
    }

    pub async fn get_by_hash(&mut self, resume_hash: &str) -> Result<Option<RecordEntry>, LedgerError> {
        let row = sqlx::query_as::<_, RecordEntry>(
            "SELECT id, resume_hash, ai_score, wallet_address, timestamp, signature, details
             FROM verification_records WHERE resume_hash = ? ORDER BY id ASC LIMIT 1",
        )
        .bind(resume_hash)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_recent(&mut self, limit: u32) -> Result<Vec<RecordEntry>, LedgerError> {
        let rows = sqlx::query_as::<_, RecordEntry>(
            "SELECT id, resume_hash, ai_score, wallet_address, timestamp, signature, details
             FROM verification_records ORDER BY id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
