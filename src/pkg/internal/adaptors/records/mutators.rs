use sqlx::SqliteConnection;

use super::spec::VerificationRecord;
use crate::pkg::internal::error::LedgerError;

pub struct RecordMutator<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> RecordMutator<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        RecordMutator { pool }
    }

    /// Inserts a record; a second record for the same digest is refused by
    /// the unique index on `resume_hash`.
    pub async fn create(&mut self, record: &VerificationRecord) -> Result<i64, LedgerError> {
        let details = serde_json::to_string(&record.details)
            .map_err(|e| LedgerError::Corrupt(e.to_string()))?;
        let result = sqlx::query(
            r#"
            INSERT INTO verification_records (resume_hash, ai_score, wallet_address, timestamp, signature, details)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.resume_hash)
        .bind(record.ai_score as i64)
        .bind(&record.wallet_address)
        .bind(record.timestamp)
        .bind(record.signature.as_str())
        .bind(details)
        .execute(&mut *self.pool)
        .await;
        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                let signature: Option<String> = sqlx::query_scalar(
                    "SELECT signature FROM verification_records WHERE resume_hash = ?",
                )
                .bind(&record.resume_hash)
                .fetch_optional(&mut *self.pool)
                .await?;
                Err(LedgerError::Duplicate {
                    resume_hash: record.resume_hash.clone(),
                    signature: signature.unwrap_or_default(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
