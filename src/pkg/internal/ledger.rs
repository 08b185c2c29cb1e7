//! Append-only store of verification records keyed by resume digest.

use std::time::Duration;

use sqlx::{SqlitePool, migrate::Migrator};

use super::{
    adaptors::records::{
        mutators::RecordMutator,
        selectors::RecordSelector,
        spec::{ConfirmationToken, VerificationRecord},
    },
    digest::normalize,
    error::LedgerError,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// The ledger contract the flows depend on. Records are never updated or
/// removed once appended.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Appends a record and returns its confirmation token.
    async fn append(&self, record: &VerificationRecord) -> Result<ConfirmationToken, LedgerError>;

    /// First record stored under the normalized digest, if any.
    async fn lookup(&self, resume_hash: &str) -> Result<Option<VerificationRecord>, LedgerError>;

    /// Latest records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>, LedgerError>;
}

/// Simulated confirmation delay of the local ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerLatency {
    pub append: Duration,
    pub lookup: Duration,
}

impl LedgerLatency {
    pub fn from_millis(append: u64, lookup: u64) -> Self {
        LedgerLatency {
            append: Duration::from_millis(append),
            lookup: Duration::from_millis(lookup),
        }
    }
}

/// Ledger kept in a local SQLite database.
#[derive(Debug, Clone)]
pub struct SqlLedger {
    pool: SqlitePool,
    latency: LedgerLatency,
}

impl SqlLedger {
    /// Prepares the schema on `pool` and returns a ledger over it. The
    /// caller owns the pool and decides when it is closed.
    pub async fn init(pool: SqlitePool, latency: LedgerLatency) -> Result<Self, LedgerError> {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        tracing::debug!("ledger schema ready");
        Ok(SqlLedger { pool, latency })
    }

    async fn settle(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl Ledger for SqlLedger {
    async fn append(&self, record: &VerificationRecord) -> Result<ConfirmationToken, LedgerError> {
        Self::settle(self.latency.append).await;
        let mut stored = record.clone();
        stored.resume_hash = normalize(&record.resume_hash);
        let mut conn = self.pool.acquire().await?;
        match RecordMutator::new(&mut conn).create(&stored).await {
            Ok(id) => {
                tracing::info!("ledger entry {} confirmed for {}", id, &stored.resume_hash);
                Ok(stored.signature)
            }
            Err(e @ LedgerError::Duplicate { .. }) => {
                tracing::warn!("refusing duplicate append: {}", &e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup(&self, resume_hash: &str) -> Result<Option<VerificationRecord>, LedgerError> {
        Self::settle(self.latency.lookup).await;
        let key = normalize(resume_hash);
        let mut conn = self.pool.acquire().await?;
        RecordSelector::new(&mut conn)
            .get_by_hash(&key)
            .await?
            .map(VerificationRecord::try_from)
            .transpose()
    }

    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>, LedgerError> {
        Self::settle(self.latency.lookup).await;
        let mut conn = self.pool.acquire().await?;
        RecordSelector::new(&mut conn)
            .get_recent(limit)
            .await?
            .into_iter()
            .map(VerificationRecord::try_from)
            .collect()
    }
}
