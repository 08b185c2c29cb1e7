//! Fakes shared by the flow and server tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tokio::sync::Notify;

use super::{
    adaptors::records::spec::{ConfirmationToken, VerificationRecord},
    ai::{
        score::{MeritScorer, parse_analysis},
        spec::{Document, JobContext, ResumeAnalysis},
    },
    error::{LedgerError, VerifyError},
    ledger::{Ledger, LedgerLatency, SqlLedger},
};

pub const GOOD_ANSWER: &str = r#"{
    "score": 87,
    "strengths": ["Kubernetes", "Go"],
    "risk_flags": ["No quantified impact"],
    "role_relevance": "DevOps",
    "experience_level": "Senior"
}"#;

/// Private in-memory database; one connection so every query sees it.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// Empty ledger on a private in-memory database.
pub async fn memory_ledger() -> SqlLedger {
    SqlLedger::init(memory_pool().await, LedgerLatency::default())
        .await
        .unwrap()
}

/// Scorer that answers with a canned model response, run through the real
/// validation.
pub struct CannedScorer {
    answer: String,
    calls: AtomicUsize,
}

impl CannedScorer {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(CannedScorer {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MeritScorer for CannedScorer {
    async fn score(
        &self,
        _document: &Document,
        _job: Option<&JobContext>,
    ) -> Result<ResumeAnalysis, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        parse_analysis(&self.answer)
    }
}

/// Scorer that parks every call until released, so tests can look at a
/// flow while it is scoring.
pub struct GatedScorer {
    answer: String,
    entered: Notify,
    released: Notify,
}

impl GatedScorer {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(GatedScorer {
            answer: answer.to_string(),
            entered: Notify::new(),
            released: Notify::new(),
        })
    }

    /// Resolves once a call is parked.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait::async_trait]
impl MeritScorer for GatedScorer {
    async fn score(
        &self,
        _document: &Document,
        _job: Option<&JobContext>,
    ) -> Result<ResumeAnalysis, VerifyError> {
        self.entered.notify_one();
        self.released.notified().await;
        parse_analysis(&self.answer)
    }
}

/// Wraps a ledger, counting appends and optionally failing every call.
pub struct ProbeLedger {
    inner: SqlLedger,
    offline: bool,
    appends: AtomicUsize,
}

impl ProbeLedger {
    pub async fn online() -> Arc<Self> {
        Arc::new(ProbeLedger {
            inner: memory_ledger().await,
            offline: false,
            appends: AtomicUsize::new(0),
        })
    }

    pub async fn offline() -> Arc<Self> {
        Arc::new(ProbeLedger {
            inner: memory_ledger().await,
            offline: true,
            appends: AtomicUsize::new(0),
        })
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.offline {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Ledger for ProbeLedger {
    async fn append(&self, record: &VerificationRecord) -> Result<ConfirmationToken, LedgerError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.append(record).await
    }

    async fn lookup(&self, resume_hash: &str) -> Result<Option<VerificationRecord>, LedgerError> {
        self.check()?;
        self.inner.lookup(resume_hash).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>, LedgerError> {
        self.check()?;
        self.inner.recent(limit).await
    }
}
