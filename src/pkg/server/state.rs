use std::{collections::HashMap, sync::Arc, time::Duration};

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use standard_error::{Interpolate, StandardError};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use uuid::Uuid;

use crate::{
    conf::settings,
    pkg::internal::{
        ai::score::{AiScorer, MeritScorer},
        flow::VerificationFlow,
        ledger::{Ledger, LedgerLatency, SqlLedger},
        wallet::WalletSession,
    },
    prelude::Result,
};

pub async fn db_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.database_pool_max_connections)
        .connect(&settings.database_url)
        .await
        .map_err(|e| StandardError::new("ERR-DB-000").interpolate_err(e.to_string()))?;
    Ok(pool)
}

/// A candidate's flow together with its wallet connection.
pub struct FlowSession {
    pub flow: VerificationFlow,
    pub wallet: WalletSession,
}

pub struct FlowEntry {
    session: Arc<Mutex<FlowSession>>,
    last_seen: Instant,
}

pub type Sessions = Arc<RwLock<HashMap<Uuid, FlowEntry>>>;

const DEFAULT_FLOW_IDLE: Duration = Duration::from_secs(60 * 60);

/// Drops flows nobody touched for `idle`. A flow that is locked or midway
/// through a step is kept.
fn evict_idle(flows: &mut HashMap<Uuid, FlowEntry>, idle: Duration) {
    flows.retain(|flow_id, entry| {
        let busy = entry
            .session
            .try_lock()
            .map(|session| session.flow.state().in_flight())
            .unwrap_or(true);
        let keep = busy || entry.last_seen.elapsed() < idle;
        if !keep {
            tracing::debug!("evicting idle verification flow {}", flow_id);
        }
        keep
    });
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<SqlitePool>,
    pub ledger: Arc<dyn Ledger>,
    pub scorer: Arc<dyn MeritScorer>,
    pub flows: Sessions,
    pub base_url: String,
    pub max_upload_bytes: usize,
    pub flow_idle: Duration,
}

impl AppState {
    pub async fn new() -> Result<AppState> {
        let pool = db_pool().await?;
        let latency = LedgerLatency::from_millis(
            settings.ledger_append_latency_ms,
            settings.ledger_lookup_latency_ms,
        );
        let ledger = SqlLedger::init(pool.clone(), latency)
            .await
            .map_err(|e| StandardError::new("ERR-DB-000").interpolate_err(e.to_string()))?;
        let scorer = AiScorer::from_url(
            &settings.ai_key,
            &settings.ai_endpoint,
            &settings.ai_model,
            Duration::from_secs(settings.scoring_timeout_secs),
        )
        .map_err(|_| StandardError::new("ERR-AI-000"))?;
        Ok(AppState::with_parts(
            pool,
            Arc::new(ledger),
            Arc::new(scorer),
            &settings.base_url,
            settings.max_upload_bytes,
        )
        .with_flow_idle(Duration::from_secs(settings.flow_idle_secs)))
    }

    pub fn with_parts(
        db_pool: SqlitePool,
        ledger: Arc<dyn Ledger>,
        scorer: Arc<dyn MeritScorer>,
        base_url: &str,
        max_upload_bytes: usize,
    ) -> AppState {
        AppState {
            db_pool: Arc::new(db_pool),
            ledger,
            scorer,
            flows: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
            flow_idle: DEFAULT_FLOW_IDLE,
        }
    }

    pub fn with_flow_idle(mut self, idle: Duration) -> AppState {
        self.flow_idle = idle;
        self
    }

    pub async fn open_flow(&self) -> (Uuid, Arc<Mutex<FlowSession>>) {
        let flow_id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(FlowSession {
            flow: VerificationFlow::new(self.scorer.clone(), self.ledger.clone()),
            wallet: WalletSession::disconnected(),
        }));
        let mut flows = self.flows.write().await;
        evict_idle(&mut flows, self.flow_idle);
        flows.insert(
            flow_id,
            FlowEntry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!("opened verification flow {} ({} open)", flow_id, flows.len());
        (flow_id, session)
    }

    /// Looks up a flow and marks it as seen.
    pub async fn flow(&self, flow_id: Uuid) -> Option<Arc<Mutex<FlowSession>>> {
        let mut flows = self.flows.write().await;
        let entry = flows.get_mut(&flow_id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn close_flow(&self, flow_id: Uuid) -> bool {
        let closed = self.flows.write().await.remove(&flow_id).is_some();
        if closed {
            tracing::debug!("closed verification flow {}", flow_id);
        }
        closed
    }

    pub fn verify_url(&self, resume_hash: &str) -> String {
        format!("{}/ledger/{}", self.base_url, resume_hash)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::{
        ai::spec::Document,
        flow::Upload,
        testing::{CannedScorer, GOOD_ANSWER, ProbeLedger, memory_pool},
    };

    async fn state() -> AppState {
        AppState::with_parts(
            memory_pool().await,
            ProbeLedger::online().await,
            CannedScorer::new(GOOD_ANSWER),
            "http://verify.test",
            1024,
        )
    }

    #[tokio::test]
    #[traced_test]
    async fn test_recent_flows_are_kept() {
        let state = state().await;
        for _ in 0..3 {
            state.open_flow().await;
        }
        assert_eq!(state.flows.read().await.len(), 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_idle_flows_are_evicted_on_open() {
        let state = state().await.with_flow_idle(Duration::ZERO);
        for _ in 0..1000 {
            state.open_flow().await;
        }
        assert_eq!(state.flows.read().await.len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_busy_flows_survive_eviction() {
        let state = state().await.with_flow_idle(Duration::ZERO);
        let (locked_id, locked) = state.open_flow().await;
        let _guard = locked.lock().await;

        let (hashing_id, hashing) = state.open_flow().await;
        hashing
            .lock()
            .await
            .flow
            .begin_analysis(Upload::Inline(Document::new("cv.txt", b"cv".to_vec())), None)
            .unwrap();

        let (latest_id, _) = state.open_flow().await;
        let flows = state.flows.read().await;
        assert!(flows.contains_key(&locked_id));
        assert!(flows.contains_key(&hashing_id));
        assert!(flows.contains_key(&latest_id));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_close_flow() {
        let state = state().await;
        let (flow_id, _) = state.open_flow().await;
        assert!(state.flow(flow_id).await.is_some());
        assert!(state.close_flow(flow_id).await);
        assert!(state.flow(flow_id).await.is_none());
        assert!(!state.close_flow(flow_id).await);
    }
}
