use std::{path::PathBuf, sync::Arc, time::Duration};

use standard_error::{Interpolate, StandardError};

use crate::{
    conf::settings,
    pkg::{
        internal::{
            ai::{
                score::AiScorer,
                spec::{JobContext, parse_skills},
            },
            digest::digest_file,
            flow::{FlowState, Upload, VerificationFlow},
            ledger::{LedgerLatency, SqlLedger},
            lookup::{self, LookupOutcome},
            wallet::WalletSession,
        },
        server::state::db_pool,
    },
    prelude::Result,
};

#[derive(clap::Args)]
pub struct JobArgs {
    /// title of the job the resume is scored against
    #[arg(long)]
    title: Option<String>,
    /// role category, e.g. Cloud, DevOps, Support
    #[arg(long)]
    role: Option<String>,
    /// job description text or a URL to the posting
    #[arg(long)]
    description: Option<String>,
    /// comma separated skills
    #[arg(long)]
    skills: Option<String>,
}

impl JobArgs {
    fn into_context(self) -> Option<JobContext> {
        let job = JobContext {
            title: self.title.unwrap_or_default(),
            role: self.role,
            description: self.description.unwrap_or_default(),
            skills: self.skills.as_deref().map(parse_skills).unwrap_or_default(),
        };
        if job.is_empty() { None } else { Some(job) }
    }
}

fn cli_err(message: impl ToString) -> StandardError {
    StandardError::new("ERR-CLI-001").interpolate_err(message.to_string())
}

async fn ledger() -> Result<SqlLedger> {
    let latency = LedgerLatency::from_millis(
        settings.ledger_append_latency_ms,
        settings.ledger_lookup_latency_ms,
    );
    SqlLedger::init(db_pool().await?, latency)
        .await
        .map_err(|e| StandardError::new("ERR-DB-000").interpolate_err(e.to_string()))
}

pub async fn digest(file: PathBuf) -> Result<()> {
    let hash = digest_file(&file).await.map_err(|e| cli_err(e))?;
    println!("{}", hash);
    Ok(())
}

pub async fn run(file: PathBuf, job: JobArgs, no_wallet: bool) -> Result<()> {
    let scorer = AiScorer::from_url(
        &settings.ai_key,
        &settings.ai_endpoint,
        &settings.ai_model,
        Duration::from_secs(settings.scoring_timeout_secs),
    )
    .map_err(|_| StandardError::new("ERR-AI-000"))?;
    let mut flow = VerificationFlow::new(Arc::new(scorer), Arc::new(ledger().await?));
    let mut wallet = WalletSession::disconnected();
    if !no_wallet {
        wallet.connect();
    }
    let job = match job.into_context() {
        Some(job) => Some(job.resolve().await),
        None => None,
    };

    let state = flow.analyze(Upload::File(file), job).await.map_err(cli_err)?;
    eprintln!("{}", state.status());
    if let FlowState::Error { failure, .. } = state {
        return Err(cli_err(failure));
    }
    if let Some(scored) = state.scored() {
        let analysis = serde_json::to_string_pretty(&scored.analysis).map_err(cli_err)?;
        eprintln!("{}", analysis);
    }

    let state = flow.submit(&wallet).await.map_err(cli_err)?;
    eprintln!("{}", state.status());
    match state {
        FlowState::Confirmed { record, .. } => {
            println!("{}", serde_json::to_string_pretty(record).map_err(cli_err)?);
            Ok(())
        }
        FlowState::AlreadyRecorded {
            resume_hash,
            signature,
        } => Err(cli_err(format!(
            "{} is already recorded as {}, run `lookup {}` to see it",
            resume_hash, signature, resume_hash
        ))),
        FlowState::Error { failure, .. } => Err(cli_err(failure)),
        other => Err(cli_err(format!("flow stopped while {}", other.stage()))),
    }
}

pub async fn lookup(resume_hash: String) -> Result<()> {
    let ledger = ledger().await?;
    let outcome = lookup::lookup(&ledger, &resume_hash)
        .await
        .map_err(cli_err)?;
    eprintln!("{}", outcome.message());
    if let LookupOutcome::Found { record } = &outcome {
        println!("{}", serde_json::to_string_pretty(record).map_err(cli_err)?);
    }
    Ok(())
}
