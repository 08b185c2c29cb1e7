//! Candidate-side verification flow: hash, score, review, submit.
//!
//! [`FlowState::transition`] is the whole state machine and performs no I/O;
//! [`VerificationFlow`] drives it against a scorer and a ledger.

use std::{fmt, path::PathBuf, sync::Arc};

use serde::Serialize;
use thiserror::Error;

use super::{
    adaptors::records::spec::{ConfirmationToken, VerificationRecord},
    ai::{
        score::MeritScorer,
        spec::{Document, JobContext, ResumeAnalysis},
    },
    digest::sha256_hex,
    error::{LedgerError, VerifyError},
    ledger::Ledger,
    wallet::WalletSession,
};

/// Where the resume bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upload {
    File(PathBuf),
    Inline(Document),
}

/// Digest and evaluation of a resume, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredResume {
    pub resume_hash: String,
    pub analysis: ResumeAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Hashing,
    Scoring,
    ReadyToSubmit,
    Submitting,
    Confirmed,
    AlreadyRecorded,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Hashing => "hashing",
            Stage::Scoring => "scoring",
            Stage::ReadyToSubmit => "ready_to_submit",
            Stage::Submitting => "submitting",
            Stage::Confirmed => "confirmed",
            Stage::AlreadyRecorded => "already_recorded",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Hashing {
        upload: Upload,
        job: Option<JobContext>,
    },
    Scoring {
        resume_hash: String,
        document: Document,
        job: Option<JobContext>,
    },
    ReadyToSubmit(ScoredResume),
    Submitting(ScoredResume),
    Confirmed {
        record: VerificationRecord,
        confirmation: ConfirmationToken,
    },
    /// The ledger already holds a record for this digest; nothing new was
    /// appended.
    AlreadyRecorded {
        resume_hash: String,
        signature: ConfirmationToken,
    },
    /// `retained` survives a failed submission so it can be retried
    /// without scoring again.
    Error {
        failure: VerifyError,
        retained: Option<ScoredResume>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Analyze {
        upload: Upload,
        job: Option<JobContext>,
    },
    Digested(Result<(String, Document), VerifyError>),
    Scored(Result<ResumeAnalysis, VerifyError>),
    Submit {
        wallet_connected: bool,
    },
    Appended(Result<(VerificationRecord, ConfirmationToken), VerifyError>),
    Duplicate {
        resume_hash: String,
        signature: ConfirmationToken,
    },
    Reset,
}

impl FlowEvent {
    fn name(&self) -> &'static str {
        match self {
            FlowEvent::Analyze { .. } => "analyze",
            FlowEvent::Digested(_) => "digested",
            FlowEvent::Scored(_) => "scored",
            FlowEvent::Submit { .. } => "submit",
            FlowEvent::Appended(_) => "appended",
            FlowEvent::Duplicate { .. } => "duplicate",
            FlowEvent::Reset => "reset",
        }
    }
}

/// A request the flow refuses without failing; the state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowRejection {
    #[error("connect a wallet before submitting to the ledger")]
    WalletNotConnected,

    #[error("a {stage} step is still in flight")]
    Busy { stage: Stage },

    #[error("nothing to submit while {stage}")]
    NothingToSubmit { stage: Stage },

    #[error("{event} is not expected while {stage}")]
    Unexpected { stage: Stage, event: &'static str },

    #[error("the step was overtaken by a reset or a newer request, flow is {stage}")]
    Superseded { stage: Stage },
}

impl FlowState {
    pub fn stage(&self) -> Stage {
        match self {
            FlowState::Idle => Stage::Idle,
            FlowState::Hashing { .. } => Stage::Hashing,
            FlowState::Scoring { .. } => Stage::Scoring,
            FlowState::ReadyToSubmit(_) => Stage::ReadyToSubmit,
            FlowState::Submitting(_) => Stage::Submitting,
            FlowState::Confirmed { .. } => Stage::Confirmed,
            FlowState::AlreadyRecorded { .. } => Stage::AlreadyRecorded,
            FlowState::Error { .. } => Stage::Error,
        }
    }

    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            FlowState::Hashing { .. } | FlowState::Scoring { .. } | FlowState::Submitting(_)
        )
    }

    /// Status line shown to the candidate.
    pub fn status(&self) -> &'static str {
        match self {
            FlowState::Idle => "Select a resume to analyze",
            FlowState::Hashing { .. } => "Hashing Resume...",
            FlowState::Scoring { .. } => "AI Analysis in progress...",
            FlowState::ReadyToSubmit(_) => "Analysis Complete",
            FlowState::Submitting(_) => "Confirming in Wallet...",
            FlowState::Confirmed { .. } => "Confirmed on ledger!",
            FlowState::AlreadyRecorded { .. } => "This resume is already recorded on the ledger.",
            FlowState::Error { failure, .. } => failure.status_message(),
        }
    }

    pub fn scored(&self) -> Option<&ScoredResume> {
        match self {
            FlowState::ReadyToSubmit(s) | FlowState::Submitting(s) => Some(s),
            FlowState::Error { retained, .. } => retained.as_ref(),
            _ => None,
        }
    }

    pub fn transition(&self, event: FlowEvent) -> Result<FlowState, FlowRejection> {
        let stage = self.stage();
        match (self, event) {
            (_, FlowEvent::Reset) => Ok(FlowState::Idle),

            (state, FlowEvent::Analyze { .. }) if state.in_flight() => {
                Err(FlowRejection::Busy { stage })
            }
            (_, FlowEvent::Analyze { upload, job }) => Ok(FlowState::Hashing { upload, job }),

            (FlowState::Hashing { job, .. }, FlowEvent::Digested(Ok((resume_hash, document)))) => {
                Ok(FlowState::Scoring {
                    resume_hash,
                    document,
                    job: job.clone(),
                })
            }
            (FlowState::Hashing { .. }, FlowEvent::Digested(Err(failure))) => Ok(FlowState::Error {
                failure,
                retained: None,
            }),

            (FlowState::Scoring { resume_hash, .. }, FlowEvent::Scored(Ok(analysis))) => {
                Ok(FlowState::ReadyToSubmit(ScoredResume {
                    resume_hash: resume_hash.clone(),
                    analysis,
                }))
            }
            (FlowState::Scoring { .. }, FlowEvent::Scored(Err(failure))) => Ok(FlowState::Error {
                failure,
                retained: None,
            }),

            (
                FlowState::ReadyToSubmit(scored)
                | FlowState::Error {
                    retained: Some(scored),
                    ..
                },
                FlowEvent::Submit { wallet_connected },
            ) => {
                if !wallet_connected {
                    return Err(FlowRejection::WalletNotConnected);
                }
                Ok(FlowState::Submitting(scored.clone()))
            }
            (state, FlowEvent::Submit { .. }) if state.in_flight() => {
                Err(FlowRejection::Busy { stage })
            }
            (_, FlowEvent::Submit { .. }) => Err(FlowRejection::NothingToSubmit { stage }),

            (FlowState::Submitting(_), FlowEvent::Appended(Ok((record, confirmation)))) => {
                Ok(FlowState::Confirmed {
                    record,
                    confirmation,
                })
            }
            (
                FlowState::Submitting(_),
                FlowEvent::Duplicate {
                    resume_hash,
                    signature,
                },
            ) => Ok(FlowState::AlreadyRecorded {
                resume_hash,
                signature,
            }),
            (FlowState::Submitting(scored), FlowEvent::Appended(Err(failure))) => {
                Ok(FlowState::Error {
                    failure,
                    retained: Some(scored.clone()),
                })
            }

            (_, event) => Err(FlowRejection::Unexpected {
                stage,
                event: event.name(),
            }),
        }
    }
}

/// Reads (for a path) and hashes an upload. An empty document is a
/// digest failure.
pub async fn hash_upload(upload: &Upload) -> Result<(String, Document), VerifyError> {
    let document = match upload {
        Upload::File(path) => Document::read(path).await?,
        Upload::Inline(document) => document.clone(),
    };
    if document.is_empty() {
        return Err(VerifyError::Digest(format!("{} is empty", document.file_name)));
    }
    Ok((sha256_hex(&document.content), document))
}

/// Document and job context waiting for the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingScore {
    pub document: Document,
    pub job: Option<JobContext>,
}

/// One candidate's run through the pipeline.
///
/// Each slow step is split into a `begin_*` call that hands out an attempt
/// number and a `finish_*` call that takes the step's result. The work in
/// between needs no access to the flow, so a caller sharing it behind a
/// lock can release the lock meanwhile. A finish whose attempt was reset or
/// replaced is refused with [`FlowRejection::Superseded`].
pub struct VerificationFlow {
    scorer: Arc<dyn MeritScorer>,
    ledger: Arc<dyn Ledger>,
    state: FlowState,
    attempt: u64,
}

impl VerificationFlow {
    pub fn new(scorer: Arc<dyn MeritScorer>, ledger: Arc<dyn Ledger>) -> Self {
        VerificationFlow {
            scorer,
            ledger,
            state: FlowState::Idle,
            attempt: 0,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn scorer(&self) -> Arc<dyn MeritScorer> {
        self.scorer.clone()
    }

    pub fn ledger(&self) -> Arc<dyn Ledger> {
        self.ledger.clone()
    }

    fn apply(&mut self, event: FlowEvent) -> Result<(), FlowRejection> {
        let next = self.state.transition(event)?;
        tracing::debug!("flow {} -> {}", self.state.stage(), next.stage());
        match &next {
            FlowState::Error { failure, .. } => {
                tracing::error!("verification step failed: {}", failure);
            }
            FlowState::AlreadyRecorded {
                resume_hash,
                signature,
            } => {
                tracing::warn!("{} is already recorded as {}", resume_hash, signature);
            }
            _ => {}
        }
        self.state = next;
        Ok(())
    }

    fn current(&self, attempt: u64) -> Result<(), FlowRejection> {
        if attempt != self.attempt {
            return Err(FlowRejection::Superseded {
                stage: self.state.stage(),
            });
        }
        Ok(())
    }

    /// Moves to `Hashing` and returns the attempt number along with the
    /// upload to hash.
    pub fn begin_analysis(
        &mut self,
        upload: Upload,
        job: Option<JobContext>,
    ) -> Result<(u64, Upload), FlowRejection> {
        self.apply(FlowEvent::Analyze {
            upload: upload.clone(),
            job,
        })?;
        self.attempt += 1;
        Ok((self.attempt, upload))
    }

    /// Takes the digest result; returns what to score when hashing worked.
    pub fn finish_hashing(
        &mut self,
        attempt: u64,
        digested: Result<(String, Document), VerifyError>,
    ) -> Result<Option<PendingScore>, FlowRejection> {
        self.current(attempt)?;
        self.apply(FlowEvent::Digested(digested))?;
        match &self.state {
            FlowState::Scoring { document, job, .. } => {
                tracing::info!("{} hashed, requesting analysis", &document.file_name);
                Ok(Some(PendingScore {
                    document: document.clone(),
                    job: job.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn finish_scoring(
        &mut self,
        attempt: u64,
        scored: Result<ResumeAnalysis, VerifyError>,
    ) -> Result<(), FlowRejection> {
        self.current(attempt)?;
        self.apply(FlowEvent::Scored(scored))
    }

    /// Moves to `Submitting` and returns the record to append. Refused
    /// without a connected wallet.
    pub fn begin_submission(
        &mut self,
        wallet: &WalletSession,
    ) -> Result<(u64, VerificationRecord), FlowRejection> {
        let address = wallet.address();
        self.apply(FlowEvent::Submit {
            wallet_connected: address.is_some(),
        })?;
        let FlowState::Submitting(scored) = &self.state else {
            return Err(FlowRejection::Unexpected {
                stage: self.state.stage(),
                event: "submit",
            });
        };
        let record = VerificationRecord::issue(
            &scored.resume_hash,
            scored.analysis.clone(),
            address.unwrap_or_default(),
        );
        self.attempt += 1;
        Ok((self.attempt, record))
    }

    pub fn finish_submission(
        &mut self,
        attempt: u64,
        record: VerificationRecord,
        appended: Result<ConfirmationToken, LedgerError>,
    ) -> Result<(), FlowRejection> {
        self.current(attempt)?;
        let event = match appended {
            Ok(confirmation) => {
                let mut record = record;
                record.signature = confirmation.clone();
                FlowEvent::Appended(Ok((record, confirmation)))
            }
            Err(LedgerError::Duplicate {
                resume_hash,
                signature,
            }) => FlowEvent::Duplicate {
                resume_hash,
                signature: ConfirmationToken::new(signature),
            },
            Err(e) => FlowEvent::Appended(Err(VerifyError::Submission(e.to_string()))),
        };
        self.apply(event)
    }

    /// Hashes and scores a resume. Failures land in [`FlowState::Error`];
    /// only a refused request is returned as `Err`.
    pub async fn analyze(
        &mut self,
        upload: Upload,
        job: Option<JobContext>,
    ) -> Result<&FlowState, FlowRejection> {
        let (attempt, upload) = self.begin_analysis(upload, job)?;
        let digested = hash_upload(&upload).await;
        if let Some(pending) = self.finish_hashing(attempt, digested)? {
            let scored = self.scorer.score(&pending.document, pending.job.as_ref()).await;
            self.finish_scoring(attempt, scored)?;
        }
        Ok(&self.state)
    }

    /// Records the reviewed analysis on the ledger. Refused without a
    /// connected wallet, in which case the ledger is not contacted.
    pub async fn submit(&mut self, wallet: &WalletSession) -> Result<&FlowState, FlowRejection> {
        let (attempt, record) = self.begin_submission(wallet)?;
        let appended = self.ledger.append(&record).await;
        self.finish_submission(attempt, record, appended)?;
        Ok(&self.state)
    }

    pub fn reset(&mut self) {
        tracing::debug!("flow reset from {}", self.state.stage());
        self.attempt += 1;
        self.state = FlowState::Idle;
    }
}
