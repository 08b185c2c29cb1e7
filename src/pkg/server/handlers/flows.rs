use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    pkg::{
        internal::{
            adaptors::records::spec::{ConfirmationToken, VerificationRecord},
            ai::spec::ResumeAnalysis,
            flow::{FlowState, Stage, Upload, hash_upload},
        },
        server::{
            errors::{flow_not_found, from_rejection},
            state::{AppState, FlowSession},
            upload::read_upload,
        },
    },
    prelude::Result,
};

#[derive(Debug, Serialize)]
pub struct FailureView {
    pub kind: &'static str,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct FlowView {
    pub flow_id: Uuid,
    pub stage: Stage,
    pub status: &'static str,
    pub wallet_address: Option<String>,
    pub resume_hash: Option<String>,
    pub analysis: Option<ResumeAnalysis>,
    pub record: Option<VerificationRecord>,
    pub confirmation: Option<ConfirmationToken>,
    pub verify_url: Option<String>,
    pub failure: Option<FailureView>,
}

impl FlowView {
    fn new(state: &AppState, flow_id: Uuid, session: &FlowSession) -> Self {
        let flow_state = session.flow.state();
        let mut view = FlowView {
            flow_id,
            stage: flow_state.stage(),
            status: flow_state.status(),
            wallet_address: session.wallet.address().map(String::from),
            resume_hash: None,
            analysis: None,
            record: None,
            confirmation: None,
            verify_url: None,
            failure: None,
        };
        if let Some(scored) = flow_state.scored() {
            view.resume_hash = Some(scored.resume_hash.clone());
            view.analysis = Some(scored.analysis.clone());
        }
        match flow_state {
            FlowState::Scoring { resume_hash, .. } => {
                view.resume_hash = Some(resume_hash.clone());
            }
            FlowState::Confirmed {
                record,
                confirmation,
            } => {
                view.resume_hash = Some(record.resume_hash.clone());
                view.analysis = Some(record.details.clone());
                view.verify_url = Some(state.verify_url(&record.resume_hash));
                view.record = Some(record.clone());
                view.confirmation = Some(confirmation.clone());
            }
            FlowState::AlreadyRecorded {
                resume_hash,
                signature,
            } => {
                view.resume_hash = Some(resume_hash.clone());
                view.confirmation = Some(signature.clone());
                view.verify_url = Some(state.verify_url(resume_hash));
            }
            FlowState::Error { failure, .. } => {
                view.failure = Some(FailureView {
                    kind: failure.kind(),
                    detail: failure.detail().to_string(),
                });
            }
            _ => {}
        }
        view
    }
}

pub async fn create(State(state): State<AppState>) -> Result<Json<FlowView>> {
    let (flow_id, session) = state.open_flow().await;
    let session = session.lock().await;
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let session = session.lock().await;
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn close(State(state): State<AppState>, Path(flow_id): Path<Uuid>) -> Result<StatusCode> {
    if !state.close_flow(flow_id).await {
        return Err(flow_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Hashes and scores the uploaded resume. The session is only locked to
/// move between stages, so the flow can be polled while a step runs.
pub async fn analyze(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let form = read_upload(&mut multipart, state.max_upload_bytes).await?;
    let job = match form.job {
        Some(job) => Some(job.resolve().await),
        None => None,
    };

    let (attempt, upload, scorer) = {
        let mut session = session.lock().await;
        let (attempt, upload) = session
            .flow
            .begin_analysis(Upload::Inline(form.document), job)
            .map_err(from_rejection)?;
        (attempt, upload, session.flow.scorer())
    };
    let digested = hash_upload(&upload).await;
    let pending = session
        .lock()
        .await
        .flow
        .finish_hashing(attempt, digested)
        .map_err(from_rejection)?;
    if let Some(pending) = pending {
        let scored = scorer.score(&pending.document, pending.job.as_ref()).await;
        session
            .lock()
            .await
            .flow
            .finish_scoring(attempt, scored)
            .map_err(from_rejection)?;
    }

    let session = session.lock().await;
    tracing::info!("flow {} is {}", flow_id, session.flow.state().stage());
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn connect_wallet(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let mut session = session.lock().await;
    let address = session.wallet.connect().to_string();
    tracing::debug!("flow {} connected wallet {}", flow_id, &address);
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn disconnect_wallet(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let mut session = session.lock().await;
    session.wallet.disconnect();
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let (attempt, record, ledger) = {
        let mut session = session.lock().await;
        let FlowSession { flow, wallet } = &mut *session;
        let (attempt, record) = flow.begin_submission(wallet).map_err(from_rejection)?;
        (attempt, record, flow.ledger())
    };
    let appended = ledger.append(&record).await;
    let mut session = session.lock().await;
    session
        .flow
        .finish_submission(attempt, record, appended)
        .map_err(from_rejection)?;
    tracing::info!("flow {} is {}", flow_id, session.flow.state().stage());
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>> {
    let session = state.flow(flow_id).await.ok_or_else(flow_not_found)?;
    let mut session = session.lock().await;
    session.flow.reset();
    Ok(Json(FlowView::new(&state, flow_id, &session)))
}
