use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    pkg::{
        internal::{
            adaptors::records::spec::VerificationRecord,
            digest::sha256_hex,
            error::VerifyError,
            lookup::{self, LookupOutcome},
        },
        server::{
            errors::{from_verify, record_not_found},
            state::AppState,
            upload::read_upload,
        },
    },
    prelude::Result,
};

const DEFAULT_RECENT: u32 = 20;
const MAX_RECENT: u32 = 100;

#[derive(Debug, Serialize)]
pub struct LookupView {
    #[serde(flatten)]
    pub outcome: LookupOutcome,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DigestView {
    pub file_name: String,
    pub size: usize,
    pub resume_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

fn respond(outcome: LookupOutcome) -> Result<Json<LookupView>> {
    match outcome {
        LookupOutcome::NotFound { .. } => Err(record_not_found()),
        found => Ok(Json(LookupView {
            message: found.message(),
            outcome: found,
        })),
    }
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(resume_hash): Path<String>,
) -> Result<Json<LookupView>> {
    let outcome = lookup::lookup(state.ledger.as_ref(), &resume_hash)
        .await
        .map_err(from_verify)?;
    respond(outcome)
}

pub async fn verify_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LookupView>> {
    let upload = read_upload(&mut multipart, state.max_upload_bytes).await?;
    let outcome = lookup::verify_document(state.ledger.as_ref(), &upload.document.content)
        .await
        .map_err(from_verify)?;
    respond(outcome)
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<VerificationRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    let records = state
        .ledger
        .recent(limit)
        .await
        .map_err(|e| from_verify(VerifyError::Lookup(e.to_string())))?;
    Ok(Json(records))
}

pub async fn digest(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<DigestView>> {
    let upload = read_upload(&mut multipart, state.max_upload_bytes).await?;
    let document = upload.document;
    Ok(Json(DigestView {
        resume_hash: sha256_hex(&document.content),
        size: document.len(),
        file_name: document.file_name,
    }))
}
