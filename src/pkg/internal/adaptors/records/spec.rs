use std::fmt;

use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::pkg::internal::{ai::spec::ResumeAnalysis, digest::normalize, error::LedgerError};

const TOKEN_LEN: usize = 88;

/// Opaque confirmation handed back by the ledger for an append.
///
/// It identifies the ledger entry; it is not a verifiable signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    pub fn new(token: impl Into<String>) -> Self {
        ConfirmationToken(token.into())
    }

    pub fn mock() -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect::<String>();
        ConfirmationToken(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub resume_hash: String,
    pub ai_score: u32,
    pub wallet_address: String,
    /// milliseconds since the unix epoch
    pub timestamp: i64,
    pub signature: ConfirmationToken,
    pub details: ResumeAnalysis,
}

impl VerificationRecord {
    /// New record stamped with the current time and a fresh token.
    pub fn issue(resume_hash: &str, analysis: ResumeAnalysis, wallet_address: &str) -> Self {
        VerificationRecord {
            resume_hash: normalize(resume_hash),
            ai_score: analysis.score,
            wallet_address: wallet_address.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            signature: ConfirmationToken::mock(),
            details: analysis,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RecordEntry {
    pub id: i64,
    pub resume_hash: String,
    pub ai_score: i64,
    pub wallet_address: String,
    pub timestamp: i64,
    pub signature: String,
    pub details: String,
}

impl TryFrom<RecordEntry> for VerificationRecord {
    type Error = LedgerError;

    fn try_from(row: RecordEntry) -> Result<Self, Self::Error> {
        let details: ResumeAnalysis = serde_json::from_str(&row.details)
            .map_err(|e| LedgerError::Corrupt(format!("entry {}: {}", row.id, e)))?;
        let ai_score = u32::try_from(row.ai_score)
            .map_err(|_| LedgerError::Corrupt(format!("entry {}: score {}", row.id, row.ai_score)))?;
        Ok(VerificationRecord {
            resume_hash: row.resume_hash,
            ai_score,
            wallet_address: row.wallet_address,
            timestamp: row.timestamp,
            signature: ConfirmationToken::new(row.signature),
            details,
        })
    }
}
