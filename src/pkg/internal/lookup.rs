//! Recruiter-side verification of a digest against the ledger.

use serde::Serialize;

use super::{
    adaptors::records::spec::VerificationRecord,
    digest::{is_well_formed, normalize, sha256_hex},
    error::VerifyError,
    ledger::Ledger,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found { record: VerificationRecord },
    NotFound { resume_hash: String },
}

impl LookupOutcome {
    pub fn message(&self) -> String {
        match self {
            LookupOutcome::Found { record } => format!(
                "Verified: {} scored {} on {}",
                record.resume_hash,
                record.ai_score,
                chrono::DateTime::from_timestamp_millis(record.timestamp)
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "an unknown date".into())
            ),
            LookupOutcome::NotFound { .. } => "Verification record not found. Ensure the resume was successfully stored on the ledger first.".into(),
        }
    }
}

/// Looks up a digest typed by a recruiter or handed over from the
/// candidate flow.
pub async fn lookup(ledger: &dyn Ledger, query: &str) -> Result<LookupOutcome, VerifyError> {
    let resume_hash = normalize(query);
    if resume_hash.is_empty() {
        return Ok(LookupOutcome::NotFound { resume_hash });
    }
    if !is_well_formed(&resume_hash) {
        tracing::warn!("{} is not a sha-256 digest, looking it up anyway", &resume_hash);
    }
    match ledger.lookup(&resume_hash).await {
        Ok(Some(record)) => Ok(LookupOutcome::Found { record }),
        Ok(None) => {
            tracing::info!("no ledger entry for {}", &resume_hash);
            Ok(LookupOutcome::NotFound { resume_hash })
        }
        Err(e) => {
            tracing::error!("ledger lookup failed: {}", &e);
            Err(VerifyError::Lookup(e.to_string()))
        }
    }
}

/// Recomputes the digest of a received resume and looks it up.
pub async fn verify_document(ledger: &dyn Ledger, content: &[u8]) -> Result<LookupOutcome, VerifyError> {
    lookup(ledger, &sha256_hex(content)).await
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::{
        ai::spec::ResumeAnalysis,
        testing::{ProbeLedger, memory_ledger},
    };

    fn analysis() -> ResumeAnalysis {
        ResumeAnalysis {
            score: 87,
            strengths: vec!["Go".into()],
            risk_flags: vec![],
            role_relevance: "Cloud".into(),
            experience_level: "Mid".into(),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_found_with_different_case_and_spaces() {
        let ledger = memory_ledger().await;
        let record = VerificationRecord::issue("abc123", analysis(), "w");
        ledger.append(&record).await.unwrap();
        let outcome = lookup(&ledger, "  ABC123  ").await.unwrap();
        assert_eq!(outcome, LookupOutcome::Found { record });
        assert!(outcome.message().starts_with("Verified: abc123 scored 87"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_never_submitted_is_not_found() {
        let ledger = memory_ledger().await;
        let outcome = lookup(&ledger, "ffff").await.unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::NotFound {
                resume_hash: "ffff".into()
            }
        );
        assert!(outcome.message().contains("not found"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_blank_query_skips_ledger() {
        let ledger = ProbeLedger::offline().await;
        assert!(matches!(
            lookup(ledger.as_ref(), "   ").await,
            Ok(LookupOutcome::NotFound { .. })
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transport_error_is_distinct() {
        let ledger = ProbeLedger::offline().await;
        let err = lookup(ledger.as_ref(), "abc123").await.unwrap_err();
        assert!(matches!(err, VerifyError::Lookup(_)));
        assert_eq!(err.status_message(), "Error connecting to ledger.");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_verify_document_recomputes_digest() {
        let ledger = memory_ledger().await;
        let content = b"Jane Doe\nSite Reliability Engineer";
        let record = VerificationRecord::issue(&sha256_hex(content), analysis(), "w");
        ledger.append(&record).await.unwrap();
        let outcome = verify_document(&ledger, content).await.unwrap();
        assert_eq!(outcome, LookupOutcome::Found { record });
        assert!(matches!(
            verify_document(&ledger, b"tampered").await.unwrap(),
            LookupOutcome::NotFound { .. }
        ));
    }
}
