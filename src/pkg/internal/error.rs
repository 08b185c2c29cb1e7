//! Failure taxonomy of the verification pipeline.

use thiserror::Error;

/// A failed step of the candidate or recruiter flow.
///
/// Every variant is fatal to the attempt that produced it; nothing is
/// retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The document could not be read or hashed
    #[error("digest failed: {0}")]
    Digest(String),

    /// The scoring service failed or answered outside the schema
    #[error("analysis failed: {0}")]
    Scoring(String),

    /// The ledger did not confirm the append
    #[error("submission failed: {0}")]
    Submission(String),

    /// The ledger could not be reached during a lookup
    #[error("could not reach ledger: {0}")]
    Lookup(String),
}

impl VerifyError {
    /// Short text shown to the user in place of the technical detail.
    pub fn status_message(&self) -> &'static str {
        match self {
            VerifyError::Digest(_) => "Processing failed. Please check file format.",
            VerifyError::Scoring(_) => "Analysis failed. Please try again.",
            VerifyError::Submission(_) => "Transaction failed.",
            VerifyError::Lookup(_) => "Error connecting to ledger.",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::Digest(_) => "digest_failure",
            VerifyError::Scoring(_) => "scoring_failure",
            VerifyError::Submission(_) => "submission_failure",
            VerifyError::Lookup(_) => "lookup_failure",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            VerifyError::Digest(d)
            | VerifyError::Scoring(d)
            | VerifyError::Submission(d)
            | VerifyError::Lookup(d) => d,
        }
    }
}

/// Errors raised by a ledger backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The store could not be reached or the write did not complete
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// A record for this digest is already confirmed
    #[error("record for {resume_hash} already confirmed as {signature}")]
    Duplicate {
        resume_hash: String,
        signature: String,
    },

    /// A stored row could not be decoded back into a record
    #[error("corrupt ledger entry: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_are_distinct() {
        let errors = [
            VerifyError::Digest("x".into()),
            VerifyError::Scoring("x".into()),
            VerifyError::Submission("x".into()),
            VerifyError::Lookup("x".into()),
        ];
        let mut messages: Vec<_> = errors.iter().map(|e| e.status_message()).collect();
        messages.dedup();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_display_keeps_detail() {
        let e = VerifyError::Scoring("expected value at line 1".into());
        assert_eq!(e.to_string(), "analysis failed: expected value at line 1");
        assert_eq!(e.detail(), "expected value at line 1");
        assert_eq!(e.kind(), "scoring_failure");
    }
}
