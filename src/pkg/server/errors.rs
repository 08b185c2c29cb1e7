use axum::http::StatusCode;
use standard_error::{Interpolate, StandardError, Status};

use crate::pkg::internal::{error::VerifyError, flow::FlowRejection};

pub fn from_verify(e: VerifyError) -> StandardError {
    let (code, status) = match &e {
        VerifyError::Digest(_) => ("ERR-DIGEST-001", StatusCode::BAD_REQUEST),
        VerifyError::Scoring(_) => ("ERR-SCORE-001", StatusCode::BAD_GATEWAY),
        VerifyError::Submission(_) => ("ERR-SUBMIT-001", StatusCode::BAD_GATEWAY),
        VerifyError::Lookup(_) => ("ERR-LEDGER-001", StatusCode::SERVICE_UNAVAILABLE),
    };
    StandardError::new(code)
        .interpolate_err(e.detail().to_string())
        .code(status)
}

pub fn from_rejection(r: FlowRejection) -> StandardError {
    tracing::warn!("flow request refused: {}", &r);
    match r {
        FlowRejection::WalletNotConnected => {
            StandardError::new("ERR-WALLET-001").code(StatusCode::CONFLICT)
        }
        other => StandardError::new("ERR-FLOW-409")
            .interpolate_err(other.to_string())
            .code(StatusCode::CONFLICT),
    }
}

pub fn flow_not_found() -> StandardError {
    StandardError::new("ERR-FLOW-404").code(StatusCode::NOT_FOUND)
}

pub fn record_not_found() -> StandardError {
    StandardError::new("ERR-LEDGER-404").code(StatusCode::NOT_FOUND)
}
