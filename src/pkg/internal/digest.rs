//! Content digests used as ledger keys.

use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::VerifyError;

pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of the raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub async fn digest_file(path: &Path) -> Result<String, VerifyError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| VerifyError::Digest(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("hashing {} ({} bytes)", path.display(), data.len());
    Ok(sha256_hex(&data))
}

/// Canonical form of a lookup key.
pub fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

pub fn is_well_formed(hash: &str) -> bool {
    hash.len() == DIGEST_HEX_LEN
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
