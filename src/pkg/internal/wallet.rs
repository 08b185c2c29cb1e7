use rand::{Rng, distr::Alphanumeric};
use serde::Serialize;

const ADDRESS_LEN: usize = 44;

/// Mock wallet connection gating ledger submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    address: Option<String>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        WalletSession::default()
    }

    pub fn connected_as(address: &str) -> Self {
        WalletSession {
            address: Some(address.to_string()),
        }
    }

    /// Connects with a freshly generated mock address. Connecting twice
    /// keeps the first address.
    pub fn connect(&mut self) -> &str {
        self.address.get_or_insert_with(|| {
            rand::rng()
                .sample_iter(&Alphanumeric)
                .take(ADDRESS_LEN)
                .map(char::from)
                .collect()
        })
    }

    pub fn disconnect(&mut self) {
        self.address = None;
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}
