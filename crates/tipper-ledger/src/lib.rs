//! Ledger gateway: sends a fixed-amount ERC-20 transfer and returns the
//! transaction hash once the node has accepted it for broadcast.
//!
//! Transactions are signed in process with a key decrypted from a V3
//! keystore; the node only ever sees the signed bytes. Nothing here waits
//! for confirmation.

pub mod erc20;
pub mod keystore;
pub mod rpc;
pub mod signer;
pub mod tx;

use async_trait::async_trait;

pub use rpc::{JsonRpcLedger, LedgerConfig};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("unreadable key material: {0}")]
    Keystore(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("ledger endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger rejected transfer ({code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed ledger response: {0}")]
    MalformedResponse(String),
}

/// Outbound transfer seam used by the dispatcher.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Request a transfer of `amount` base units to `to_address`.
    /// Returns the opaque transaction reference.
    async fn transfer(&self, to_address: &str, amount: u128) -> Result<String, LedgerError>;
}
