use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::types::ConfirmedResult;

/// Submission mode. Only sync is offered: the node runs `CheckTx` before answering, so a
/// rejected transaction is reported without polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastMode {
    Sync,
}

impl BroadcastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastMode::Sync => "BROADCAST_MODE_SYNC",
        }
    }
}

/// Read and submit access to a chain node.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Raw account JSON, or `None` when the chain has never seen the address.
    async fn get_account(&self, address: &str) -> Result<Option<Value>>;

    /// `None` while the transaction is not yet indexed.
    async fn get_tx(&self, hash: &str) -> Result<Option<ConfirmedResult>>;

    /// Gas used by a dry run of the transaction.
    async fn simulate(&self, tx_bytes: &[u8]) -> Result<u64>;

    async fn broadcast_tx(&self, tx_bytes: &[u8], mode: BroadcastMode) -> Result<ConfirmedResult>;
}
