//! Broadcast with confirmation polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{CosmosError, Result};
use crate::network::NetworkProfile;
use crate::query::{BroadcastMode, LedgerQuery};
use crate::types::{ConfirmedResult, SignedTx};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ConfirmConfig {
    pub fn from_profile(profile: &NetworkProfile) -> Self {
        Self {
            timeout: profile.confirm_timeout(),
            ..Self::default()
        }
    }
}

pub struct Broadcaster {
    ledger: Arc<dyn LedgerQuery>,
    config: ConfirmConfig,
}

impl Broadcaster {
    pub fn new(ledger: Arc<dyn LedgerQuery>, config: ConfirmConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> ConfirmConfig {
        self.config
    }

    /// Submit a signed transaction and wait until it is included in a block.
    ///
    /// A rejection at submit time is final and never retried. A
    /// [`CosmosError::ConfirmationTimeout`] means the outcome is unknown.
    pub async fn broadcast(&self, tx: &SignedTx) -> Result<ConfirmedResult> {
        let tx_bytes = tx.to_bytes();
        let local_hash = tx.hash();

        let submitted = self
            .ledger
            .broadcast_tx(&tx_bytes, BroadcastMode::Sync)
            .await?;
        let hash = if submitted.transaction_hash.is_empty() {
            local_hash
        } else {
            if !submitted.transaction_hash.eq_ignore_ascii_case(&local_hash) {
                log::warn!(
                    "Node returned tx hash {} but the local hash is {}",
                    submitted.transaction_hash,
                    local_hash
                );
            }
            submitted.transaction_hash.clone()
        };
        if !submitted.is_success() {
            log::warn!("Transaction {} rejected at submission: {}", hash, submitted.raw_log);
            return Err(CosmosError::TransactionRejected {
                hash,
                code: submitted.code,
                raw_log: submitted.raw_log,
            });
        }

        log::info!("Transaction {} submitted, waiting for confirmation", hash);
        self.confirm(&hash).await
    }

    /// Poll for `hash` until it is found or the timeout clock fires.
    pub async fn confirm(&self, hash: &str) -> Result<ConfirmedResult> {
        let started = Instant::now();
        let timed_out = Arc::new(AtomicBool::new(false));
        let clock = {
            let timed_out = timed_out.clone();
            let timeout = self.config.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                timed_out.store(true, Ordering::SeqCst);
            })
        };

        let outcome = loop {
            if timed_out.load(Ordering::SeqCst) {
                let elapsed = started.elapsed();
                log::warn!("Gave up waiting for {} after {:?}", hash, elapsed);
                break Err(CosmosError::ConfirmationTimeout {
                    hash: hash.to_string(),
                    elapsed,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
            match self.ledger.get_tx(hash).await {
                Ok(Some(result)) if result.is_success() => {
                    log::info!("Transaction {} confirmed at height {}", hash, result.height);
                    break Ok(result);
                }
                Ok(Some(result)) => {
                    break Err(CosmosError::TransactionRejected {
                        hash: hash.to_string(),
                        code: result.code,
                        raw_log: result.raw_log,
                    });
                }
                Ok(None) => log::debug!("Transaction {} not found yet", hash),
                Err(e) => log::debug!("Polling for {} failed: {}", hash, e),
            }
        };

        clock.abort();
        outcome
    }
}
