//! High level entry point tying account lookup, fees, signing and broadcast together.

use std::sync::Arc;

use crate::account::resolve_account;
use crate::amino::AminoTable;
use crate::broadcast::{Broadcaster, ConfirmConfig};
use crate::decimal::Decimal;
use crate::device::SigningDevice;
use crate::errors::{CosmosError, Result};
use crate::fee::{self, GasPrice, SIMULATION_GAS_LIMIT};
use crate::network::NetworkProfile;
use crate::query::LedgerQuery;
use crate::registry::MessageRegistry;
use crate::signing::{SignOutcome, SigningOrchestrator};
use crate::types::{Account, ConfirmedResult, Fee, Message, SignedTx};

pub struct SigningClient {
    profile: Arc<NetworkProfile>,
    ledger: Arc<dyn LedgerQuery>,
    orchestrator: SigningOrchestrator,
    broadcaster: Broadcaster,
    default_gas_price: GasPrice,
    gas_multiplier: Decimal,
}

impl SigningClient {
    /// Client with the default Cosmos SDK message set.
    pub fn new(
        profile: NetworkProfile,
        ledger: Arc<dyn LedgerQuery>,
        device: Arc<dyn SigningDevice>,
    ) -> Result<Self> {
        Self::with_registry(profile, Arc::new(MessageRegistry::with_defaults()), ledger, device)
    }

    pub fn with_registry(
        profile: NetworkProfile,
        registry: Arc<MessageRegistry>,
        ledger: Arc<dyn LedgerQuery>,
        device: Arc<dyn SigningDevice>,
    ) -> Result<Self> {
        let table = Arc::new(AminoTable::with_defaults(registry));
        Self::with_table(profile, table, ledger, device)
    }

    pub fn with_table(
        profile: NetworkProfile,
        table: Arc<AminoTable>,
        ledger: Arc<dyn LedgerQuery>,
        device: Arc<dyn SigningDevice>,
    ) -> Result<Self> {
        profile.validate()?;
        let profile = Arc::new(profile);
        let orchestrator = SigningOrchestrator::new(profile.clone(), table, device)?;
        let broadcaster = Broadcaster::new(ledger.clone(), ConfirmConfig::from_profile(&profile));
        log::info!(
            "Signing client ready for {} ({})",
            profile.chain_id,
            profile.chain_name
        );
        Ok(Self {
            default_gas_price: profile.default_gas_price(),
            gas_multiplier: fee::default_gas_multiplier(),
            profile,
            ledger,
            orchestrator,
            broadcaster,
        })
    }

    pub fn with_default_gas_price(mut self, gas_price: GasPrice) -> Self {
        self.default_gas_price = gas_price;
        self
    }

    pub fn with_gas_multiplier(mut self, multiplier: Decimal) -> Self {
        self.gas_multiplier = multiplier;
        self
    }

    pub fn with_confirm_config(mut self, config: ConfirmConfig) -> Self {
        self.broadcaster = Broadcaster::new(self.ledger.clone(), config);
        self
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub fn orchestrator(&self) -> &SigningOrchestrator {
        &self.orchestrator
    }

    pub async fn get_account(&self, address: &str) -> Result<Account> {
        let raw = self.ledger.get_account(address).await?;
        resolve_account(address, raw)
    }

    pub fn calculate_fee(&self, gas_limit: u64, gas_price: &GasPrice) -> Result<Fee> {
        fee::calculate_fee(gas_limit, gas_price)
    }

    pub fn get_fee(&self, gas: Option<u64>, gas_price: Option<&GasPrice>) -> Result<Fee> {
        fee::get_fee(gas, gas_price, &self.default_gas_price)
    }

    /// Estimated gas limit for `msgs`, scaled by the client's gas multiplier.
    pub async fn simulate(&self, address: &str, msgs: &[Message], memo: &str) -> Result<u64> {
        self.simulate_with_multiplier(address, msgs, memo, &self.gas_multiplier)
            .await
    }

    #[tracing::instrument(skip_all, fields(chain_id = %self.profile.chain_id, address = %address))]
    pub async fn simulate_with_multiplier(
        &self,
        address: &str,
        msgs: &[Message],
        memo: &str,
        multiplier: &Decimal,
    ) -> Result<u64> {
        let account = self.get_account(address).await?;
        let fee = self.get_fee(Some(SIMULATION_GAS_LIMIT), None)?;
        let tx = self.orchestrator.simulate(&account, msgs, &fee, memo).await?;
        let gas_used = self
            .ledger
            .simulate(&tx.to_bytes())
            .await
            .map_err(|e| match e {
                CosmosError::Transport(reason) => CosmosError::SimulationFailed(reason),
                other => other,
            })?;
        let gas = fee::apply_gas_multiplier(gas_used, multiplier)?;
        log::debug!("Simulation used {} gas, estimating {}", gas_used, gas);
        Ok(gas)
    }

    /// Sign against freshly fetched account state.
    #[tracing::instrument(skip_all, fields(chain_id = %self.profile.chain_id, address = %address))]
    pub async fn sign(
        &self,
        address: &str,
        msgs: &[Message],
        fee: &Fee,
        memo: &str,
    ) -> Result<SignOutcome> {
        let account = self.get_account(address).await?;
        self.orchestrator.sign(&account, msgs, fee, memo).await
    }

    #[tracing::instrument(skip_all, fields(chain_id = %self.profile.chain_id))]
    pub async fn broadcast(&self, tx: &SignedTx) -> Result<ConfirmedResult> {
        self.broadcaster.broadcast(tx).await
    }

    /// Simulates when no gas is given, then signs and broadcasts.
    pub async fn sign_and_broadcast(
        &self,
        address: &str,
        msgs: &[Message],
        gas: Option<u64>,
        gas_price: Option<&GasPrice>,
        memo: &str,
    ) -> Result<ConfirmedResult> {
        let gas = match gas {
            Some(gas) if gas > 0 => gas,
            _ => self.simulate(address, msgs, memo).await?,
        };
        let fee = self.get_fee(Some(gas), gas_price)?;
        let outcome = self.sign(address, msgs, &fee, memo).await?;
        if let Some(reason) = &outcome.legacy_fallback_reason {
            log::info!("Signed in {} mode because: {}", outcome.mode, reason);
        }
        self.broadcast(&outcome.tx).await
    }
}
