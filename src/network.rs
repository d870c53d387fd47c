//! Per-chain configuration.
//!
//! A [`NetworkProfile`] is loaded once when a client is built and only read afterwards.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use cosmrs::AccountId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amino::compile_prevent_list;
use crate::decimal::Decimal;
use crate::errors::{CosmosError, Result};
use crate::fee::GasPrice;

pub const DEFAULT_COIN_TYPE: u32 = 118;
pub const ETHERMINT_COIN_TYPE: u32 = 60;
pub const DEFAULT_DECIMALS: u32 = 6;

/// Ceiling applied when a profile leaves the tx timeout at zero.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(60);

pub const INJECTIVE_PUBKEY_TYPE_URL: &str = "/injective.crypto.v1beta1.ethsecp256k1.PubKey";

const COSMOS_DIRECTORY_REST: &str = "https://rest.cosmos.directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPriceLevel {
    Low,
    Average,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceStep {
    pub low: Decimal,
    pub average: Decimal,
    pub high: Decimal,
}

impl Default for GasPriceStep {
    fn default() -> Self {
        Self {
            low: Decimal::permille(10),
            average: Decimal::permille(25),
            high: Decimal::permille(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(alias = "chain_name")]
    pub chain_name: String,
    #[serde(default)]
    pub pretty_name: String,
    pub chain_id: String,
    pub prefix: String,
    pub denom: String,
    #[serde(default)]
    pub rest_url: String,
    #[serde(default = "default_coin_type", alias = "slip44")]
    pub coin_type: u32,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Milliseconds to wait for confirmation; zero selects [`DEFAULT_TX_TIMEOUT`].
    #[serde(default)]
    pub tx_timeout: u64,
    #[serde(default)]
    pub gas_price_step: GasPriceStep,
    #[serde(default)]
    pub authz_amino_support: bool,
    #[serde(default)]
    pub authz_amino_generic_only: bool,
    #[serde(default)]
    pub authz_amino_exec_prevent_types: Vec<String>,
    #[serde(default)]
    pub amino_prevent_types: Vec<String>,
    #[serde(default)]
    pub authz_amino_lifted_values: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey_type_url: Option<String>,
}

fn default_coin_type() -> u32 {
    DEFAULT_COIN_TYPE
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

impl NetworkProfile {
    pub fn new(
        chain_name: impl Into<String>,
        chain_id: impl Into<String>,
        prefix: impl Into<String>,
        denom: impl Into<String>,
    ) -> Self {
        Self {
            chain_name: chain_name.into(),
            pretty_name: String::new(),
            chain_id: chain_id.into(),
            prefix: prefix.into(),
            denom: denom.into(),
            rest_url: String::new(),
            coin_type: DEFAULT_COIN_TYPE,
            decimals: DEFAULT_DECIMALS,
            tx_timeout: 0,
            gas_price_step: GasPriceStep::default(),
            authz_amino_support: false,
            authz_amino_generic_only: false,
            authz_amino_exec_prevent_types: Vec::new(),
            amino_prevent_types: Vec::new(),
            authz_amino_lifted_values: false,
            pubkey_type_url: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let profile: NetworkProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading network profile from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Build a profile from a chain registry record as served by cosmos.directory.
    pub fn from_chain_registry(chain: &Value, tx_timeout_ms: u64, rest_url: Option<&str>) -> Result<Self> {
        let record = RegistryChain::deserialize(chain)
            .map_err(|e| CosmosError::Config(format!("invalid chain registry record: {}", e)))?;

        let fee_token = record.fees.fee_tokens.into_iter().next();
        let denom = fee_token
            .as_ref()
            .map(|token| token.denom.clone())
            .or(record.denom)
            .ok_or_else(|| {
                CosmosError::Config(format!("chain {} has no fee denom", record.chain_name))
            })?;

        let defaults = GasPriceStep::default();
        let gas_price_step = match fee_token {
            Some(token) => GasPriceStep {
                low: token.low_gas_price.unwrap_or(defaults.low),
                average: token.average_gas_price.unwrap_or(defaults.average),
                high: token.high_gas_price.unwrap_or(defaults.high),
            },
            None => defaults,
        };

        let rest_url = match rest_url {
            Some(url) => url.to_string(),
            None => record
                .apis
                .rest
                .into_iter()
                .next()
                .map(|api| api.address)
                .unwrap_or_else(|| format!("{}/{}", COSMOS_DIRECTORY_REST, record.chain_name)),
        };

        let profile = NetworkProfile {
            pretty_name: record.pretty_name.unwrap_or_default(),
            rest_url,
            coin_type: record.slip44.unwrap_or(DEFAULT_COIN_TYPE),
            decimals: record.decimals.unwrap_or(DEFAULT_DECIMALS),
            tx_timeout: tx_timeout_ms,
            gas_price_step,
            authz_amino_support: record.params.authz.unwrap_or(false),
            ..NetworkProfile::new(record.chain_name, record.chain_id, record.bech32_prefix, denom)
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        tendermint::chain::Id::from_str(&self.chain_id).map_err(|e| {
            CosmosError::Config(format!("invalid chain id {:?}: {}", self.chain_id, e))
        })?;
        if self.prefix.is_empty() {
            return Err(CosmosError::Config(format!(
                "{} has an empty bech32 prefix",
                self.chain_id
            )));
        }
        if self.denom.is_empty() {
            return Err(CosmosError::Config(format!(
                "{} has an empty fee denom",
                self.chain_id
            )));
        }
        compile_prevent_list(&self.authz_amino_exec_prevent_types)?;
        compile_prevent_list(&self.amino_prevent_types)?;
        Ok(())
    }

    /// Check that an address is valid bech32 under this network's prefix.
    pub fn validate_address(&self, address: &str) -> Result<AccountId> {
        let account = AccountId::from_str(address)
            .map_err(|e| CosmosError::InvalidData(format!("invalid address {}: {}", address, e)))?;
        if account.prefix() != self.prefix {
            return Err(CosmosError::InvalidData(format!(
                "address {} does not use the {} prefix",
                address, self.prefix
            )));
        }
        Ok(account)
    }

    pub fn gas_price(&self, level: GasPriceLevel) -> GasPrice {
        let amount = match level {
            GasPriceLevel::Low => self.gas_price_step.low,
            GasPriceLevel::Average => self.gas_price_step.average,
            GasPriceLevel::High => self.gas_price_step.high,
        };
        GasPrice::new(amount, self.denom.clone())
    }

    pub fn default_gas_price(&self) -> GasPrice {
        self.gas_price(GasPriceLevel::Average)
    }

    pub fn confirm_timeout(&self) -> Duration {
        if self.tx_timeout == 0 {
            DEFAULT_TX_TIMEOUT
        } else {
            Duration::from_millis(self.tx_timeout)
        }
    }

    /// Public key type URL forced by the chain itself, if any.
    pub fn pubkey_type_url_override(&self) -> Option<&str> {
        if let Some(type_url) = self.pubkey_type_url.as_deref() {
            return Some(type_url);
        }
        if self.chain_name == "injective" {
            return Some(INJECTIVE_PUBKEY_TYPE_URL);
        }
        None
    }
}

#[derive(Deserialize)]
struct RegistryChain {
    chain_name: String,
    #[serde(default)]
    pretty_name: Option<String>,
    chain_id: String,
    bech32_prefix: String,
    #[serde(default)]
    slip44: Option<u32>,
    #[serde(default)]
    decimals: Option<u32>,
    #[serde(default)]
    denom: Option<String>,
    #[serde(default)]
    params: RegistryParams,
    #[serde(default)]
    fees: RegistryFees,
    #[serde(default)]
    apis: RegistryApis,
}

#[derive(Default, Deserialize)]
struct RegistryParams {
    #[serde(default)]
    authz: Option<bool>,
}

#[derive(Default, Deserialize)]
struct RegistryFees {
    #[serde(default)]
    fee_tokens: Vec<RegistryFeeToken>,
}

#[derive(Deserialize)]
struct RegistryFeeToken {
    denom: String,
    #[serde(default)]
    low_gas_price: Option<Decimal>,
    #[serde(default)]
    average_gas_price: Option<Decimal>,
    #[serde(default)]
    high_gas_price: Option<Decimal>,
}

#[derive(Default, Deserialize)]
struct RegistryApis {
    #[serde(default)]
    rest: Vec<RegistryApi>,
}

#[derive(Deserialize)]
struct RegistryApi {
    address: String,
}
