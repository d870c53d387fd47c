use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use primitive_types::U256;
use regex::Regex;

use crate::decimal::Decimal;
use crate::errors::{CosmosError, Result};
use crate::types::{Coin, Fee};

/// Gas limit used when the caller gives none, or gives zero.
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Gas limit of the throwaway fee attached to simulation transactions.
pub const SIMULATION_GAS_LIMIT: u64 = 100_000;

/// Factor applied to simulated gas usage.
pub const DEFAULT_GAS_MULTIPLIER: &str = "1.5";

lazy_static! {
    static ref GAS_PRICE_PATTERN: Regex =
        Regex::new(r"^([0-9.]+)([a-zA-Z][a-zA-Z0-9/:._-]{2,127})$").expect("valid gas price pattern");
}

/// Price per unit of gas in a single denom, e.g. `0.025uatom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPrice {
    pub amount: Decimal,
    pub denom: String,
}

impl GasPrice {
    pub fn new(amount: Decimal, denom: impl Into<String>) -> Self {
        Self {
            amount,
            denom: denom.into(),
        }
    }
}

impl FromStr for GasPrice {
    type Err = CosmosError;

    fn from_str(input: &str) -> Result<Self> {
        let captures = GAS_PRICE_PATTERN
            .captures(input)
            .ok_or_else(|| CosmosError::InvalidGasPrice(input.to_string()))?;
        let amount = captures[1]
            .parse::<Decimal>()
            .map_err(|e| CosmosError::InvalidGasPrice(format!("{}: {}", input, e)))?;
        Ok(GasPrice::new(amount, &captures[2]))
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// `ceil(price * gas_limit)` in the price's denom. A zero limit is priced as
/// [`DEFAULT_GAS_LIMIT`], the limit the fee ends up carrying.
pub fn calculate_fee(gas_limit: u64, gas_price: &GasPrice) -> Result<Fee> {
    let gas_limit = effective_gas_limit(gas_limit);
    let amount = gas_price.amount.checked_mul_u64(gas_limit)?.ceil()?;
    Ok(Fee::new(
        vec![Coin::new(gas_price.denom.clone(), amount.floor())],
        gas_limit,
    ))
}

/// Fee for an optional gas amount and price, falling back to the default gas limit
/// and the network's default price.
pub fn get_fee(gas: Option<u64>, gas_price: Option<&GasPrice>, default_price: &GasPrice) -> Result<Fee> {
    calculate_fee(gas.unwrap_or(0), gas_price.unwrap_or(default_price))
}

fn effective_gas_limit(gas_limit: u64) -> u64 {
    if gas_limit == 0 {
        DEFAULT_GAS_LIMIT
    } else {
        gas_limit
    }
}

/// Scale a simulated gas figure into a limit, rounding down.
pub fn apply_gas_multiplier(gas_used: u64, multiplier: &Decimal) -> Result<u64> {
    let scaled: U256 = multiplier.checked_mul_u64(gas_used)?.floor();
    if scaled > U256::from(u64::MAX) {
        return Err(CosmosError::InvalidDecimal(format!(
            "gas {} * {} does not fit in u64",
            gas_used, multiplier
        )));
    }
    Ok(scaled.low_u64())
}

pub fn default_gas_multiplier() -> Decimal {
    Decimal::permille(1500)
}
