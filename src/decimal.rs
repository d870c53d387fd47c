//! Exact decimal arithmetic for gas prices and fee amounts.
//!
//! Values are held as a `U256` mantissa with a base-10 scale, so fee amounts above
//! 2^53 never pass through floating point.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{CosmosError, Result};

/// Maximum number of fractional digits accepted when parsing.
pub const MAX_FRACTIONAL_DIGITS: u32 = 18;

/// Largest scale a value may carry, enough for the product of two parsed values.
/// `10^MAX_SCALE` has to fit in a `U256`.
pub const MAX_SCALE: u32 = 2 * MAX_FRACTIONAL_DIGITS;

/// Non-negative decimal number. Always stored normalized (no trailing fractional zeros),
/// so derived equality is value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    atomics: U256,
    fractional_digits: u32,
}

impl Decimal {
    /// `atomics / 10^fractional_digits`. Fails when the normalized scale exceeds [`MAX_SCALE`].
    pub fn new(atomics: U256, fractional_digits: u32) -> Result<Self> {
        let value = Self::normalized(atomics, fractional_digits);
        if value.fractional_digits > MAX_SCALE {
            return Err(CosmosError::InvalidDecimal(format!(
                "scale {} exceeds {} fractional digits",
                value.fractional_digits, MAX_SCALE
            )));
        }
        Ok(value)
    }

    /// Thousandths, e.g. `permille(25)` is `0.025`.
    pub fn permille(value: u64) -> Self {
        Self::normalized(U256::from(value), 3)
    }

    fn normalized(atomics: U256, fractional_digits: u32) -> Self {
        let mut atomics = atomics;
        let mut fractional_digits = fractional_digits;
        let ten = U256::from(10u8);
        while fractional_digits > 0 && !atomics.is_zero() && (atomics % ten).is_zero() {
            atomics /= ten;
            fractional_digits -= 1;
        }
        if atomics.is_zero() {
            fractional_digits = 0;
        }
        Self {
            atomics,
            fractional_digits,
        }
    }

    pub fn zero() -> Self {
        Self::normalized(U256::zero(), 0)
    }

    pub fn from_integer(value: U256) -> Self {
        Self::normalized(value, 0)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_integer(U256::from(value))
    }

    pub fn atomics(&self) -> U256 {
        self.atomics
    }

    pub fn fractional_digits(&self) -> u32 {
        self.fractional_digits
    }

    pub fn is_zero(&self) -> bool {
        self.atomics.is_zero()
    }

    pub fn is_integer(&self) -> bool {
        self.fractional_digits == 0
    }

    pub fn checked_mul(&self, other: &Decimal) -> Result<Decimal> {
        let atomics = self
            .atomics
            .checked_mul(other.atomics)
            .ok_or_else(|| CosmosError::InvalidDecimal(format!("{} * {} overflows", self, other)))?;
        Decimal::new(atomics, self.fractional_digits + other.fractional_digits)
    }

    pub fn checked_mul_u64(&self, factor: u64) -> Result<Decimal> {
        self.checked_mul(&Decimal::from_u64(factor))
    }

    /// Smallest integer greater than or equal to this value.
    pub fn ceil(&self) -> Result<Decimal> {
        let scale = scale_factor(self.fractional_digits);
        let (quotient, remainder) = self.atomics.div_mod(scale);
        let value = if remainder.is_zero() {
            quotient
        } else {
            quotient
                .checked_add(U256::one())
                .ok_or_else(|| CosmosError::InvalidDecimal(format!("ceil({}) overflows", self)))?
        };
        Ok(Decimal::from_integer(value))
    }

    /// Integer part, discarding any fraction.
    pub fn floor(&self) -> U256 {
        self.atomics / scale_factor(self.fractional_digits)
    }
}

fn scale_factor(fractional_digits: u32) -> U256 {
    U256::exp10(fractional_digits as usize)
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Decimal {
    type Err = CosmosError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = || CosmosError::InvalidDecimal(input.to_string());
        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if input.contains('.') && fraction.is_empty() {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() as u32 > MAX_FRACTIONAL_DIGITS {
            return Err(CosmosError::InvalidDecimal(format!(
                "{} has more than {} fractional digits",
                input, MAX_FRACTIONAL_DIGITS
            )));
        }
        let digits = format!("{}{}", whole, fraction);
        let atomics = U256::from_dec_str(&digits).map_err(|_| invalid())?;
        Ok(Decimal::normalized(atomics, fraction.len() as u32))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fractional_digits == 0 {
            return write!(f, "{}", self.atomics);
        }
        let scale = scale_factor(self.fractional_digits);
        let (whole, fraction) = self.atomics.div_mod(scale);
        write!(
            f,
            "{}.{:0>width$}",
            whole,
            fraction.to_string(),
            width = self.fractional_digits as usize
        )
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Chain registries publish gas prices both as JSON numbers and as strings.
struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal number or string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Decimal, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from_u64(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Decimal, E> {
        u64::try_from(value)
            .map(Decimal::from_u64)
            .map_err(|_| E::custom(format!("negative decimal {}", value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Decimal, E> {
        if !value.is_finite() || value < 0.0 {
            return Err(E::custom(format!("invalid decimal {}", value)));
        }
        // f64 Display is the shortest round-trip form and never uses exponents
        format!("{}", value).parse().map_err(E::custom)
    }
}
