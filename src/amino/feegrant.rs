//! Fee grant converters plus the allowance sub-table.
//!
//! Expirations use the same second-precision dates as authz grants. A period is written as
//! its length in nanoseconds.

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::feegrant::v1beta1::{
    AllowedMsgAllowance, BasicAllowance, MsgGrantAllowance, MsgRevokeAllowance, PeriodicAllowance,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::authz::{date_from_amino, date_to_amino};
use super::{from_value, to_value, AminoCoin, AminoMsg, AminoTable, ConversionEntry};
use crate::errors::{CosmosError, Result};
use crate::registry::{type_urls, TypedPayload};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

#[derive(Serialize, Deserialize)]
struct AminoMsgGrantAllowance {
    granter: String,
    grantee: String,
    allowance: AminoMsg,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgRevokeAllowance {
    granter: String,
    grantee: String,
}

#[derive(Default, Serialize, Deserialize)]
struct AminoBasicAllowance {
    #[serde(default)]
    spend_limit: Vec<AminoCoin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AminoPeriodicAllowance {
    #[serde(default)]
    basic: AminoBasicAllowance,
    period: String,
    #[serde(default)]
    period_spend_limit: Vec<AminoCoin>,
    #[serde(default)]
    period_can_spend: Vec<AminoCoin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    period_reset: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AminoAllowedMsgAllowance {
    allowance: AminoMsg,
    #[serde(default)]
    allowed_messages: Vec<String>,
}

fn coins_to_amino(coins: &[Coin]) -> Vec<AminoCoin> {
    coins.iter().map(AminoCoin::from).collect()
}

fn coins_from_amino(coins: Vec<AminoCoin>) -> Vec<Coin> {
    coins.into_iter().map(Coin::from).collect()
}

fn period_to_amino(seconds: i64, nanos: i32) -> String {
    (i128::from(seconds) * NANOS_PER_SECOND + i128::from(nanos)).to_string()
}

/// Nanoseconds back to `(seconds, nanos)`.
fn period_from_amino(value: &str) -> Result<(i64, i32)> {
    let total: i128 = value
        .parse()
        .map_err(|e| CosmosError::InvalidData(format!("invalid period {:?}: {}", value, e)))?;
    if total < 0 {
        return Err(CosmosError::InvalidData(format!("negative period {}", value)));
    }
    let seconds = i64::try_from(total / NANOS_PER_SECOND)
        .map_err(|_| CosmosError::InvalidData(format!("period {} out of range", value)))?;
    Ok((seconds, (total % NANOS_PER_SECOND) as i32))
}

fn missing_allowance(owner: &str) -> CosmosError {
    CosmosError::InvalidData(format!("{} without allowance", owner))
}

fn basic_to_amino(allowance: &BasicAllowance) -> Result<AminoBasicAllowance> {
    let expiration = match &allowance.expiration {
        Some(timestamp) => Some(date_to_amino(timestamp.seconds)?),
        None => None,
    };
    Ok(AminoBasicAllowance {
        spend_limit: coins_to_amino(&allowance.spend_limit),
        expiration,
    })
}

fn basic_from_amino(amino: AminoBasicAllowance) -> Result<BasicAllowance> {
    let mut allowance = BasicAllowance {
        spend_limit: coins_from_amino(amino.spend_limit),
        ..Default::default()
    };
    if let Some(date) = &amino.expiration {
        let expiration = allowance.expiration.get_or_insert_with(Default::default);
        expiration.seconds = date_from_amino(date)?;
        expiration.nanos = 0;
    }
    Ok(allowance)
}

fn grant_allowance_to_amino(table: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, GrantAllowance)?;
    let allowance = msg
        .allowance
        .as_ref()
        .ok_or_else(|| missing_allowance("MsgGrantAllowance"))?;
    to_value(&AminoMsgGrantAllowance {
        granter: msg.granter.clone(),
        grantee: msg.grantee.clone(),
        allowance: table.allowance_to_amino(allowance)?,
    })
}

fn grant_allowance_from_amino(table: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgGrantAllowance = from_value(value)?;
    Ok(TypedPayload::GrantAllowance(MsgGrantAllowance {
        granter: amino.granter,
        grantee: amino.grantee,
        allowance: Some(table.allowance_from_amino(&amino.allowance)?),
    }))
}

fn revoke_allowance_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, RevokeAllowance)?;
    to_value(&AminoMsgRevokeAllowance {
        granter: msg.granter.clone(),
        grantee: msg.grantee.clone(),
    })
}

fn revoke_allowance_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgRevokeAllowance = from_value(value)?;
    Ok(TypedPayload::RevokeAllowance(MsgRevokeAllowance {
        granter: amino.granter,
        grantee: amino.grantee,
    }))
}

fn basic_allowance_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    to_value(&basic_to_amino(payload_as!(payload, BasicAllowance)?)?)
}

fn basic_allowance_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoBasicAllowance = from_value(value)?;
    Ok(TypedPayload::BasicAllowance(basic_from_amino(amino)?))
}

fn periodic_allowance_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let allowance = payload_as!(payload, PeriodicAllowance)?;
    let basic = match &allowance.basic {
        Some(basic) => basic_to_amino(basic)?,
        None => AminoBasicAllowance::default(),
    };
    let period = allowance
        .period
        .as_ref()
        .map(|period| period_to_amino(period.seconds, period.nanos))
        .unwrap_or_else(|| "0".to_string());
    let period_reset = match &allowance.period_reset {
        Some(timestamp) => Some(date_to_amino(timestamp.seconds)?),
        None => None,
    };
    to_value(&AminoPeriodicAllowance {
        basic,
        period,
        period_spend_limit: coins_to_amino(&allowance.period_spend_limit),
        period_can_spend: coins_to_amino(&allowance.period_can_spend),
        period_reset,
    })
}

fn periodic_allowance_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoPeriodicAllowance = from_value(value)?;
    let (seconds, nanos) = period_from_amino(&amino.period)?;
    let mut allowance = PeriodicAllowance {
        basic: Some(basic_from_amino(amino.basic)?),
        period_spend_limit: coins_from_amino(amino.period_spend_limit),
        period_can_spend: coins_from_amino(amino.period_can_spend),
        ..Default::default()
    };
    let period = allowance.period.get_or_insert_with(Default::default);
    period.seconds = seconds;
    period.nanos = nanos;
    if let Some(date) = &amino.period_reset {
        let reset = allowance.period_reset.get_or_insert_with(Default::default);
        reset.seconds = date_from_amino(date)?;
        reset.nanos = 0;
    }
    Ok(TypedPayload::PeriodicAllowance(allowance))
}

fn allowed_msg_allowance_to_amino(table: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let allowance = payload_as!(payload, AllowedMsgAllowance)?;
    let inner = allowance
        .allowance
        .as_ref()
        .ok_or_else(|| missing_allowance("AllowedMsgAllowance"))?;
    to_value(&AminoAllowedMsgAllowance {
        allowance: table.allowance_to_amino(inner)?,
        allowed_messages: allowance.allowed_messages.clone(),
    })
}

fn allowed_msg_allowance_from_amino(
    table: &AminoTable,
    value: &Value,
    _: usize,
) -> Result<TypedPayload> {
    let amino: AminoAllowedMsgAllowance = from_value(value)?;
    Ok(TypedPayload::AllowedMsgAllowance(AllowedMsgAllowance {
        allowance: Some(table.allowance_from_amino(&amino.allowance)?),
        allowed_messages: amino.allowed_messages,
    }))
}

pub(super) fn register(table: &mut AminoTable) {
    table
        .register(
            type_urls::MSG_GRANT_ALLOWANCE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgGrantAllowance",
                to_amino: grant_allowance_to_amino,
                from_amino: grant_allowance_from_amino,
            },
        )
        .register(
            type_urls::MSG_REVOKE_ALLOWANCE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgRevokeAllowance",
                to_amino: revoke_allowance_to_amino,
                from_amino: revoke_allowance_from_amino,
            },
        );
    table
        .register_allowance(
            type_urls::BASIC_ALLOWANCE,
            ConversionEntry {
                amino_type: "cosmos-sdk/BasicAllowance",
                to_amino: basic_allowance_to_amino,
                from_amino: basic_allowance_from_amino,
            },
        )
        .register_allowance(
            type_urls::PERIODIC_ALLOWANCE,
            ConversionEntry {
                amino_type: "cosmos-sdk/PeriodicAllowance",
                to_amino: periodic_allowance_to_amino,
                from_amino: periodic_allowance_from_amino,
            },
        )
        .register_allowance(
            type_urls::ALLOWED_MSG_ALLOWANCE,
            ConversionEntry {
                amino_type: "cosmos-sdk/AllowedMsgAllowance",
                to_amino: allowed_msg_allowance_to_amino,
                from_amino: allowed_msg_allowance_from_amino,
            },
        );
}
