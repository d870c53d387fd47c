//! Authz converters: grant, revoke and exec plus the authorization sub-table.
//!
//! Exec and grant are composite: their inner messages and authorizations go back through
//! the registry and the table.

use chrono::{DateTime, TimeZone, Utc};
use cosmos_sdk_proto::cosmos::authz::v1beta1::{GenericAuthorization, Grant, MsgGrant, MsgRevoke};
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::staking::v1beta1::stake_authorization::{Policy, Validators};
use cosmos_sdk_proto::cosmos::staking::v1beta1::StakeAuthorization;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_value, to_value, AminoCoin, AminoMsg, AminoTable, ConversionEntry};
use crate::errors::{CosmosError, Result};
use crate::registry::{type_urls, DecodedMessage, ExecPayload, TypedPayload, MAX_NESTING_DEPTH};

const AMINO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const ALLOW_LIST_TYPE: &str = "cosmos-sdk/StakeAuthorization/AllowList";
const DENY_LIST_TYPE: &str = "cosmos-sdk/StakeAuthorization/DenyList";

/// Seconds since the epoch to `YYYY-MM-DDTHH:MM:SSZ`. Sub-second precision is dropped.
pub fn date_to_amino(seconds: i64) -> Result<String> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|date| date.format(AMINO_DATE_FORMAT).to_string())
        .ok_or_else(|| CosmosError::InvalidData(format!("timestamp {} out of range", seconds)))
}

/// Parses an RFC 3339 date back to seconds since the epoch; nanos are always zero.
pub fn date_from_amino(date: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(date)
        .map(|parsed| parsed.timestamp())
        .map_err(|e| CosmosError::InvalidData(format!("invalid expiration {:?}: {}", date, e)))
}

#[derive(Serialize, Deserialize)]
struct AminoMsgGrant {
    granter: String,
    grantee: String,
    grant: AminoGrant,
}

#[derive(Serialize, Deserialize)]
struct AminoGrant {
    authorization: AminoMsg,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgRevoke {
    granter: String,
    grantee: String,
    msg_type_url: String,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgExec {
    grantee: String,
    msgs: Vec<AminoMsg>,
}

#[derive(Serialize, Deserialize)]
struct AminoGenericAuthorization {
    msg: String,
}

#[derive(Serialize, Deserialize)]
struct AminoValidatorsList {
    #[serde(default)]
    address: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct AminoValidatorsValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_list: Option<AminoValidatorsList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deny_list: Option<AminoValidatorsList>,
}

#[derive(Serialize, Deserialize)]
struct AminoValidators {
    #[serde(rename = "type")]
    list_type: String,
    value: AminoValidatorsValue,
}

#[derive(Serialize, Deserialize)]
struct AminoStakeAuthorization {
    #[serde(rename = "Validators", default, skip_serializing_if = "Option::is_none")]
    validators: Option<AminoValidators>,
    /// Older signers put the allow list at the top level.
    #[serde(default, skip_serializing)]
    allow_list: Option<AminoValidatorsList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_tokens: Option<AminoCoin>,
    #[serde(default)]
    authorization_type: i32,
}

fn grant_to_amino(table: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Grant)?;
    let grant = msg
        .grant
        .as_ref()
        .ok_or_else(|| CosmosError::InvalidData("MsgGrant without grant".to_string()))?;
    let authorization = grant
        .authorization
        .as_ref()
        .ok_or_else(|| CosmosError::InvalidData("grant without authorization".to_string()))?;
    let expiration = match &grant.expiration {
        Some(timestamp) => Some(date_to_amino(timestamp.seconds)?),
        None => None,
    };
    to_value(&AminoMsgGrant {
        granter: msg.granter.clone(),
        grantee: msg.grantee.clone(),
        grant: AminoGrant {
            authorization: table.authorization_to_amino(authorization)?,
            expiration,
        },
    })
}

fn grant_from_amino(table: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgGrant = from_value(value)?;
    let mut grant = Grant {
        authorization: Some(table.authorization_from_amino(&amino.grant.authorization)?),
        ..Default::default()
    };
    if let Some(date) = &amino.grant.expiration {
        let expiration = grant.expiration.get_or_insert_with(Default::default);
        expiration.seconds = date_from_amino(date)?;
        expiration.nanos = 0;
    }
    Ok(TypedPayload::Grant(MsgGrant {
        granter: amino.granter,
        grantee: amino.grantee,
        grant: Some(grant),
    }))
}

fn revoke_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Revoke)?;
    to_value(&AminoMsgRevoke {
        granter: msg.granter.clone(),
        grantee: msg.grantee.clone(),
        msg_type_url: msg.msg_type_url.clone(),
    })
}

fn revoke_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgRevoke = from_value(value)?;
    Ok(TypedPayload::Revoke(MsgRevoke {
        granter: amino.granter,
        grantee: amino.grantee,
        msg_type_url: amino.msg_type_url,
    }))
}

fn exec_to_amino(table: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let exec = payload_as!(payload, Exec)?;
    let msgs = exec
        .msgs
        .iter()
        .map(|inner| table.payload_to_amino(&inner.type_url, &inner.payload))
        .collect::<Result<Vec<_>>>()?;
    to_value(&AminoMsgExec {
        grantee: exec.grantee.clone(),
        msgs,
    })
}

fn exec_from_amino(table: &AminoTable, value: &Value, depth: usize) -> Result<TypedPayload> {
    if depth + 1 > MAX_NESTING_DEPTH {
        return Err(CosmosError::UnknownType(format!(
            "{} nested deeper than {} levels",
            type_urls::MSG_EXEC,
            MAX_NESTING_DEPTH
        )));
    }
    let amino: AminoMsgExec = from_value(value)?;
    let msgs = amino
        .msgs
        .iter()
        .map(|inner| {
            let (type_url, payload) = table.payload_from_amino(inner, depth + 1)?;
            Ok(DecodedMessage { type_url, payload })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TypedPayload::Exec(ExecPayload {
        grantee: amino.grantee,
        msgs,
    }))
}

fn generic_authorization_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let authorization = payload_as!(payload, GenericAuthorization)?;
    to_value(&AminoGenericAuthorization {
        msg: authorization.msg.clone(),
    })
}

fn generic_authorization_from_amino(
    _: &AminoTable,
    value: &Value,
    _: usize,
) -> Result<TypedPayload> {
    let amino: AminoGenericAuthorization = from_value(value)?;
    Ok(TypedPayload::GenericAuthorization(GenericAuthorization {
        msg: amino.msg,
    }))
}

fn stake_authorization_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let authorization = payload_as!(payload, StakeAuthorization)?;
    let validators = authorization.validators.as_ref().map(|validators| match validators {
        Policy::AllowList(list) => AminoValidators {
            list_type: ALLOW_LIST_TYPE.to_string(),
            value: AminoValidatorsValue {
                allow_list: Some(AminoValidatorsList {
                    address: list.address.clone(),
                }),
                deny_list: None,
            },
        },
        Policy::DenyList(list) => AminoValidators {
            list_type: DENY_LIST_TYPE.to_string(),
            value: AminoValidatorsValue {
                allow_list: None,
                deny_list: Some(AminoValidatorsList {
                    address: list.address.clone(),
                }),
            },
        },
    });
    to_value(&AminoStakeAuthorization {
        validators,
        allow_list: None,
        max_tokens: authorization.max_tokens.as_ref().map(AminoCoin::from),
        authorization_type: authorization.authorization_type,
    })
}

fn stake_authorization_from_amino(
    _: &AminoTable,
    value: &Value,
    _: usize,
) -> Result<TypedPayload> {
    let amino: AminoStakeAuthorization = from_value(value)?;
    let validators = match (amino.validators, amino.allow_list) {
        (Some(validators), _) => Some(validators_from_amino(validators)?),
        (None, Some(list)) => Some(Policy::AllowList(Validators {
            address: list.address,
        })),
        (None, None) => None,
    };
    Ok(TypedPayload::StakeAuthorization(StakeAuthorization {
        max_tokens: amino.max_tokens.map(Coin::from),
        authorization_type: amino.authorization_type,
        validators,
    }))
}

fn validators_from_amino(validators: AminoValidators) -> Result<Policy> {
    match validators.list_type.as_str() {
        ALLOW_LIST_TYPE => validators
            .value
            .allow_list
            .map(|list| Policy::AllowList(Validators { address: list.address }))
            .ok_or_else(|| CosmosError::InvalidData("AllowList without allow_list".to_string())),
        DENY_LIST_TYPE => validators
            .value
            .deny_list
            .map(|list| Policy::DenyList(Validators { address: list.address }))
            .ok_or_else(|| CosmosError::InvalidData("DenyList without deny_list".to_string())),
        other => Err(CosmosError::UnknownLegacyType(other.to_string())),
    }
}

pub(super) fn register(table: &mut AminoTable) {
    table
        .register(
            type_urls::MSG_GRANT,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgGrant",
                to_amino: grant_to_amino,
                from_amino: grant_from_amino,
            },
        )
        .register(
            type_urls::MSG_REVOKE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgRevoke",
                to_amino: revoke_to_amino,
                from_amino: revoke_from_amino,
            },
        )
        .register(
            type_urls::MSG_EXEC,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgExec",
                to_amino: exec_to_amino,
                from_amino: exec_from_amino,
            },
        );
    table
        .register_authorization(
            type_urls::GENERIC_AUTHORIZATION,
            ConversionEntry {
                amino_type: "cosmos-sdk/GenericAuthorization",
                to_amino: generic_authorization_to_amino,
                from_amino: generic_authorization_from_amino,
            },
        )
        .register_authorization(
            type_urls::STAKE_AUTHORIZATION,
            ConversionEntry {
                amino_type: "cosmos-sdk/StakeAuthorization",
                to_amino: stake_authorization_to_amino,
                from_amino: stake_authorization_from_amino,
            },
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trip() {
        assert_eq!(date_to_amino(1_767_225_600).unwrap(), "2026-01-01T00:00:00Z");
        assert_eq!(date_from_amino("2026-01-01T00:00:00Z").unwrap(), 1_767_225_600);
        assert_eq!(date_from_amino("2026-01-01T02:00:00+02:00").unwrap(), 1_767_225_600);
    }

    #[test]
    fn test_date_from_amino_ignores_fraction() {
        assert_eq!(date_from_amino("2026-01-01T00:00:00.750Z").unwrap(), 1_767_225_600);
        assert!(date_from_amino("tomorrow").is_err());
    }
}
