//! Bank, staking, distribution and gov converters (cosmjs stargate shapes).

use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::distribution::v1beta1::MsgWithdrawDelegatorReward;
use cosmos_sdk_proto::cosmos::gov::v1beta1::MsgVote;
use cosmos_sdk_proto::cosmos::staking::v1beta1::{MsgBeginRedelegate, MsgDelegate, MsgUndelegate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::{from_value, to_value, AminoCoin, AminoTable, ConversionEntry};
use crate::errors::{CosmosError, Result};
use crate::registry::{type_urls, TypedPayload};

impl From<&Coin> for AminoCoin {
    fn from(coin: &Coin) -> Self {
        AminoCoin {
            amount: coin.amount.clone(),
            denom: coin.denom.clone(),
        }
    }
}

impl From<AminoCoin> for Coin {
    fn from(coin: AminoCoin) -> Self {
        Coin {
            denom: coin.denom,
            amount: coin.amount,
        }
    }
}

fn required_coin(coin: &Option<Coin>, field: &str) -> Result<AminoCoin> {
    coin.as_ref()
        .map(AminoCoin::from)
        .ok_or_else(|| CosmosError::InvalidData(format!("missing {}", field)))
}

#[derive(Serialize, Deserialize)]
struct AminoMsgSend {
    from_address: String,
    to_address: String,
    amount: Vec<AminoCoin>,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgDelegate {
    delegator_address: String,
    validator_address: String,
    amount: AminoCoin,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgBeginRedelegate {
    delegator_address: String,
    validator_src_address: String,
    validator_dst_address: String,
    amount: AminoCoin,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgWithdrawDelegatorReward {
    delegator_address: String,
    validator_address: String,
}

/// `proposal_id` is a string on the wire; `option` stays numeric.
#[serde_as]
#[derive(Serialize, Deserialize)]
struct AminoMsgVote {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    proposal_id: u64,
    voter: String,
    option: i32,
}

fn send_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Send)?;
    to_value(&AminoMsgSend {
        from_address: msg.from_address.clone(),
        to_address: msg.to_address.clone(),
        amount: msg.amount.iter().map(AminoCoin::from).collect(),
    })
}

fn send_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgSend = from_value(value)?;
    Ok(TypedPayload::Send(MsgSend {
        from_address: amino.from_address,
        to_address: amino.to_address,
        amount: amino.amount.into_iter().map(Coin::from).collect(),
    }))
}

fn delegate_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Delegate)?;
    to_value(&AminoMsgDelegate {
        delegator_address: msg.delegator_address.clone(),
        validator_address: msg.validator_address.clone(),
        amount: required_coin(&msg.amount, "delegation amount")?,
    })
}

fn delegate_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgDelegate = from_value(value)?;
    Ok(TypedPayload::Delegate(MsgDelegate {
        delegator_address: amino.delegator_address,
        validator_address: amino.validator_address,
        amount: Some(amino.amount.into()),
    }))
}

fn undelegate_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Undelegate)?;
    to_value(&AminoMsgDelegate {
        delegator_address: msg.delegator_address.clone(),
        validator_address: msg.validator_address.clone(),
        amount: required_coin(&msg.amount, "undelegation amount")?,
    })
}

fn undelegate_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgDelegate = from_value(value)?;
    Ok(TypedPayload::Undelegate(MsgUndelegate {
        delegator_address: amino.delegator_address,
        validator_address: amino.validator_address,
        amount: Some(amino.amount.into()),
    }))
}

fn redelegate_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, BeginRedelegate)?;
    to_value(&AminoMsgBeginRedelegate {
        delegator_address: msg.delegator_address.clone(),
        validator_src_address: msg.validator_src_address.clone(),
        validator_dst_address: msg.validator_dst_address.clone(),
        amount: required_coin(&msg.amount, "redelegation amount")?,
    })
}

fn redelegate_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgBeginRedelegate = from_value(value)?;
    Ok(TypedPayload::BeginRedelegate(MsgBeginRedelegate {
        delegator_address: amino.delegator_address,
        validator_src_address: amino.validator_src_address,
        validator_dst_address: amino.validator_dst_address,
        amount: Some(amino.amount.into()),
    }))
}

fn withdraw_reward_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, WithdrawDelegatorReward)?;
    to_value(&AminoMsgWithdrawDelegatorReward {
        delegator_address: msg.delegator_address.clone(),
        validator_address: msg.validator_address.clone(),
    })
}

fn withdraw_reward_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgWithdrawDelegatorReward = from_value(value)?;
    Ok(TypedPayload::WithdrawDelegatorReward(
        MsgWithdrawDelegatorReward {
            delegator_address: amino.delegator_address,
            validator_address: amino.validator_address,
        },
    ))
}

fn vote_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Vote)?;
    to_value(&AminoMsgVote {
        proposal_id: msg.proposal_id,
        voter: msg.voter.clone(),
        option: msg.option,
    })
}

fn vote_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgVote = from_value(value)?;
    Ok(TypedPayload::Vote(MsgVote {
        proposal_id: amino.proposal_id,
        voter: amino.voter,
        option: amino.option,
    }))
}

pub(super) fn register(table: &mut AminoTable) {
    table
        .register(
            type_urls::MSG_SEND,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgSend",
                to_amino: send_to_amino,
                from_amino: send_from_amino,
            },
        )
        .register(
            type_urls::MSG_DELEGATE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgDelegate",
                to_amino: delegate_to_amino,
                from_amino: delegate_from_amino,
            },
        )
        .register(
            type_urls::MSG_UNDELEGATE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgUndelegate",
                to_amino: undelegate_to_amino,
                from_amino: undelegate_from_amino,
            },
        )
        .register(
            type_urls::MSG_BEGIN_REDELEGATE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgBeginRedelegate",
                to_amino: redelegate_to_amino,
                from_amino: redelegate_from_amino,
            },
        )
        .register(
            type_urls::MSG_WITHDRAW_DELEGATOR_REWARD,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgWithdrawDelegationReward",
                to_amino: withdraw_reward_to_amino,
                from_amino: withdraw_reward_from_amino,
            },
        )
        .register(
            type_urls::MSG_VOTE,
            ConversionEntry {
                amino_type: "cosmos-sdk/MsgVote",
                to_amino: vote_to_amino,
                from_amino: vote_from_amino,
            },
        );
}
