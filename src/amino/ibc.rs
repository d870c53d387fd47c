//! ICS-20 transfer converter.
//!
//! Heights and the timestamp are strings. Zero values are left out, but `timeout_height`
//! is always written as an object.

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_value, to_value, AminoCoin, AminoTable, ConversionEntry};
use crate::errors::{CosmosError, Result};
use crate::ibc::{Height, MsgTransfer};
use crate::registry::{type_urls, TypedPayload};

#[derive(Default, Serialize, Deserialize)]
struct AminoHeight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision_height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision_number: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AminoMsgTransfer {
    source_port: String,
    source_channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<AminoCoin>,
    sender: String,
    receiver: String,
    #[serde(default)]
    timeout_height: Option<AminoHeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

fn omit_zero(value: u64) -> Option<String> {
    (value != 0).then(|| value.to_string())
}

fn parse_u64(field: &str, value: Option<&String>) -> Result<u64> {
    match value {
        Some(text) if !text.is_empty() => text
            .parse()
            .map_err(|e| CosmosError::InvalidData(format!("invalid {} {:?}: {}", field, text, e))),
        _ => Ok(0),
    }
}

fn transfer_to_amino(_: &AminoTable, payload: &TypedPayload) -> Result<Value> {
    let msg = payload_as!(payload, Transfer)?;
    let timeout_height = msg
        .timeout_height
        .as_ref()
        .map(|height| AminoHeight {
            revision_height: omit_zero(height.revision_height),
            revision_number: omit_zero(height.revision_number),
        })
        .unwrap_or_default();
    to_value(&AminoMsgTransfer {
        source_port: msg.source_port.clone(),
        source_channel: msg.source_channel.clone(),
        token: msg.token.as_ref().map(AminoCoin::from),
        sender: msg.sender.clone(),
        receiver: msg.receiver.clone(),
        timeout_height: Some(timeout_height),
        timeout_timestamp: omit_zero(msg.timeout_timestamp),
        memo: Some(msg.memo.clone()).filter(|memo| !memo.is_empty()),
    })
}

fn transfer_from_amino(_: &AminoTable, value: &Value, _: usize) -> Result<TypedPayload> {
    let amino: AminoMsgTransfer = from_value(value)?;
    let timeout_height = match &amino.timeout_height {
        Some(height) => Some(Height {
            revision_number: parse_u64("revision_number", height.revision_number.as_ref())?,
            revision_height: parse_u64("revision_height", height.revision_height.as_ref())?,
        }),
        None => None,
    };
    Ok(TypedPayload::Transfer(MsgTransfer {
        source_port: amino.source_port,
        source_channel: amino.source_channel,
        token: amino.token.map(Coin::from),
        sender: amino.sender,
        receiver: amino.receiver,
        timeout_height,
        timeout_timestamp: parse_u64("timeout_timestamp", amino.timeout_timestamp.as_ref())?,
        memo: amino.memo.unwrap_or_default(),
    }))
}

pub(super) fn register(table: &mut AminoTable) {
    table.register(
        type_urls::MSG_TRANSFER,
        ConversionEntry {
            amino_type: "cosmos-sdk/MsgTransfer",
            to_amino: transfer_to_amino,
            from_amino: transfer_from_amino,
        },
    );
}
