//! Type URL keyed protobuf codecs.
//!
//! The registry is built explicitly and shared through `Arc`; nothing here is global.

use std::collections::HashMap;
use std::fmt;

use cosmos_sdk_proto::cosmos::authz::v1beta1::{
    GenericAuthorization, MsgExec, MsgGrant, MsgRevoke,
};
use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
use cosmos_sdk_proto::cosmos::distribution::v1beta1::MsgWithdrawDelegatorReward;
use cosmos_sdk_proto::cosmos::feegrant::v1beta1::{
    AllowedMsgAllowance, BasicAllowance, MsgGrantAllowance, MsgRevokeAllowance, PeriodicAllowance,
};
use cosmos_sdk_proto::cosmos::gov::v1beta1::MsgVote;
use cosmos_sdk_proto::cosmos::staking::v1beta1::{
    MsgBeginRedelegate, MsgDelegate, MsgUndelegate, StakeAuthorization,
};
use cosmos_sdk_proto::Any;
use prost::Message as ProstMessage;

use crate::errors::{CosmosError, Result};
use crate::ibc::MsgTransfer;
use crate::types::Message;

pub mod type_urls {
    pub const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
    pub const MSG_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
    pub const MSG_UNDELEGATE: &str = "/cosmos.staking.v1beta1.MsgUndelegate";
    pub const MSG_BEGIN_REDELEGATE: &str = "/cosmos.staking.v1beta1.MsgBeginRedelegate";
    pub const MSG_WITHDRAW_DELEGATOR_REWARD: &str =
        "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward";
    pub const MSG_VOTE: &str = "/cosmos.gov.v1beta1.MsgVote";
    pub const MSG_GRANT: &str = "/cosmos.authz.v1beta1.MsgGrant";
    pub const MSG_REVOKE: &str = "/cosmos.authz.v1beta1.MsgRevoke";
    pub const MSG_EXEC: &str = "/cosmos.authz.v1beta1.MsgExec";
    pub const GENERIC_AUTHORIZATION: &str = "/cosmos.authz.v1beta1.GenericAuthorization";
    pub const STAKE_AUTHORIZATION: &str = "/cosmos.staking.v1beta1.StakeAuthorization";
    pub const MSG_TRANSFER: &str = "/ibc.applications.transfer.v1.MsgTransfer";
    pub const MSG_GRANT_ALLOWANCE: &str = "/cosmos.feegrant.v1beta1.MsgGrantAllowance";
    pub const MSG_REVOKE_ALLOWANCE: &str = "/cosmos.feegrant.v1beta1.MsgRevokeAllowance";
    pub const BASIC_ALLOWANCE: &str = "/cosmos.feegrant.v1beta1.BasicAllowance";
    pub const PERIODIC_ALLOWANCE: &str = "/cosmos.feegrant.v1beta1.PeriodicAllowance";
    pub const ALLOWED_MSG_ALLOWANCE: &str = "/cosmos.feegrant.v1beta1.AllowedMsgAllowance";

    pub const AUTHZ_PREFIX: &str = "/cosmos.authz";
}

/// Maximum number of nested `MsgExec` wrappers accepted when decoding.
pub const MAX_NESTING_DEPTH: usize = 2;

/// A decoded message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedPayload {
    Send(MsgSend),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
    Vote(MsgVote),
    Grant(MsgGrant),
    Revoke(MsgRevoke),
    Exec(ExecPayload),
    GenericAuthorization(GenericAuthorization),
    StakeAuthorization(StakeAuthorization),
    Transfer(MsgTransfer),
    GrantAllowance(MsgGrantAllowance),
    RevokeAllowance(MsgRevokeAllowance),
    BasicAllowance(BasicAllowance),
    PeriodicAllowance(PeriodicAllowance),
    AllowedMsgAllowance(AllowedMsgAllowance),
    /// Registered type whose payload is carried without interpretation.
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecPayload {
    pub grantee: String,
    pub msgs: Vec<DecodedMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub type_url: String,
    pub payload: TypedPayload,
}

impl TypedPayload {
    pub fn variant_name(&self) -> &'static str {
        match self {
            TypedPayload::Send(_) => "Send",
            TypedPayload::Delegate(_) => "Delegate",
            TypedPayload::Undelegate(_) => "Undelegate",
            TypedPayload::BeginRedelegate(_) => "BeginRedelegate",
            TypedPayload::WithdrawDelegatorReward(_) => "WithdrawDelegatorReward",
            TypedPayload::Vote(_) => "Vote",
            TypedPayload::Grant(_) => "Grant",
            TypedPayload::Revoke(_) => "Revoke",
            TypedPayload::Exec(_) => "Exec",
            TypedPayload::GenericAuthorization(_) => "GenericAuthorization",
            TypedPayload::StakeAuthorization(_) => "StakeAuthorization",
            TypedPayload::Transfer(_) => "Transfer",
            TypedPayload::GrantAllowance(_) => "GrantAllowance",
            TypedPayload::RevokeAllowance(_) => "RevokeAllowance",
            TypedPayload::BasicAllowance(_) => "BasicAllowance",
            TypedPayload::PeriodicAllowance(_) => "PeriodicAllowance",
            TypedPayload::AllowedMsgAllowance(_) => "AllowedMsgAllowance",
            TypedPayload::Opaque(_) => "Opaque",
        }
    }

    /// Number of `Exec` wrappers on the deepest path through this payload.
    pub fn nesting_depth(&self) -> usize {
        match self {
            TypedPayload::Exec(exec) => {
                1 + exec
                    .msgs
                    .iter()
                    .map(|inner| inner.payload.nesting_depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Type URLs of every message wrapped by this payload, at any depth.
    pub fn embedded_type_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        if let TypedPayload::Exec(exec) = self {
            for inner in &exec.msgs {
                urls.push(inner.type_url.clone());
                urls.extend(inner.payload.embedded_type_urls());
            }
        }
        urls
    }
}

pub type DecodeFn = fn(&MessageRegistry, &[u8], usize) -> Result<TypedPayload>;
pub type EncodeFn = fn(&MessageRegistry, &TypedPayload) -> Result<Vec<u8>>;

/// Codec for one type URL. The registry and current `Exec` depth are passed in so
/// wrapper types can recurse.
#[derive(Clone, Copy)]
pub struct CodecEntry {
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

fn payload_mismatch(expected: &str, payload: &TypedPayload) -> CosmosError {
    CosmosError::InvalidData(format!(
        "expected {} payload, got {}",
        expected,
        payload.variant_name()
    ))
}

macro_rules! proto_entry {
    ($variant:ident, $ty:ty) => {
        CodecEntry {
            decode: |_, bytes, _| Ok(TypedPayload::$variant(<$ty>::decode(bytes)?)),
            encode: |_, payload| match payload {
                TypedPayload::$variant(msg) => Ok(msg.encode_to_vec()),
                other => Err(payload_mismatch(stringify!($variant), other)),
            },
        }
    };
}

const OPAQUE_ENTRY: CodecEntry = CodecEntry {
    decode: |_, bytes, _| Ok(TypedPayload::Opaque(bytes.to_vec())),
    encode: |_, payload| match payload {
        TypedPayload::Opaque(bytes) => Ok(bytes.clone()),
        other => Err(payload_mismatch("Opaque", other)),
    },
};

const EXEC_ENTRY: CodecEntry = CodecEntry {
    decode: |registry, bytes, depth| registry.decode_exec(bytes, depth),
    encode: |registry, payload| match payload {
        TypedPayload::Exec(exec) => registry.encode_exec(exec),
        other => Err(payload_mismatch("Exec", other)),
    },
};

#[derive(Clone, Default)]
pub struct MessageRegistry {
    entries: HashMap<String, CodecEntry>,
}

impl fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut urls: Vec<&String> = self.entries.keys().collect();
        urls.sort();
        f.debug_struct("MessageRegistry")
            .field("type_urls", &urls)
            .finish()
    }
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bank, staking, distribution, gov, authz, feegrant and IBC
    /// transfer messages.
    pub fn with_defaults() -> Self {
        use type_urls::*;

        let mut registry = Self::new();
        registry.register(MSG_SEND, proto_entry!(Send, MsgSend));
        registry.register(MSG_DELEGATE, proto_entry!(Delegate, MsgDelegate));
        registry.register(MSG_UNDELEGATE, proto_entry!(Undelegate, MsgUndelegate));
        registry.register(
            MSG_BEGIN_REDELEGATE,
            proto_entry!(BeginRedelegate, MsgBeginRedelegate),
        );
        registry.register(
            MSG_WITHDRAW_DELEGATOR_REWARD,
            proto_entry!(WithdrawDelegatorReward, MsgWithdrawDelegatorReward),
        );
        registry.register(MSG_VOTE, proto_entry!(Vote, MsgVote));
        registry.register(MSG_GRANT, proto_entry!(Grant, MsgGrant));
        registry.register(MSG_REVOKE, proto_entry!(Revoke, MsgRevoke));
        registry.register(MSG_EXEC, EXEC_ENTRY);
        registry.register(
            GENERIC_AUTHORIZATION,
            proto_entry!(GenericAuthorization, GenericAuthorization),
        );
        registry.register(
            STAKE_AUTHORIZATION,
            proto_entry!(StakeAuthorization, StakeAuthorization),
        );
        registry.register(MSG_TRANSFER, proto_entry!(Transfer, MsgTransfer));
        registry.register(
            MSG_GRANT_ALLOWANCE,
            proto_entry!(GrantAllowance, MsgGrantAllowance),
        );
        registry.register(
            MSG_REVOKE_ALLOWANCE,
            proto_entry!(RevokeAllowance, MsgRevokeAllowance),
        );
        registry.register(BASIC_ALLOWANCE, proto_entry!(BasicAllowance, BasicAllowance));
        registry.register(
            PERIODIC_ALLOWANCE,
            proto_entry!(PeriodicAllowance, PeriodicAllowance),
        );
        registry.register(
            ALLOWED_MSG_ALLOWANCE,
            proto_entry!(AllowedMsgAllowance, AllowedMsgAllowance),
        );
        registry
    }

    pub fn register(&mut self, type_url: impl Into<String>, entry: CodecEntry) -> &mut Self {
        self.entries.insert(type_url.into(), entry);
        self
    }

    /// Register a chain specific type whose payload is passed through untouched.
    /// Such messages have no amino form and always sign in direct mode.
    pub fn register_opaque(&mut self, type_url: impl Into<String>) -> &mut Self {
        self.register(type_url, OPAQUE_ENTRY)
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.entries.contains_key(type_url)
    }

    pub fn type_urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn entry(&self, type_url: &str) -> Result<&CodecEntry> {
        self.entries
            .get(type_url)
            .ok_or_else(|| CosmosError::UnknownType(type_url.to_string()))
    }

    pub fn decode(&self, type_url: &str, bytes: &[u8]) -> Result<TypedPayload> {
        self.decode_at(type_url, bytes, 0)
    }

    pub(crate) fn decode_at(&self, type_url: &str, bytes: &[u8], depth: usize) -> Result<TypedPayload> {
        let entry = self.entry(type_url)?;
        (entry.decode)(self, bytes, depth)
    }

    pub fn decode_message(&self, msg: &Message) -> Result<TypedPayload> {
        self.decode(&msg.type_url, &msg.value)
    }

    pub fn encode(&self, type_url: &str, payload: &TypedPayload) -> Result<Vec<u8>> {
        let entry = self.entry(type_url)?;
        (entry.encode)(self, payload)
    }

    /// Wrap a message for a tx body. The payload has to decode against its type first.
    pub fn encode_any(&self, msg: &Message) -> Result<Any> {
        self.decode_message(msg)?;
        Ok(Any {
            type_url: msg.type_url.clone(),
            value: msg.value.clone(),
        })
    }

    /// `depth` counts the `Exec` wrappers enclosing this one.
    fn decode_exec(&self, bytes: &[u8], depth: usize) -> Result<TypedPayload> {
        if depth + 1 > MAX_NESTING_DEPTH {
            return Err(CosmosError::UnknownType(format!(
                "{} nested deeper than {} levels",
                type_urls::MSG_EXEC,
                MAX_NESTING_DEPTH
            )));
        }
        let exec = MsgExec::decode(bytes)?;
        let msgs = exec
            .msgs
            .iter()
            .map(|any| {
                Ok(DecodedMessage {
                    type_url: any.type_url.clone(),
                    payload: self.decode_at(&any.type_url, &any.value, depth + 1)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TypedPayload::Exec(ExecPayload {
            grantee: exec.grantee,
            msgs,
        }))
    }

    fn encode_exec(&self, exec: &ExecPayload) -> Result<Vec<u8>> {
        let msgs = exec
            .msgs
            .iter()
            .map(|inner| {
                Ok(Any {
                    type_url: inner.type_url.clone(),
                    value: self.encode(&inner.type_url, &inner.payload)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MsgExec {
            grantee: exec.grantee.clone(),
            msgs,
        }
        .encode_to_vec())
    }
}
