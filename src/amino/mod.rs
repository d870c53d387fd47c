//! Amino JSON conversion.
//!
//! [`AminoTable`] is the pure bidirectional table between registry payloads and their
//! legacy JSON shape. [`AminoConverter`] layers the per-network policy on top of it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cosmos_sdk_proto::Any;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CosmosError, Result};
use crate::registry::{MessageRegistry, TypedPayload, MAX_NESTING_DEPTH};
use crate::types::Message;

/// Borrow the inner proto of a payload, or fail with the variant actually found.
macro_rules! payload_as {
    ($payload:expr, $variant:ident) => {
        match $payload {
            $crate::registry::TypedPayload::$variant(inner) => Ok(inner),
            other => Err($crate::errors::CosmosError::InvalidData(format!(
                "expected {} payload, got {}",
                stringify!($variant),
                other.variant_name()
            ))),
        }
    };
}

mod authz;
mod feegrant;
mod ibc;
mod policy;
mod sign_doc;
mod standard;

pub use authz::{date_from_amino, date_to_amino};
pub(crate) use policy::compile_prevent_list;
pub use policy::AminoConverter;
pub use sign_doc::{StdFee, StdSignDoc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub amino_type: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoCoin {
    pub amount: String,
    pub denom: String,
}

pub type ToAminoFn = fn(&AminoTable, &TypedPayload) -> Result<Value>;
/// The last argument is the number of `Exec` wrappers enclosing the value.
pub type FromAminoFn = fn(&AminoTable, &Value, usize) -> Result<TypedPayload>;

#[derive(Clone, Copy)]
pub struct ConversionEntry {
    pub amino_type: &'static str,
    pub to_amino: ToAminoFn,
    pub from_amino: FromAminoFn,
}

pub struct AminoTable {
    registry: Arc<MessageRegistry>,
    messages: HashMap<String, ConversionEntry>,
    authorizations: HashMap<String, ConversionEntry>,
    allowances: HashMap<String, ConversionEntry>,
}

impl fmt::Debug for AminoTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut messages: Vec<&str> = self.messages.values().map(|e| e.amino_type).collect();
        messages.sort_unstable();
        let mut authorizations: Vec<&str> =
            self.authorizations.values().map(|e| e.amino_type).collect();
        authorizations.sort_unstable();
        let mut allowances: Vec<&str> = self.allowances.values().map(|e| e.amino_type).collect();
        allowances.sort_unstable();
        f.debug_struct("AminoTable")
            .field("messages", &messages)
            .field("authorizations", &authorizations)
            .field("allowances", &allowances)
            .finish()
    }
}

impl AminoTable {
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            registry,
            messages: HashMap::new(),
            authorizations: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Table with the bank, staking, distribution, gov, authz, feegrant and IBC transfer
    /// converters.
    pub fn with_defaults(registry: Arc<MessageRegistry>) -> Self {
        let mut table = Self::new(registry);
        standard::register(&mut table);
        authz::register(&mut table);
        feegrant::register(&mut table);
        ibc::register(&mut table);
        table
    }

    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    pub fn register(&mut self, type_url: impl Into<String>, entry: ConversionEntry) -> &mut Self {
        self.messages.insert(type_url.into(), entry);
        self
    }

    pub fn register_authorization(
        &mut self,
        type_url: impl Into<String>,
        entry: ConversionEntry,
    ) -> &mut Self {
        self.authorizations.insert(type_url.into(), entry);
        self
    }

    pub fn register_allowance(
        &mut self,
        type_url: impl Into<String>,
        entry: ConversionEntry,
    ) -> &mut Self {
        self.allowances.insert(type_url.into(), entry);
        self
    }

    pub fn supports(&self, type_url: &str) -> bool {
        self.messages.contains_key(type_url)
    }

    pub fn to_amino(&self, msg: &Message) -> Result<AminoMsg> {
        let payload = self.registry.decode_message(msg)?;
        self.payload_to_amino(&msg.type_url, &payload)
    }

    pub fn from_amino(&self, amino: &AminoMsg) -> Result<Message> {
        let (type_url, payload) = self.payload_from_amino(amino, 0)?;
        let value = self.registry.encode(&type_url, &payload)?;
        Ok(Message::new(type_url, value))
    }

    pub(crate) fn payload_to_amino(&self, type_url: &str, payload: &TypedPayload) -> Result<AminoMsg> {
        let entry = self
            .messages
            .get(type_url)
            .ok_or_else(|| CosmosError::UnsupportedConversion(type_url.to_string()))?;
        Ok(AminoMsg {
            amino_type: entry.amino_type.to_string(),
            value: (entry.to_amino)(self, payload)?,
        })
    }

    pub(crate) fn payload_from_amino(
        &self,
        amino: &AminoMsg,
        depth: usize,
    ) -> Result<(String, TypedPayload)> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CosmosError::UnknownType(format!(
                "{} nested deeper than {} levels",
                amino.amino_type, MAX_NESTING_DEPTH
            )));
        }
        let (type_url, entry) = lookup_amino_type(&self.messages, &amino.amino_type)?;
        let payload = (entry.from_amino)(self, &amino.value, depth)?;
        Ok((type_url, payload))
    }

    /// Convert a grant's authorization to its `{type, value}` amino form.
    pub(crate) fn authorization_to_amino(&self, authorization: &Any) -> Result<AminoMsg> {
        self.any_to_amino(&self.authorizations, authorization)
    }

    pub(crate) fn authorization_from_amino(&self, amino: &AminoMsg) -> Result<Any> {
        self.any_from_amino(&self.authorizations, amino)
    }

    /// Convert a fee allowance to its `{type, value}` amino form.
    pub(crate) fn allowance_to_amino(&self, allowance: &Any) -> Result<AminoMsg> {
        self.any_to_amino(&self.allowances, allowance)
    }

    pub(crate) fn allowance_from_amino(&self, amino: &AminoMsg) -> Result<Any> {
        self.any_from_amino(&self.allowances, amino)
    }

    fn any_to_amino(&self, entries: &HashMap<String, ConversionEntry>, any: &Any) -> Result<AminoMsg> {
        let payload = self.registry.decode(&any.type_url, &any.value)?;
        let entry = entries
            .get(&any.type_url)
            .ok_or_else(|| CosmosError::UnsupportedConversion(any.type_url.clone()))?;
        Ok(AminoMsg {
            amino_type: entry.amino_type.to_string(),
            value: (entry.to_amino)(self, &payload)?,
        })
    }

    fn any_from_amino(
        &self,
        entries: &HashMap<String, ConversionEntry>,
        amino: &AminoMsg,
    ) -> Result<Any> {
        let (type_url, entry) = lookup_amino_type(entries, &amino.amino_type)?;
        let payload = (entry.from_amino)(self, &amino.value, 0)?;
        let value = self.registry.encode(&type_url, &payload)?;
        Ok(Any { type_url, value })
    }
}

fn lookup_amino_type(
    entries: &HashMap<String, ConversionEntry>,
    amino_type: &str,
) -> Result<(String, ConversionEntry)> {
    entries
        .iter()
        .find(|(_, entry)| entry.amino_type == amino_type)
        .map(|(type_url, entry)| (type_url.clone(), *entry))
        .ok_or_else(|| CosmosError::UnknownLegacyType(amino_type.to_string()))
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn from_value<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(T::deserialize(value)?)
}
