use cosmos_sdk_proto::cosmos::base::v1beta1::Coin as ProtoCoin;
use cosmos_sdk_proto::cosmos::tx::v1beta1::{Fee as ProtoFee, TxRaw};
use cosmos_sdk_proto::Any;
use primitive_types::U256;
use prost::Message as ProstMessage;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use sha2::{Digest, Sha256};

use crate::errors::{CosmosError, Result};
use crate::fee::DEFAULT_GAS_LIMIT;

/// A chain message in canonical form: type URL plus protobuf payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl Message {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }

    /// Encode a generated protobuf message under the given type URL.
    pub fn from_proto<M: ProstMessage>(type_url: impl Into<String>, msg: &M) -> Self {
        Self::new(type_url, msg.encode_to_vec())
    }
}

impl From<Any> for Message {
    fn from(any: Any) -> Self {
        Self {
            type_url: any.type_url,
            value: any.value,
        }
    }
}

impl From<Message> for Any {
    fn from(msg: Message) -> Self {
        Any {
            type_url: msg.type_url,
            value: msg.value,
        }
    }
}

/// Token amount. Amounts travel as decimal strings to stay exact above 2^53.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "u256_string")]
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<U256>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    pub fn to_proto(&self) -> ProtoCoin {
        ProtoCoin {
            denom: self.denom.clone(),
            amount: self.amount.to_string(),
        }
    }

    pub fn from_proto(coin: &ProtoCoin) -> Result<Self> {
        Ok(Self {
            denom: coin.denom.clone(),
            amount: parse_amount(&coin.amount)?,
        })
    }
}

pub(crate) fn parse_amount(amount: &str) -> Result<U256> {
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CosmosError::InvalidData(format!(
            "invalid coin amount {:?}",
            amount
        )));
    }
    U256::from_dec_str(amount)
        .map_err(|_| CosmosError::InvalidData(format!("coin amount {} overflows", amount)))
}

mod u256_string {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_amount(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
}

impl Fee {
    /// A zero gas limit is never embedded in a sign doc.
    pub fn new(amount: Vec<Coin>, gas_limit: u64) -> Self {
        Self {
            amount,
            gas_limit: if gas_limit == 0 {
                DEFAULT_GAS_LIMIT
            } else {
                gas_limit
            },
        }
    }

    pub fn to_proto(&self) -> ProtoFee {
        ProtoFee {
            amount: self.amount.iter().map(Coin::to_proto).collect(),
            gas_limit: self.gas_limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyDescriptor {
    #[serde(rename = "@type", alias = "typeUrl", alias = "type_url")]
    pub type_url: String,
    /// Base64 key bytes as the LCD returns them.
    #[serde(default)]
    pub key: String,
}

/// On-chain account state, fetched fresh before every sign or simulate.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default, alias = "accountNumber")]
    pub account_number: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub sequence: u64,
    #[serde(default, alias = "pubKey")]
    pub pub_key: Option<PublicKeyDescriptor>,
}

/// Signed envelope ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub signatures: Vec<Vec<u8>>,
}

impl SignedTx {
    pub fn to_raw(&self) -> TxRaw {
        TxRaw {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            signatures: self.signatures.clone(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_raw().encode_to_vec()
    }

    /// Uppercase hex SHA-256 of the `TxRaw` bytes, as the chain reports it.
    pub fn hash(&self) -> String {
        hex::encode_upper(Sha256::digest(self.to_bytes()))
    }
}

/// Result of a broadcast or a tx lookup, as found in the LCD `tx_response`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedResult {
    #[serde(default)]
    pub code: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub raw_log: String,
    #[serde(rename = "txhash", alias = "transactionHash")]
    pub transaction_hash: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub gas_used: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub gas_wanted: u64,
    #[serde(default)]
    pub codespace: String,
}

impl ConfirmedResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
