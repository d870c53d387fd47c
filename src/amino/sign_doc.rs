use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AminoCoin;
use crate::errors::Result;
use crate::types::Fee;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<AminoCoin>,
    pub gas: String,
}

impl From<&Fee> for StdFee {
    fn from(fee: &Fee) -> Self {
        StdFee {
            amount: fee
                .amount
                .iter()
                .map(|coin| AminoCoin {
                    amount: coin.amount.to_string(),
                    denom: coin.denom.clone(),
                })
                .collect(),
            gas: fee.gas_limit.to_string(),
        }
    }
}

/// Legacy amino JSON sign document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<Value>,
    pub sequence: String,
}

impl StdSignDoc {
    pub fn new(
        msgs: Vec<Value>,
        fee: &Fee,
        chain_id: &str,
        memo: &str,
        account_number: u64,
        sequence: u64,
    ) -> Self {
        Self {
            account_number: account_number.to_string(),
            chain_id: chain_id.to_string(),
            fee: StdFee::from(fee),
            memo: memo.to_string(),
            msgs,
            sequence: sequence.to_string(),
        }
    }

    /// Bytes a legacy signer signs: compact JSON, keys sorted at every level,
    /// with `<`, `>` and `&` escaped.
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        let sorted = sort_keys(serde_json::to_value(self)?);
        let json = serde_json::to_string(&sorted)?;
        Ok(escape_html(&json).into_bytes())
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn escape_html(json: &str) -> String {
    json.replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coin;
    use serde_json::json;

    #[test]
    fn test_sign_bytes_are_sorted_and_escaped() {
        let fee = Fee::new(vec![Coin::new("uatom", 5000u64)], 200_000);
        let doc = StdSignDoc::new(
            vec![json!({"type": "cosmos-sdk/MsgSend", "value": {"to_address": "b", "from_address": "a"}})],
            &fee,
            "cosmoshub-4",
            "<tip & trick>",
            7,
            3,
        );
        let bytes = String::from_utf8(doc.sign_bytes().unwrap()).unwrap();
        assert_eq!(
            bytes,
            concat!(
                r#"{"account_number":"7","chain_id":"cosmoshub-4","#,
                r#""fee":{"amount":[{"amount":"5000","denom":"uatom"}],"gas":"200000"},"#,
                r#""memo":"\u003ctip \u0026 trick\u003e","#,
                r#""msgs":[{"type":"cosmos-sdk/MsgSend","value":{"from_address":"a","to_address":"b"}}],"#,
                r#""sequence":"3"}"#
            )
        );
    }
}
