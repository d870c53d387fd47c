use serde_json::{Map, Value};

use crate::errors::{CosmosError, Result};
use crate::types::Account;

const BASE_ACCOUNT_KEYS: [&str; 3] = ["BaseAccount", "baseAccount", "base_account"];
const BASE_VESTING_ACCOUNT_KEYS: [&str; 3] = [
    "BaseVestingAccount",
    "baseVestingAccount",
    "base_vesting_account",
];

/// Normalize an account as returned by the ledger into a flat [`Account`].
///
/// Vesting and module accounts wrap the base account under chain specific keys; the
/// first non-empty wrapper wins.
pub fn resolve_account(address: &str, raw: Option<Value>) -> Result<Account> {
    let raw = raw.ok_or_else(|| CosmosError::AccountNotFound(address.to_string()))?;
    let resolved = unwrap_account(raw);
    if !resolved.is_object() {
        return Err(CosmosError::InvalidData(format!(
            "account {} is not an object",
            address
        )));
    }
    let account: Account = serde_json::from_value(resolved).map_err(|e| {
        CosmosError::InvalidData(format!("account {} could not be parsed: {}", address, e))
    })?;
    log::debug!(
        "Resolved account {} (number {}, sequence {})",
        account.address,
        account.account_number,
        account.sequence
    );
    Ok(account)
}

fn unwrap_account(raw: Value) -> Value {
    let mut account = raw;
    if let Some(base) = take_first_present(&mut account, &BASE_ACCOUNT_KEYS) {
        account = base;
    } else if let Some(mut vesting) = take_first_present(&mut account, &BASE_VESTING_ACCOUNT_KEYS) {
        account = take_first_present(&mut vesting, &BASE_ACCOUNT_KEYS).unwrap_or(vesting);
    }
    if let Some(inner) = take_non_empty(&mut account, "account") {
        account = inner;
    }
    account
}

/// The first of `keys` present on the object decides; its value is only used when non-empty.
fn take_first_present(value: &mut Value, keys: &[&str]) -> Option<Value> {
    let object = value.as_object_mut()?;
    let key = keys.iter().find(|key| object.contains_key(**key))?;
    take_if_non_empty(object, key)
}

fn take_non_empty(value: &mut Value, key: &str) -> Option<Value> {
    take_if_non_empty(value.as_object_mut()?, key)
}

fn take_if_non_empty(object: &mut Map<String, Value>, key: &str) -> Option<Value> {
    if is_empty(object.get(key)?) {
        return None;
    }
    object.remove(key)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_base_account() {
        let account = resolve_account(
            "cosmos1a",
            Some(json!({
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "cosmos1a",
                "pub_key": null,
                "account_number": "42",
                "sequence": "9"
            })),
        )
        .unwrap();
        assert_eq!(account.account_number, 42);
        assert_eq!(account.sequence, 9);
        assert!(account.pub_key.is_none());
    }

    #[test]
    fn test_vesting_account_unwraps_base() {
        let account = resolve_account(
            "a",
            Some(json!({"baseVestingAccount": {"baseAccount": {"address": "a", "sequence": 3}}})),
        )
        .unwrap();
        assert_eq!(account.address, "a");
        assert_eq!(account.sequence, 3);
        assert_eq!(account.account_number, 0);
    }

    #[test]
    fn test_snake_case_vesting_account() {
        let account = resolve_account(
            "cosmos1v",
            Some(json!({
                "@type": "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
                "base_vesting_account": {
                    "base_account": {"address": "cosmos1v", "account_number": "5", "sequence": "1"},
                    "original_vesting": []
                },
                "start_time": "0"
            })),
        )
        .unwrap();
        assert_eq!(account.account_number, 5);
        assert_eq!(account.sequence, 1);
    }

    #[test]
    fn test_first_present_key_wins_even_when_empty() {
        // BaseAccount is present but empty, so baseAccount is not consulted
        let account = resolve_account(
            "x",
            Some(json!({
                "BaseAccount": {},
                "baseAccount": {"address": "other", "sequence": 1},
                "address": "x",
                "sequence": 2
            })),
        )
        .unwrap();
        assert_eq!(account.address, "x");
        assert_eq!(account.sequence, 2);
    }

    #[test]
    fn test_nested_account_field() {
        let account = resolve_account(
            "eth1",
            Some(json!({"account": {"address": "eth1", "account_number": 7, "sequence": 0}})),
        )
        .unwrap();
        assert_eq!(account.account_number, 7);
    }

    #[test]
    fn test_missing_account() {
        match resolve_account("cosmos1nobody", None) {
            Err(CosmosError::AccountNotFound(address)) => assert_eq!(address, "cosmos1nobody"),
            other => panic!("expected AccountNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_structure() {
        assert!(matches!(
            resolve_account("a", Some(json!("a string"))),
            Err(CosmosError::InvalidData(_))
        ));
        assert!(matches!(
            resolve_account("a", Some(json!({"sequence": "not a number", "address": "a"}))),
            Err(CosmosError::InvalidData(_))
        ));
    }
}
