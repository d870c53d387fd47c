use std::sync::Arc;

use regex::RegexSet;
use serde_json::Value;

use super::{AminoMsg, AminoTable};
use crate::errors::{CosmosError, Result};
use crate::network::NetworkProfile;
use crate::registry::type_urls;
use crate::types::Message;

/// Literal substring matcher built from a network's exclusion list.
pub(crate) fn compile_prevent_list(patterns: &[String]) -> Result<RegexSet> {
    RegexSet::new(patterns.iter().map(|pattern| regex::escape(pattern)))
        .map_err(|e| CosmosError::Config(format!("invalid amino exclusion list: {}", e)))
}

/// Applies a network's amino policy on top of the conversion table.
#[derive(Debug)]
pub struct AminoConverter {
    table: Arc<AminoTable>,
    authz_amino_support: bool,
    authz_amino_generic_only: bool,
    authz_amino_lifted_values: bool,
    exec_prevent_types: RegexSet,
    prevent_types: RegexSet,
}

impl AminoConverter {
    pub fn new(table: Arc<AminoTable>, profile: &NetworkProfile) -> Result<Self> {
        Ok(Self {
            table,
            authz_amino_support: profile.authz_amino_support,
            authz_amino_generic_only: profile.authz_amino_generic_only,
            authz_amino_lifted_values: profile.authz_amino_lifted_values,
            exec_prevent_types: compile_prevent_list(&profile.authz_amino_exec_prevent_types)?,
            prevent_types: compile_prevent_list(&profile.amino_prevent_types)?,
        })
    }

    pub fn table(&self) -> &Arc<AminoTable> {
        &self.table
    }

    /// Convert every message to its legacy form, or fail on the first message the
    /// network cannot sign in amino mode.
    pub fn to_legacy(&self, msgs: &[Message], direct_sign_available: bool) -> Result<Vec<Value>> {
        msgs.iter()
            .map(|msg| self.message_to_legacy(msg, direct_sign_available))
            .collect()
    }

    pub fn from_legacy(&self, msgs: &[Value]) -> Result<Vec<Message>> {
        msgs.iter()
            .map(|value| {
                let amino: AminoMsg = super::from_value(value)?;
                self.table.from_amino(&amino)
            })
            .collect()
    }

    fn message_to_legacy(&self, msg: &Message, direct_sign_available: bool) -> Result<Value> {
        let payload = self.table.registry().decode_message(msg)?;
        let type_url = msg.type_url.as_str();

        if type_url.starts_with(type_urls::AUTHZ_PREFIX) {
            if !self.authz_amino_support {
                return Err(CosmosError::UnsupportedConversion(format!(
                    "this chain does not support amino conversion for authz messages ({})",
                    type_url
                )));
            }
            if self.authz_amino_generic_only && direct_sign_available {
                return Err(CosmosError::UnsupportedConversion(format!(
                    "this chain only supports generic authz over amino, signing {} directly",
                    type_url
                )));
            }
        }

        if type_url == type_urls::MSG_EXEC {
            let prevented: Vec<String> = payload
                .embedded_type_urls()
                .into_iter()
                .filter(|embedded| self.exec_prevent_types.is_match(embedded))
                .collect();
            if !prevented.is_empty() {
                return Err(CosmosError::UnsupportedConversion(format!(
                    "this chain does not support amino conversion for authz exec with message types: {}",
                    prevented.join(", ")
                )));
            }
        } else if self.prevent_types.is_match(type_url) {
            return Err(CosmosError::UnsupportedConversion(format!(
                "this chain does not support amino conversion for message type: {}",
                type_url
            )));
        }

        let amino = self.table.payload_to_amino(type_url, &payload)?;
        if self.authz_amino_lifted_values {
            return lift(amino);
        }
        Ok(serde_json::to_value(amino)?)
    }
}

/// Some chains expect authz messages without their `{type, value}` envelope.
fn lift(amino: AminoMsg) -> Result<Value> {
    match amino.amino_type.as_str() {
        "cosmos-sdk/MsgGrant" => {
            let mut value = amino.value;
            if let Some(authorization) = value.pointer_mut("/grant/authorization") {
                let inner = authorization.get("value").cloned().unwrap_or(Value::Null);
                *authorization = inner;
            }
            Ok(value)
        }
        "cosmos-sdk/MsgRevoke" => Ok(amino.value),
        "cosmos-sdk/MsgExec" => Err(CosmosError::UnsupportedConversion(
            "this chain does not support amino conversion for MsgExec".to_string(),
        )),
        _ => Ok(serde_json::to_value(amino)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::type_urls::*;
    use crate::registry::MessageRegistry;
    use cosmos_sdk_proto::cosmos::authz::v1beta1::{
        GenericAuthorization, Grant, MsgExec, MsgGrant, MsgRevoke,
    };
    use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
    use cosmos_sdk_proto::cosmos::staking::v1beta1::MsgDelegate;
    use cosmos_sdk_proto::Any;
    use serde_json::json;

    fn profile() -> NetworkProfile {
        NetworkProfile {
            authz_amino_support: true,
            ..NetworkProfile::new("cosmoshub", "cosmoshub-4", "cosmos", "uatom")
        }
    }

    fn converter(profile: &NetworkProfile) -> AminoConverter {
        let registry = Arc::new(MessageRegistry::with_defaults());
        AminoConverter::new(Arc::new(AminoTable::with_defaults(registry)), profile).unwrap()
    }

    fn send() -> Message {
        Message::from_proto(
            MSG_SEND,
            &MsgSend {
                from_address: "cosmos1from".to_string(),
                to_address: "cosmos1to".to_string(),
                amount: vec![],
            },
        )
    }

    fn delegate() -> Message {
        Message::from_proto(
            MSG_DELEGATE,
            &MsgDelegate {
                delegator_address: "cosmos1del".to_string(),
                validator_address: "cosmosvaloper1val".to_string(),
                amount: Some(cosmos_sdk_proto::cosmos::base::v1beta1::Coin {
                    denom: "uatom".to_string(),
                    amount: "1".to_string(),
                }),
            },
        )
    }

    fn revoke() -> Message {
        Message::from_proto(
            MSG_REVOKE,
            &MsgRevoke {
                granter: "cosmos1granter".to_string(),
                grantee: "cosmos1grantee".to_string(),
                msg_type_url: MSG_SEND.to_string(),
            },
        )
    }

    fn grant() -> Message {
        Message::from_proto(
            MSG_GRANT,
            &MsgGrant {
                granter: "cosmos1granter".to_string(),
                grantee: "cosmos1grantee".to_string(),
                grant: Some(Grant {
                    authorization: Some(Any::from(Message::from_proto(
                        GENERIC_AUTHORIZATION,
                        &GenericAuthorization {
                            msg: MSG_DELEGATE.to_string(),
                        },
                    ))),
                    ..Default::default()
                }),
            },
        )
    }

    fn exec(msgs: Vec<Message>) -> Message {
        Message::from_proto(
            MSG_EXEC,
            &MsgExec {
                grantee: "cosmos1grantee".to_string(),
                msgs: msgs.into_iter().map(Any::from).collect(),
            },
        )
    }

    #[test]
    fn test_authz_disabled_rejects_and_stays_usable() {
        let profile = NetworkProfile {
            authz_amino_support: false,
            ..profile()
        };
        let converter = converter(&profile);
        match converter.to_legacy(&[revoke()], false) {
            Err(err) => assert!(err.is_conversion_fallback()),
            Ok(_) => panic!("authz conversion should be refused"),
        }
        assert_eq!(converter.to_legacy(&[send()], false).unwrap().len(), 1);
    }

    #[test]
    fn test_generic_only_depends_on_direct_capability() {
        let profile = NetworkProfile {
            authz_amino_generic_only: true,
            ..profile()
        };
        let converter = converter(&profile);
        assert!(matches!(
            converter.to_legacy(&[grant()], true),
            Err(CosmosError::UnsupportedConversion(_))
        ));
        assert!(converter.to_legacy(&[grant()], false).is_ok());
    }

    #[test]
    fn test_exec_prevent_types_list_every_offender() {
        let profile = NetworkProfile {
            authz_amino_exec_prevent_types: vec!["MsgDelegate".to_string(), "bank".to_string()],
            ..profile()
        };
        let converter = converter(&profile);
        let msg = exec(vec![send(), exec(vec![delegate()])]);
        match converter.to_legacy(&[msg], false) {
            Err(CosmosError::UnsupportedConversion(reason)) => {
                assert!(reason.contains(MSG_SEND));
                assert!(reason.contains(MSG_DELEGATE));
                assert!(!reason.contains(MSG_EXEC));
            }
            other => panic!("expected UnsupportedConversion, got {:?}", other),
        }
    }

    #[test]
    fn test_prevent_types_are_literal_and_case_sensitive() {
        let mixed_case = NetworkProfile {
            amino_prevent_types: vec!["staking.v1beta1.Msg".to_string(), "MSGSEND".to_string()],
            ..profile()
        };
        let legacy = converter(&mixed_case);
        assert!(legacy.to_legacy(&[delegate()], false).is_err());
        assert!(legacy.to_legacy(&[send()], false).is_ok());

        // a dot in the pattern does not match any character
        let dotted = NetworkProfile {
            amino_prevent_types: vec!["bank.v1beta1xMsgSend".to_string()],
            ..profile()
        };
        assert!(converter(&dotted).to_legacy(&[send()], false).is_ok());
    }

    #[test]
    fn test_prevent_types_do_not_apply_to_exec_itself() {
        let profile = NetworkProfile {
            amino_prevent_types: vec!["MsgExec".to_string()],
            ..profile()
        };
        assert!(converter(&profile).to_legacy(&[exec(vec![send()])], false).is_ok());
    }

    #[test]
    fn test_lifted_values() {
        let profile = NetworkProfile {
            authz_amino_lifted_values: true,
            ..profile()
        };
        let converter = converter(&profile);

        let lifted = converter.to_legacy(&[grant(), revoke(), send()], false).unwrap();
        assert_eq!(
            lifted[0],
            json!({
                "granter": "cosmos1granter",
                "grantee": "cosmos1grantee",
                "grant": {"authorization": {"msg": MSG_DELEGATE}}
            })
        );
        assert_eq!(
            lifted[1],
            json!({"granter": "cosmos1granter", "grantee": "cosmos1grantee", "msg_type_url": MSG_SEND})
        );
        assert_eq!(lifted[2]["type"], json!("cosmos-sdk/MsgSend"));

        assert!(matches!(
            converter.to_legacy(&[exec(vec![send()])], false),
            Err(CosmosError::UnsupportedConversion(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_fatal_not_fallback() {
        let converter = converter(&profile());
        let err = converter
            .to_legacy(&[Message::new("/unknown.v1.MsgThing", vec![])], false)
            .unwrap_err();
        assert!(matches!(err, CosmosError::UnknownType(_)));
        assert!(!err.is_conversion_fallback());
    }

    #[test]
    fn test_from_legacy_inverts_to_legacy() {
        let converter = converter(&profile());
        let msgs = vec![send(), delegate(), revoke(), grant(), exec(vec![send()])];
        let legacy = converter.to_legacy(&msgs, false).unwrap();
        assert_eq!(converter.from_legacy(&legacy).unwrap(), msgs);
    }

    #[test]
    fn test_bad_exclusion_list_never_panics() {
        let profile = NetworkProfile {
            amino_prevent_types: vec!["(unclosed".to_string(), "[".to_string()],
            ..profile()
        };
        let converter = converter(&profile);
        assert!(converter.to_legacy(&[send()], false).is_ok());
    }

    #[test]
    fn test_prevent_types_keep_transfers_off_amino() {
        let transfer = Message::from_proto(
            MSG_TRANSFER,
            &crate::ibc::MsgTransfer {
                source_port: "transfer".to_string(),
                source_channel: "channel-0".to_string(),
                sender: "cosmos1from".to_string(),
                receiver: "osmo1to".to_string(),
                ..Default::default()
            },
        );
        let open = converter(&profile());
        let converted = open.to_legacy(&[transfer.clone()], false).unwrap();
        assert_eq!(converted[0]["type"], json!("cosmos-sdk/MsgTransfer"));

        let restricted = converter(&NetworkProfile {
            amino_prevent_types: vec!["/ibc.".to_string()],
            ..profile()
        });
        assert!(matches!(
            restricted.to_legacy(&[send(), transfer], true),
            Err(CosmosError::UnsupportedConversion(_))
        ));
        assert!(restricted.to_legacy(&[send()], true).is_ok());
    }
}
