//! Sign mode selection and tx envelope assembly.
//!
//! Legacy amino signing is preferred whenever every message converts and the device can
//! sign amino; otherwise the canonical protobuf sign doc is used.

use std::fmt;
use std::sync::Arc;

use cosmos_sdk_proto::cosmos::crypto::secp256k1::PubKey;
use cosmos_sdk_proto::cosmos::tx::signing::v1beta1::SignMode as ProtoSignMode;
use cosmos_sdk_proto::cosmos::tx::v1beta1::mode_info::{Single, Sum};
use cosmos_sdk_proto::cosmos::tx::v1beta1::{AuthInfo, ModeInfo, SignDoc, SignerInfo, TxBody};
use cosmos_sdk_proto::Any;
use prost::Message as ProstMessage;

use crate::amino::{AminoConverter, AminoTable, StdSignDoc};
use crate::device::SigningDevice;
use crate::errors::{CosmosError, Result};
use crate::network::{NetworkProfile, ETHERMINT_COIN_TYPE};
use crate::registry::MessageRegistry;
use crate::types::{Account, Fee, Message, SignedTx};

pub const ETHERMINT_PUBKEY_TYPE_URL: &str = "/ethermint.crypto.v1.ethsecp256k1.PubKey";
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    Direct,
    LegacyAminoJson,
    Unspecified,
}

impl SignMode {
    pub fn as_proto(self) -> ProtoSignMode {
        match self {
            SignMode::Direct => ProtoSignMode::Direct,
            SignMode::LegacyAminoJson => ProtoSignMode::LegacyAminoJson,
            SignMode::Unspecified => ProtoSignMode::Unspecified,
        }
    }
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignMode::Direct => "SIGN_MODE_DIRECT",
            SignMode::LegacyAminoJson => "SIGN_MODE_LEGACY_AMINO_JSON",
            SignMode::Unspecified => "SIGN_MODE_UNSPECIFIED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignState {
    Unsigned,
    LegacyAttempted,
    ModeSelected(SignMode),
    Signed(SignMode),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignOutcome {
    pub tx: SignedTx,
    pub mode: SignMode,
    /// Why amino conversion was refused, when signing fell back to direct mode.
    pub legacy_fallback_reason: Option<String>,
    pub transitions: Vec<SignState>,
}

struct StateLog {
    states: Vec<SignState>,
}

impl StateLog {
    fn new() -> Self {
        log::debug!("Sign state: {:?}", SignState::Unsigned);
        Self {
            states: vec![SignState::Unsigned],
        }
    }

    fn push(&mut self, next: SignState) {
        if let Some(previous) = self.states.last() {
            log::debug!("Sign state: {:?} -> {:?}", previous, next);
        }
        self.states.push(next);
    }

    fn fail(&mut self, err: CosmosError) -> CosmosError {
        log::warn!("Signing failed: {}", err);
        self.push(SignState::Failed);
        err
    }
}

pub struct SigningOrchestrator {
    profile: Arc<NetworkProfile>,
    registry: Arc<MessageRegistry>,
    amino: AminoConverter,
    device: Arc<dyn SigningDevice>,
}

impl fmt::Debug for SigningOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningOrchestrator")
            .field("chain_id", &self.profile.chain_id)
            .field("amino", &self.amino)
            .finish()
    }
}

impl SigningOrchestrator {
    pub fn new(
        profile: Arc<NetworkProfile>,
        table: Arc<AminoTable>,
        device: Arc<dyn SigningDevice>,
    ) -> Result<Self> {
        let registry = table.registry().clone();
        let amino = AminoConverter::new(table, &profile)?;
        Ok(Self {
            profile,
            registry,
            amino,
            device,
        })
    }

    pub fn converter(&self) -> &AminoConverter {
        &self.amino
    }

    pub async fn sign(
        &self,
        account: &Account,
        msgs: &[Message],
        fee: &Fee,
        memo: &str,
    ) -> Result<SignOutcome> {
        let fee = Fee::new(fee.amount.clone(), fee.gas_limit);
        let mut states = StateLog::new();

        let body_bytes = self.body_bytes(msgs, memo).map_err(|e| states.fail(e))?;

        let (legacy_msgs, legacy_fallback_reason) =
            match self.amino.to_legacy(msgs, self.device.supports_canonical_sign()) {
                Ok(converted) => (Some(converted), None),
                Err(e) => {
                    log::warn!("Amino conversion unavailable, trying direct signing: {}", e);
                    (None, Some(e.to_string()))
                }
            };
        states.push(SignState::LegacyAttempted);

        let (tx, mode) = match legacy_msgs {
            Some(converted) if self.device.supports_legacy_sign() => {
                states.push(SignState::ModeSelected(SignMode::LegacyAminoJson));
                let tx = self
                    .sign_legacy(account, msgs, converted, &fee, memo)
                    .await
                    .map_err(|e| states.fail(e))?;
                (tx, SignMode::LegacyAminoJson)
            }
            _ if self.device.supports_canonical_sign() => {
                states.push(SignState::ModeSelected(SignMode::Direct));
                let tx = self
                    .sign_direct(account, body_bytes, &fee)
                    .await
                    .map_err(|e| states.fail(e))?;
                (tx, SignMode::Direct)
            }
            _ => return Err(states.fail(CosmosError::NoSupportedSignMode)),
        };

        states.push(SignState::Signed(mode));
        log::info!(
            "Signed {} message(s) for {} with {}",
            msgs.len(),
            account.address,
            mode
        );
        Ok(SignOutcome {
            tx,
            mode,
            legacy_fallback_reason,
            transitions: states.states,
        })
    }

    async fn sign_legacy(
        &self,
        account: &Account,
        msgs: &[Message],
        converted: Vec<serde_json::Value>,
        fee: &Fee,
        memo: &str,
    ) -> Result<SignedTx> {
        let doc = StdSignDoc::new(
            converted,
            fee,
            &self.profile.chain_id,
            memo,
            account.account_number,
            account.sequence,
        );
        let response = self.device.sign_legacy(&account.address, doc).await?;
        let auth_info_bytes = self
            .auth_info_bytes(account, fee, SignMode::LegacyAminoJson)
            .await?;
        Ok(SignedTx {
            body_bytes: self.body_bytes(msgs, &response.signed.memo)?,
            auth_info_bytes,
            signatures: vec![response.signature],
        })
    }

    async fn sign_direct(&self, account: &Account, body_bytes: Vec<u8>, fee: &Fee) -> Result<SignedTx> {
        let auth_info_bytes = self.auth_info_bytes(account, fee, SignMode::Direct).await?;
        let doc = SignDoc {
            body_bytes,
            auth_info_bytes,
            chain_id: self.profile.chain_id.clone(),
            account_number: account.account_number,
        };
        let response = self.device.sign_canonical(&account.address, doc).await?;
        Ok(SignedTx {
            body_bytes: response.signed.body_bytes,
            auth_info_bytes: response.signed.auth_info_bytes,
            signatures: vec![response.signature],
        })
    }

    /// Unsigned envelope for gas estimation: unspecified sign mode, one empty signature.
    pub async fn simulate(
        &self,
        account: &Account,
        msgs: &[Message],
        fee: &Fee,
        memo: &str,
    ) -> Result<SignedTx> {
        let fee = Fee::new(fee.amount.clone(), fee.gas_limit);
        Ok(SignedTx {
            body_bytes: self.body_bytes(msgs, memo)?,
            auth_info_bytes: self
                .auth_info_bytes(account, &fee, SignMode::Unspecified)
                .await?,
            signatures: vec![Vec::new()],
        })
    }

    pub fn body_bytes(&self, msgs: &[Message], memo: &str) -> Result<Vec<u8>> {
        let messages = msgs
            .iter()
            .map(|msg| self.registry.encode_any(msg))
            .collect::<Result<Vec<Any>>>()?;
        let body = TxBody {
            messages,
            memo: memo.to_string(),
            ..Default::default()
        };
        Ok(body.encode_to_vec())
    }

    pub async fn auth_info_bytes(&self, account: &Account, fee: &Fee, mode: SignMode) -> Result<Vec<u8>> {
        let accounts = self.device.list_accounts().await?;
        let signer = accounts
            .iter()
            .find(|candidate| candidate.address == account.address)
            .or_else(|| accounts.first())
            .ok_or_else(|| CosmosError::Device("Failed to retrieve account from signer".to_string()))?;

        let public_key = Any {
            type_url: self.pubkey_type_url(account),
            value: PubKey {
                key: signer.pubkey.clone(),
            }
            .encode_to_vec(),
        };
        let signer_info = SignerInfo {
            public_key: Some(public_key),
            mode_info: Some(ModeInfo {
                sum: Some(Sum::Single(Single {
                    mode: mode.as_proto() as i32,
                })),
            }),
            sequence: account.sequence,
        };
        let auth_info = AuthInfo {
            signer_infos: vec![signer_info],
            fee: Some(fee.to_proto()),
            ..Default::default()
        };
        Ok(auth_info.encode_to_vec())
    }

    pub fn pubkey_type_url(&self, account: &Account) -> String {
        if let Some(pub_key) = &account.pub_key {
            if !pub_key.type_url.is_empty() {
                return pub_key.type_url.clone();
            }
        }
        if let Some(type_url) = self.profile.pubkey_type_url_override() {
            return type_url.to_string();
        }
        if self.profile.coin_type == ETHERMINT_COIN_TYPE {
            return ETHERMINT_PUBKEY_TYPE_URL.to_string();
        }
        SECP256K1_PUBKEY_TYPE_URL.to_string()
    }
}
