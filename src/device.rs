use async_trait::async_trait;
use cosmos_sdk_proto::cosmos::tx::v1beta1::SignDoc;

use crate::amino::StdSignDoc;
use crate::errors::Result;

/// An account the signer can sign for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAccount {
    pub address: String,
    /// Compressed secp256k1 public key.
    pub pubkey: Vec<u8>,
    pub algo: String,
}

/// Response to a legacy sign request. `signed` is the document the device actually signed,
/// which may carry a different memo than the one requested.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacySignResponse {
    pub signed: StdSignDoc,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectSignResponse {
    pub signed: SignDoc,
    pub signature: Vec<u8>,
}

/// A hardware wallet or software signer.
#[async_trait]
pub trait SigningDevice: Send + Sync {
    fn supports_legacy_sign(&self) -> bool;

    fn supports_canonical_sign(&self) -> bool;

    async fn list_accounts(&self) -> Result<Vec<DeviceAccount>>;

    async fn sign_legacy(&self, address: &str, doc: StdSignDoc) -> Result<LegacySignResponse>;

    async fn sign_canonical(&self, address: &str, doc: SignDoc) -> Result<DirectSignResponse>;
}
