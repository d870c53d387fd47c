#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin as ProtoCoin;
use cosmos_sdk_proto::cosmos::tx::v1beta1::SignDoc;
use cosmrs::AccountId;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use keepkey_cosmos::registry::type_urls;
use keepkey_cosmos::{
    BroadcastMode, ConfirmedResult, CosmosError, DeviceAccount, DirectSignResponse,
    LedgerQuery, LegacySignResponse, Message, NetworkProfile, Result, SigningDevice, StdSignDoc,
};

pub const LEGACY_SIGNATURE: [u8; 64] = [0xAA; 64];
pub const DIRECT_SIGNATURE: [u8; 64] = [0xBB; 64];

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn address(seed: u8) -> String {
    AccountId::new("cosmos", &[seed; 20])
        .expect("Failed to build address")
        .to_string()
}

pub fn profile() -> NetworkProfile {
    NetworkProfile {
        rest_url: "http://localhost:1317".to_string(),
        authz_amino_support: true,
        ..NetworkProfile::new("cosmoshub", "cosmoshub-4", "cosmos", "uatom")
    }
}

pub fn send_msg(from: &str, to: &str, amount: &str) -> Message {
    Message::from_proto(
        type_urls::MSG_SEND,
        &MsgSend {
            from_address: from.to_string(),
            to_address: to.to_string(),
            amount: vec![ProtoCoin {
                denom: "uatom".to_string(),
                amount: amount.to_string(),
            }],
        },
    )
}

pub fn account_json(address: &str, account_number: u64, sequence: u64) -> Value {
    json!({
        "@type": "/cosmos.auth.v1beta1.BaseAccount",
        "address": address,
        "pub_key": null,
        "account_number": account_number.to_string(),
        "sequence": sequence.to_string()
    })
}

pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

pub fn found(hash: &str, code: u32) -> ConfirmedResult {
    ConfirmedResult {
        code,
        height: 1200,
        raw_log: if code == 0 { "[]".to_string() } else { "out of gas".to_string() },
        transaction_hash: hash.to_string(),
        gas_used: 81_000,
        gas_wanted: 120_000,
        codespace: if code == 0 { String::new() } else { "sdk".to_string() },
    }
}

/// Signer double with configurable capabilities that records every request.
pub struct FakeDevice {
    pub legacy: bool,
    pub canonical: bool,
    pub accounts: Vec<DeviceAccount>,
    /// Memo the device puts into the returned legacy sign doc, as a user edit would.
    pub amended_memo: Option<String>,
    pub legacy_calls: AtomicUsize,
    pub canonical_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub last_legacy_doc: Mutex<Option<StdSignDoc>>,
    pub last_direct_doc: Mutex<Option<SignDoc>>,
}

impl FakeDevice {
    pub fn new(legacy: bool, canonical: bool, address: &str) -> Self {
        Self {
            legacy,
            canonical,
            accounts: vec![DeviceAccount {
                address: address.to_string(),
                pubkey: vec![0x02; 33],
                algo: "secp256k1".to_string(),
            }],
            amended_memo: None,
            legacy_calls: AtomicUsize::new(0),
            canonical_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            last_legacy_doc: Mutex::new(None),
            last_direct_doc: Mutex::new(None),
        }
    }

    pub fn legacy_calls(&self) -> usize {
        self.legacy_calls.load(Ordering::SeqCst)
    }

    pub fn canonical_calls(&self) -> usize {
        self.canonical_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningDevice for FakeDevice {
    fn supports_legacy_sign(&self) -> bool {
        self.legacy
    }

    fn supports_canonical_sign(&self) -> bool {
        self.canonical
    }

    async fn list_accounts(&self) -> Result<Vec<DeviceAccount>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn sign_legacy(&self, _address: &str, doc: StdSignDoc) -> Result<LegacySignResponse> {
        self.legacy_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_legacy_doc.lock().unwrap() = Some(doc.clone());
        let mut signed = doc;
        if let Some(memo) = &self.amended_memo {
            signed.memo = memo.clone();
        }
        Ok(LegacySignResponse {
            signed,
            signature: LEGACY_SIGNATURE.to_vec(),
        })
    }

    async fn sign_canonical(&self, _address: &str, doc: SignDoc) -> Result<DirectSignResponse> {
        self.canonical_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_direct_doc.lock().unwrap() = Some(doc.clone());
        Ok(DirectSignResponse {
            signed: doc,
            signature: DIRECT_SIGNATURE.to_vec(),
        })
    }
}

/// Ledger double. `get_tx` answers from a queue and reports "not found" once it is empty.
pub struct FakeLedger {
    pub account: Mutex<Option<Value>>,
    pub tx_results: Mutex<VecDeque<Result<Option<ConfirmedResult>>>>,
    /// When unset, broadcasts succeed with the hash of the submitted bytes.
    pub broadcast_response: Mutex<Option<ConfirmedResult>>,
    pub simulate_gas: u64,
    /// Simulation fails as if the node could not be reached.
    pub simulate_unreachable: bool,
    pub account_calls: AtomicUsize,
    pub get_tx_calls: AtomicUsize,
    pub simulate_calls: AtomicUsize,
    pub broadcast_calls: AtomicUsize,
    pub last_simulated: Mutex<Option<Vec<u8>>>,
    pub last_broadcast: Mutex<Option<(Vec<u8>, BroadcastMode)>>,
}

impl FakeLedger {
    pub fn new(account: Option<Value>) -> Self {
        Self {
            account: Mutex::new(account),
            tx_results: Mutex::new(VecDeque::new()),
            broadcast_response: Mutex::new(None),
            simulate_gas: 100_000,
            simulate_unreachable: false,
            account_calls: AtomicUsize::new(0),
            get_tx_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            broadcast_calls: AtomicUsize::new(0),
            last_simulated: Mutex::new(None),
            last_broadcast: Mutex::new(None),
        }
    }

    pub fn push_tx_result(&self, result: Result<Option<ConfirmedResult>>) {
        self.tx_results.lock().unwrap().push_back(result);
    }

    pub fn push_not_found(&self, times: usize) {
        for _ in 0..times {
            self.push_tx_result(Ok(None));
        }
    }

    pub fn get_tx_calls(&self) -> usize {
        self.get_tx_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerQuery for FakeLedger {
    async fn get_account(&self, _address: &str) -> Result<Option<Value>> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.account.lock().unwrap().clone())
    }

    async fn get_tx(&self, _hash: &str) -> Result<Option<ConfirmedResult>> {
        self.get_tx_calls.fetch_add(1, Ordering::SeqCst);
        self.tx_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> Result<u64> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_simulated.lock().unwrap() = Some(tx_bytes.to_vec());
        if self.simulate_unreachable {
            return Err(CosmosError::Transport("connection refused".to_string()));
        }
        if self.simulate_gas == 0 {
            return Err(CosmosError::SimulationFailed("out of gas".to_string()));
        }
        Ok(self.simulate_gas)
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8], mode: BroadcastMode) -> Result<ConfirmedResult> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_broadcast.lock().unwrap() = Some((tx_bytes.to_vec(), mode));
        let configured = self.broadcast_response.lock().unwrap().clone();
        Ok(configured.unwrap_or_else(|| ConfirmedResult {
            transaction_hash: tx_hash(tx_bytes),
            ..ConfirmedResult::default()
        }))
    }
}
