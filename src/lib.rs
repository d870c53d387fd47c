//! Cosmos SDK transaction assembly and signing for KeepKey and other signers.
//!
//! Messages are signed in legacy amino JSON mode when the chain and the signer allow it,
//! falling back to canonical protobuf (direct) signing otherwise, then broadcast over the
//! LCD REST API with confirmation polling.

pub mod account;
pub mod amino;
pub mod broadcast;
pub mod client;
pub mod decimal;
pub mod device;
pub mod errors;
pub mod fee;
pub mod ibc;
pub mod logging;
pub mod network;
pub mod query;
pub mod registry;
pub mod rest;
pub mod signing;
pub mod types;

pub use account::resolve_account;
pub use amino::{AminoConverter, AminoMsg, AminoTable, StdSignDoc};
pub use broadcast::{Broadcaster, ConfirmConfig};
pub use client::SigningClient;
pub use decimal::Decimal;
pub use device::{DeviceAccount, DirectSignResponse, LegacySignResponse, SigningDevice};
pub use errors::{CosmosError, Result};
pub use fee::{calculate_fee, get_fee, GasPrice};
pub use network::{GasPriceLevel, NetworkProfile};
pub use query::{BroadcastMode, LedgerQuery};
pub use registry::{MessageRegistry, TypedPayload};
pub use rest::RestClient;
pub use signing::{SignMode, SignOutcome, SignState, SigningOrchestrator};
pub use types::{Account, Coin, ConfirmedResult, Fee, Message, SignedTx};
