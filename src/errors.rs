use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CosmosError {
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Unknown amino type: {0}")]
    UnknownLegacyType(String),

    #[error("Unsupported amino conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Unable to sign message with this wallet/signer")]
    NoSupportedSignMode,

    #[error("Account {0} does not exist on chain")]
    AccountNotFound(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error(
        "Transaction with ID {hash} was submitted but was not yet found on the chain. \
         You might want to check later. There was a wait of {}.",
        waited(.elapsed)
    )]
    ConfirmationTimeout { hash: String, elapsed: Duration },

    #[error("Transaction {hash} failed with code {code}: {raw_log}")]
    TransactionRejected {
        hash: String,
        code: u32,
        raw_log: String,
    },

    #[error("Signing device error: {0}")]
    Device(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("Invalid gas price: {0}")]
    InvalidGasPrice(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CosmosError {
    /// True when the transaction may still land and should be re-queried, not resubmitted.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, CosmosError::ConfirmationTimeout { .. })
    }

    /// True when the error only disables amino signing for the current call.
    pub fn is_conversion_fallback(&self) -> bool {
        matches!(self, CosmosError::UnsupportedConversion(_))
    }
}

fn waited(elapsed: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
}

pub type Result<T> = std::result::Result<T, CosmosError>;
