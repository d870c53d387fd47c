//! IBC transfer messages. `cosmos-sdk-proto` does not ship the ibc-go packages, so the two
//! types needed for ICS-20 transfers are declared here with their upstream field tags.

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use prost::Message;

/// ibc.core.client.v1.Height
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// ibc.applications.transfer.v1.MsgTransfer
#[derive(Clone, PartialEq, Message)]
pub struct MsgTransfer {
    #[prost(string, tag = "1")]
    pub source_port: String,
    #[prost(string, tag = "2")]
    pub source_channel: String,
    #[prost(message, optional, tag = "3")]
    pub token: Option<Coin>,
    #[prost(string, tag = "4")]
    pub sender: String,
    #[prost(string, tag = "5")]
    pub receiver: String,
    #[prost(message, optional, tag = "6")]
    pub timeout_height: Option<Height>,
    /// Nanoseconds since the epoch; 0 disables the timestamp timeout.
    #[prost(uint64, tag = "7")]
    pub timeout_timestamp: u64,
    #[prost(string, tag = "8")]
    pub memo: String,
}
