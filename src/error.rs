use std::fmt::Display;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Bytes, U256},
    transports,
};

use crate::descriptor::DescriptorError;

pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by binding operations.
///
/// Every operation surfaces the first error it encounters, nothing is
/// retried or swallowed: retry/backoff policy belongs to the backend
/// (e.g. [`alloy::transports::layers::RetryBackoffLayer`]) or to the caller.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("remote call failed: {0}")]
    RemoteCall(RemoteError),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("subscription task failed: {0}")]
    Subscription(String),
}

impl Error {
    /// Raw revert data if the error is a contract revert that carried any.
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Self::RemoteCall(RemoteError::Reverted { data, .. }) => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, Self::RemoteCall(RemoteError::Reverted { .. }))
    }
}

impl From<RemoteError> for Error {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Rejected(reason) => Self::Rejected(reason),
            other => Self::RemoteCall(other),
        }
    }
}

/// Call/transaction revert reason decoded against the contract descriptor,
/// see [`crate::descriptor::Descriptor::decode_revert`].
#[derive(Clone, Debug, PartialEq)]
pub enum RevertReason {
    /// Standard `Error(string)` revert.
    Message(String),

    /// Solidity `Panic(uint256)` with its code.
    Panic(U256),

    /// Custom error declared in the contract ABI.
    Custom { name: String, args: Vec<DynSolValue> },

    /// Revert data not matching any known error.
    Raw(Bytes),

    /// Reverted without any data.
    Unknown,
}

/// Error reported by the injected chain backend.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("execution reverted: {message}")]
    Reverted { message: String, data: Option<Bytes> },

    /// Transaction refused before broadcast.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Node error messages meaning the transaction never left the node.
const REJECTION_MARKERS: [&str; 8] = [
    "nonce too low",
    "nonce too high",
    "insufficient funds",
    "replacement transaction underpriced",
    "already known",
    "exceeds block gas limit",
    "intrinsic gas too low",
    "less than block base fee",
];

impl<E: Display> From<transports::RpcError<E>> for RemoteError {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                let msg = resp.message.to_ascii_lowercase();
                if REJECTION_MARKERS.iter().any(|marker| msg.contains(marker)) {
                    Self::Rejected(resp.message.to_string())
                } else if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    // Heuristic to determine if eth_call failed due to OutOfGas or
                    // if transaction was reverted during the gas estimation
                    Self::OutOfGas
                } else if ((resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found")))
                    || (resp.code == -32603
                        && (msg.contains("block by number") || msg.contains("getting block")))
                {
                    Self::InvalidRequest(msg)
                } else if resp.code == 3 || msg.contains("reverted") {
                    Self::Reverted {
                        message: resp.message.to_string(),
                        data: resp.as_revert_data(),
                    }
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}
