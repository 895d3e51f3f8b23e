//! Error types of the `dydx_abi` tool.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("Invalid contract ABI: {0}")]
    Descriptor(#[from] dydx_bindings::DescriptorError),

    #[error("{0}")]
    Bindings(#[from] dydx_bindings::Error),

    #[error("Alloy transport error: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    #[error("Alloy signer error: {0}")]
    AlloySigner(#[from] alloy::signers::local::LocalSignerError),

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    #[error("Sending transactions requires PRIVATE_KEY to be set")]
    NoSigner,
}

pub type Result<T> = std::result::Result<T, Error>;
