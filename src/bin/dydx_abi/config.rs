//! Configuration of the `dydx_abi` tool.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): connection details, keys
//! - CLI arguments: the command to run

use std::time::Duration;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use clap::{Parser, Subcommand};
use dydx_bindings::abi::Contract;
use url::Url;

/// Default poll interval of live event subscriptions.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Wildcard accepting any value of an indexed event parameter.
const ANY_VALUE: &str = "*";

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// RPC URL of the node
    pub node_rpc_url: String,

    /// Interval of polling for new blocks while watching events
    pub poll_interval_ms: Option<u64>,

    /// Private key for signing transactions, only needed by `send`
    pub private_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Poll interval must be positive")]
    InvalidPollInterval,

    #[error("Event has {expected} indexed parameter(s), got {got} --indexed value(s)")]
    TooManyIndexedValues { expected: usize, got: usize },

    #[error("Invalid indexed value {value:?} for {ty}: {reason}")]
    InvalidIndexedValue {
        value: String,
        ty: String,
        reason: String,
    },
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Parse the node RPC URL.
    pub fn node_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.node_rpc_url)
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        match self.poll_interval_ms {
            Some(0) => Err(ConfigError::InvalidPollInterval),
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
        }
    }

    /// Parse the private key, if set.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>, alloy::signers::local::LocalSignerError> {
        self.private_key.as_deref().map(str::parse).transpose()
    }
}

/// Inspect and interact with dYdX perpetual contracts.
#[derive(Debug, Parser)]
#[command(name = "dydx_abi")]
#[command(about = "Inspect and interact with dYdX perpetual contracts")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List contracts with embedded ABIs
    List,

    /// Print functions, events and errors of a contract
    Describe { contract: Contract },

    /// Print calldata of a function call
    Encode {
        contract: Contract,
        function: String,
        /// Function arguments, given after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Invoke a function without creating a transaction
    Call {
        contract: Contract,
        address: Address,
        function: String,
        /// Function arguments, given after `--`
        #[arg(last = true)]
        args: Vec<String>,

        /// Address to call from
        #[arg(long)]
        from: Option<Address>,

        /// Block to call at (default: latest)
        #[arg(long)]
        block: Option<u64>,
    },

    /// Submit a transaction invoking a function
    Send {
        contract: Contract,
        address: Address,
        function: String,
        /// Function arguments, given after `--`
        #[arg(last = true)]
        args: Vec<String>,

        /// Wei to attach
        #[arg(long)]
        value: Option<U256>,
    },

    /// Print past events
    Logs {
        contract: Contract,
        address: Address,
        event: String,

        /// Accepted values of the indexed parameters in declaration order,
        /// alternatives separated by `|`, `*` accepts any value
        #[arg(long)]
        indexed: Vec<String>,

        #[arg(long)]
        from_block: u64,

        /// Last block (default: latest)
        #[arg(long)]
        to_block: Option<u64>,
    },

    /// Follow new events
    Watch {
        contract: Contract,
        address: Address,
        event: String,

        /// Same as for `logs`
        #[arg(long)]
        indexed: Vec<String>,

        /// First block (default: next block)
        #[arg(long)]
        from_block: Option<u64>,

        /// Skip logs that fail to decode instead of stopping
        #[arg(long)]
        skip_malformed: bool,
    },
}

/// Parses `--indexed` values into per-position filter rules.
pub fn indexed_rules(
    types: &[DynSolType],
    raw: &[String],
) -> Result<Vec<Vec<DynSolValue>>, ConfigError> {
    if raw.len() > types.len() {
        return Err(ConfigError::TooManyIndexedValues {
            expected: types.len(),
            got: raw.len(),
        });
    }
    types
        .iter()
        .zip(raw)
        .map(|(ty, rule)| {
            if rule.trim() == ANY_VALUE {
                return Ok(Vec::new());
            }
            rule.split('|')
                .map(|value| {
                    ty.coerce_str(value.trim())
                        .map_err(|err| ConfigError::InvalidIndexedValue {
                            value: value.to_string(),
                            ty: ty.to_string(),
                            reason: err.to_string(),
                        })
                })
                .collect()
        })
        .collect()
}
