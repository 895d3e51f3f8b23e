//! Chain interfaces the bindings are injected with.
//!
//! The binding layer never talks to a node directly: reads go through
//! [`ChainCaller`], transactions through [`ChainTransactor`] and logs
//! through [`LogSource`]. [`ProviderBackend`] implements all three on top of
//! an [`alloy::providers::Provider`], [`crate::testing::MockChain`] in memory.

mod provider;

use std::{future::Future, sync::Arc};

use alloy::{
    primitives::{Address, Bytes, TxHash},
    rpc::types::{Filter, Log},
};
use futures::stream::BoxStream;

use crate::{
    error::RemoteError,
    options::{CallOptions, TransactOptions},
};

pub use provider::ProviderBackend;

/// Unbounded stream of raw logs, dropping it unsubscribes.
///
/// An `Err` item is terminal for the subscription.
pub type LogStream = BoxStream<'static, Result<Log, RemoteError>>;

/// Handle of a submitted transaction.
///
/// Submission only, inclusion has to be tracked separately (e.g. with
/// [`alloy::providers::PendingTransactionBuilder`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PendingTx {
    tx_hash: TxHash,
}

impl PendingTx {
    pub fn new(tx_hash: TxHash) -> Self {
        Self { tx_hash }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }
}

/// Read-only query interface.
pub trait ChainCaller: Send + Sync {
    /// Executes the call without creating a transaction and returns the raw
    /// returned bytes.
    fn call(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &CallOptions,
    ) -> impl Future<Output = Result<Bytes, RemoteError>> + Send;
}

/// Transaction submission interface.
pub trait ChainTransactor: Send + Sync {
    /// Signs and broadcasts the transaction. Pre-broadcast refusals are
    /// reported as [`RemoteError::Rejected`].
    fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &TransactOptions,
    ) -> impl Future<Output = Result<PendingTx, RemoteError>> + Send;
}

/// Log source interface.
pub trait LogSource: Send + Sync {
    /// Bounded historical query.
    fn query_logs(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Log>, RemoteError>> + Send;

    /// Live subscription to logs matching the filter, in source order.
    fn subscribe_logs(
        &self,
        filter: Filter,
    ) -> impl Future<Output = Result<LogStream, RemoteError>> + Send;
}

impl<T: ChainCaller> ChainCaller for Arc<T> {
    fn call(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &CallOptions,
    ) -> impl Future<Output = Result<Bytes, RemoteError>> + Send {
        (**self).call(to, calldata, opts)
    }
}

impl<T: ChainTransactor> ChainTransactor for Arc<T> {
    fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &TransactOptions,
    ) -> impl Future<Output = Result<PendingTx, RemoteError>> + Send {
        (**self).send_transaction(to, calldata, opts)
    }
}

impl<T: LogSource> LogSource for Arc<T> {
    fn query_logs(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Log>, RemoteError>> + Send {
        (**self).query_logs(filter)
    }

    fn subscribe_logs(
        &self,
        filter: Filter,
    ) -> impl Future<Output = Result<LogStream, RemoteError>> + Send {
        (**self).subscribe_logs(filter)
    }
}
