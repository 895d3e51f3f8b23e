//! In-memory chain backend and test utilities.
//!
//! [`MockChain`] implements all chain interfaces without a node: calls are
//! answered from canned responses keyed by calldata, transactions are
//! recorded, historical logs are served from a log store and live logs are
//! fed to subscriptions by the test itself with [`MockChain::emit`].

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use alloy::{
    primitives::{self, Address, Bytes, LogData, keccak256},
    rpc::types::{Filter, Log},
};
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::{
    backend::{ChainCaller, ChainTransactor, LogSource, LogStream, PendingTx},
    error::RemoteError,
    options::{CallOptions, TransactOptions},
};

/// Read-only call received by [`MockChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub to: Address,
    pub calldata: Bytes,
    pub opts: CallOptions,
}

/// Transaction submitted to [`MockChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTx {
    pub to: Address,
    pub calldata: Bytes,
    pub opts: TransactOptions,
    pub tx_hash: primitives::TxHash,
}

type LogSender = mpsc::UnboundedSender<Result<Log, RemoteError>>;

/// In-memory chain backend, clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MockChain {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    responses: DashMap<Bytes, Result<Bytes, RemoteError>>,
    calls: Mutex<Vec<RecordedCall>>,
    transactions: Mutex<Vec<RecordedTx>>,
    reject_next: Mutex<Option<String>>,
    logs: Mutex<Vec<Log>>,
    subscribers: Mutex<Vec<(Filter, LogSender)>>,
    tx_count: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers calls with the given calldata with the given returned data.
    pub fn respond(&self, calldata: impl Into<Bytes>, data: impl Into<Bytes>) {
        self.inner.responses.insert(calldata.into(), Ok(data.into()));
    }

    /// Fails calls with the given calldata with the given error.
    pub fn respond_error(&self, calldata: impl Into<Bytes>, err: RemoteError) {
        self.inner.responses.insert(calldata.into(), Err(err));
    }

    /// Rejects the next submitted transaction before "broadcast".
    pub fn reject_next(&self, reason: impl Into<String>) {
        *lock(&self.inner.reject_next) = Some(reason.into());
    }

    /// Adds the log to the historical log store.
    pub fn push_log(&self, log: Log) {
        lock(&self.inner.logs).push(log);
    }

    /// Adds the log to the store and delivers it to matching live
    /// subscriptions.
    pub fn emit(&self, log: Log) {
        self.push_log(log.clone());
        let mut subscribers = lock(&self.inner.subscribers);
        subscribers.retain(|(filter, tx)| {
            !matches(filter, &log) || tx.send(Ok(log.clone())).is_ok()
        });
    }

    /// Terminates every live subscription with the error.
    pub fn fail_subscriptions(&self, err: RemoteError) {
        for (_, tx) in lock(&self.inner.subscribers).drain(..) {
            let _ = tx.send(Err(err.clone()));
        }
    }

    /// Ends every live subscription.
    pub fn close_subscriptions(&self) {
        lock(&self.inner.subscribers).clear();
    }

    /// Number of live subscriptions still listening.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.inner.subscribers);
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.inner.calls).clone()
    }

    pub fn transactions(&self) -> Vec<RecordedTx> {
        lock(&self.inner.transactions).clone()
    }
}

/// Builds mined log emitted by the contract.
pub fn log(address: Address, data: LogData, block_number: u64, log_index: u64) -> Log {
    Log {
        inner: primitives::Log { address, data },
        block_number: Some(block_number),
        log_index: Some(log_index),
        transaction_index: Some(0),
        transaction_hash: Some(keccak256(
            [block_number.to_be_bytes(), log_index.to_be_bytes()].concat(),
        )),
        ..Default::default()
    }
}

fn matches(filter: &Filter, log: &Log) -> bool {
    if !filter.address.matches(&log.address()) {
        return false;
    }
    let topics = log.topics();
    let topics_match = filter.topics.iter().enumerate().all(|(idx, rule)| {
        rule.is_empty() || topics.get(idx).is_some_and(|topic| rule.matches(topic))
    });
    if !topics_match {
        return false;
    }
    let block = log.block_number.unwrap_or_default();
    filter.get_from_block().is_none_or(|from| block >= from)
        && filter.get_to_block().is_none_or(|to| block <= to)
}

impl ChainCaller for MockChain {
    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &CallOptions,
    ) -> Result<Bytes, RemoteError> {
        lock(&self.inner.calls).push(RecordedCall {
            to,
            calldata: calldata.clone(),
            opts: *opts,
        });
        match self.inner.responses.get(&calldata) {
            Some(response) => response.clone(),
            None => Err(RemoteError::Reverted {
                message: "execution reverted".to_string(),
                data: None,
            }),
        }
    }
}

impl ChainTransactor for MockChain {
    async fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &TransactOptions,
    ) -> Result<PendingTx, RemoteError> {
        if let Some(reason) = lock(&self.inner.reject_next).take() {
            return Err(RemoteError::Rejected(reason));
        }
        let count = self.inner.tx_count.fetch_add(1, Ordering::Relaxed);
        let tx_hash = keccak256(
            [to.as_slice(), &calldata[..], &count.to_be_bytes()[..]].concat(),
        );
        lock(&self.inner.transactions).push(RecordedTx {
            to,
            calldata,
            opts: *opts,
            tx_hash,
        });
        Ok(PendingTx::new(tx_hash))
    }
}

impl LogSource for MockChain {
    async fn query_logs(&self, filter: &Filter) -> Result<Vec<Log>, RemoteError> {
        Ok(lock(&self.inner.logs)
            .iter()
            .filter(|log| matches(filter, log))
            .cloned()
            .collect())
    }

    async fn subscribe_logs(&self, filter: Filter) -> Result<LogStream, RemoteError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        lock(&self.inner.subscribers).push((filter, tx));
        Ok(futures::stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed())
    }
}
