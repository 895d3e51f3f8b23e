use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxKind},
    providers::Provider,
    rpc::types::{Filter, Log, TransactionInput, TransactionRequest},
};
use futures::StreamExt;

use super::{ChainCaller, ChainTransactor, LogSource, LogStream, PendingTx};
use crate::{
    error::RemoteError,
    options::{CallOptions, TransactOptions},
    stream,
};

/// Chain backend on top of an alloy [`Provider`].
///
/// Transactions are signed by the wallet the provider is set up with.
/// It is recommended to setup provider with
/// [`alloy::transports::layers::RetryBackoffLayer`], the bindings never retry.
///
/// Live log subscriptions are served by polling, see [`stream::logs`], so
/// plain HTTP transport is enough.
#[derive(Clone, derive_more::Debug)]
pub struct ProviderBackend<P> {
    #[debug(skip)]
    provider: P,
    poll_interval: Option<Duration>,
}

impl<P: Provider + Clone + 'static> ProviderBackend<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            poll_interval: None,
        }
    }

    /// Overrides the provider-configured poll interval of live subscriptions.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
            .unwrap_or_else(|| self.provider.client().poll_interval())
    }
}

fn request(to: Address, calldata: Bytes) -> TransactionRequest {
    let mut tx = TransactionRequest::default();
    tx.to = Some(TxKind::Call(to));
    tx.input = TransactionInput::new(calldata);
    tx
}

impl<P: Provider + Clone + 'static> ChainCaller for ProviderBackend<P> {
    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &CallOptions,
    ) -> Result<Bytes, RemoteError> {
        let mut tx = request(to, calldata);
        tx.from = opts.from;
        self.provider
            .call(tx)
            .block(opts.block)
            .await
            .map_err(RemoteError::from)
    }
}

impl<P: Provider + Clone + 'static> ChainTransactor for ProviderBackend<P> {
    async fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
        opts: &TransactOptions,
    ) -> Result<PendingTx, RemoteError> {
        let mut tx = request(to, calldata);
        tx.from = opts.from;
        tx.value = opts.value;
        tx.gas = opts.gas_limit;
        tx.gas_price = opts.gas_price;
        tx.max_fee_per_gas = opts.max_fee_per_gas;
        tx.max_priority_fee_per_gas = opts.max_priority_fee_per_gas;
        tx.nonce = opts.nonce;

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(RemoteError::from)?;
        Ok(PendingTx::new(*pending.tx_hash()))
    }
}

impl<P: Provider + Clone + 'static> LogSource for ProviderBackend<P> {
    async fn query_logs(&self, filter: &Filter) -> Result<Vec<Log>, RemoteError> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(RemoteError::from)
    }

    async fn subscribe_logs(&self, filter: Filter) -> Result<LogStream, RemoteError> {
        let from_block = match filter.get_from_block() {
            Some(block) => block,
            None => {
                self.provider
                    .get_block_number()
                    .await
                    .map_err(RemoteError::from)?
                    + 1
            }
        };
        Ok(stream::logs(
            self.provider.clone(),
            filter,
            from_block,
            self.poll_interval(),
            tokio::time::sleep,
        )
        .boxed())
    }
}
