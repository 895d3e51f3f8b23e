//! Contract bindings.
//!
//! A [`Binding`] pairs a deployed contract address with its [`Descriptor`].
//! It does no I/O by itself, capabilities come with the backend it is
//! combined with:
//!
//! - [`Caller`] invokes read-only calls through a [`ChainCaller`]
//! - [`Transactor`] submits transactions through a [`ChainTransactor`]
//! - [`Filterer`] queries and watches events through a [`LogSource`]
//!
//! [`ContractInstance`] gives all three over one backend. [`CallSession`]
//! and [`TransactSession`] preset the options of every call or transaction.
//!
//! # Example
//!
//! ```no_run
//! use alloy::{
//!     primitives::{Address, address},
//!     providers::ProviderBuilder,
//! };
//! use dydx_bindings::{CallOptions, ProviderBackend, abi::Contract, contract::Binding};
//!
//! # async fn example(oracle: Address) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new()
//!     .connect("https://ethereum-rpc.publicnode.com")
//!     .await?;
//! let perpetual = address!("0x07aBe965500A49370D331eCD613c7AC47dD6e547");
//!
//! // Oracle only serves the perpetual contract
//! let caller = Binding::new(oracle, Contract::IP1Oracle.descriptor()?)
//!     .caller(ProviderBackend::new(provider));
//! let price = caller
//!     .call("getPrice", &[], &CallOptions::new().from(perpetual))
//!     .await?
//!     .into_single()?;
//! println!("oracle price: {price:?}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    eips::BlockNumberOrTag,
    json_abi::StateMutability,
    primitives::{Address, Bytes},
    rpc::types::Log,
};

use crate::{
    backend::{ChainCaller, ChainTransactor, LogSource, PendingTx},
    descriptor::{Descriptor, DescriptorError, EventEntry},
    error::{Error, Result, RevertReason},
    event::{self, DecodedEvent, EventIterator, EventSubscription},
    options::{CallOptions, FilterOptions, TransactOptions, WatchOptions},
    value::CallOutput,
};

/// Deployed contract bound to its descriptor.
#[derive(Clone, Debug)]
pub struct Binding {
    address: Address,
    descriptor: Arc<Descriptor>,
}

impl Binding {
    pub fn new(address: Address, descriptor: Arc<Descriptor>) -> Self {
        Self {
            address,
            descriptor,
        }
    }

    /// Binds the contract to a descriptor parsed from JSON ABI.
    pub fn from_json(address: Address, abi: &str) -> std::result::Result<Self, DescriptorError> {
        Ok(Self::new(address, Arc::new(Descriptor::from_json(abi)?)))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    /// Calldata invoking the function with the given arguments.
    pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        let function = self.descriptor.resolve_function(name, args)?;
        Ok(function.encode_input(args)?.into())
    }

    /// Decodes the revert reason carried by the error, if it is a revert.
    pub fn revert_reason(&self, err: &Error) -> Option<RevertReason> {
        if !err.is_revert() {
            return None;
        }
        Some(
            err.revert_data()
                .map(|data| self.descriptor.decode_revert(data))
                .unwrap_or(RevertReason::Unknown),
        )
    }

    fn event(&self, name: &str) -> Result<&EventEntry> {
        self.descriptor
            .event(name)
            .ok_or_else(|| Error::UnknownEvent(name.to_string()))
    }

    pub fn caller<C: ChainCaller>(&self, backend: C) -> Caller<C> {
        Caller {
            binding: self.clone(),
            backend,
        }
    }

    pub fn transactor<T: ChainTransactor>(&self, backend: T) -> Transactor<T> {
        Transactor {
            binding: self.clone(),
            backend,
        }
    }

    pub fn filterer<L: LogSource>(&self, backend: L) -> Filterer<L> {
        Filterer {
            binding: self.clone(),
            backend,
        }
    }

    pub fn instance<B>(&self, backend: B) -> ContractInstance<B>
    where
        B: ChainCaller + ChainTransactor + LogSource + Clone,
    {
        ContractInstance {
            caller: self.caller(backend.clone()),
            transactor: self.transactor(backend.clone()),
            filterer: self.filterer(backend),
        }
    }
}

/// Read-only view of a contract.
#[derive(Clone, derive_more::Debug)]
pub struct Caller<C> {
    binding: Binding,
    #[debug(skip)]
    backend: C,
}

impl<C: ChainCaller> Caller<C> {
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Invokes the function without creating a transaction and decodes its
    /// outputs.
    ///
    /// Any function can be called this way, calling a state-changing one
    /// simulates it against the requested block.
    pub async fn call(
        &self,
        name: &str,
        args: &[DynSolValue],
        opts: &CallOptions,
    ) -> Result<CallOutput> {
        let function = self.binding.descriptor.resolve_function(name, args)?;
        let calldata = function.encode_input(args)?;
        tracing::trace!(
            contract = %self.binding.address,
            function = %function.signature(),
            "call"
        );
        let data = self
            .backend
            .call(self.binding.address, calldata.into(), opts)
            .await?;
        function.decode_output(&data)
    }

    /// Invokes the contract with prepared calldata, returns undecoded bytes.
    pub async fn call_raw(&self, calldata: Bytes, opts: &CallOptions) -> Result<Bytes> {
        Ok(self
            .backend
            .call(self.binding.address, calldata, opts)
            .await?)
    }

    /// Caller with the options preset for every call.
    pub fn with_options(&self, opts: CallOptions) -> CallSession<'_, C> {
        CallSession { caller: self, opts }
    }
}

/// [`Caller`] with preset [`CallOptions`].
#[derive(derive_more::Debug)]
pub struct CallSession<'a, C> {
    #[debug(skip)]
    caller: &'a Caller<C>,
    opts: CallOptions,
}

impl<C: ChainCaller> CallSession<'_, C> {
    pub fn options(&self) -> &CallOptions {
        &self.opts
    }

    pub async fn call(&self, name: &str, args: &[DynSolValue]) -> Result<CallOutput> {
        self.caller.call(name, args, &self.opts).await
    }

    pub async fn call_raw(&self, calldata: Bytes) -> Result<Bytes> {
        self.caller.call_raw(calldata, &self.opts).await
    }
}

/// Write-only view of a contract.
#[derive(Clone, derive_more::Debug)]
pub struct Transactor<T> {
    binding: Binding,
    #[debug(skip)]
    backend: T,
}

impl<T: ChainTransactor> Transactor<T> {
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Submits a transaction invoking the function.
    ///
    /// Returns as soon as the transaction is submitted.
    pub async fn transact(
        &self,
        name: &str,
        args: &[DynSolValue],
        opts: &TransactOptions,
    ) -> Result<PendingTx> {
        let function = self.binding.descriptor.resolve_function(name, args)?;
        if opts.has_value() && !function.is_payable() {
            return Err(Error::Encoding(format!(
                "{} is not payable, can not attach value",
                function.signature()
            )));
        }
        let calldata = function.encode_input(args)?;
        tracing::debug!(
            contract = %self.binding.address,
            function = %function.signature(),
            "submitting transaction"
        );
        self.send(calldata.into(), opts).await
    }

    /// Submits a transaction with prepared calldata.
    pub async fn transact_raw(&self, calldata: Bytes, opts: &TransactOptions) -> Result<PendingTx> {
        self.send(calldata, opts).await
    }

    /// Submits a transaction invoking the fallback function with arbitrary
    /// calldata.
    pub async fn fallback(&self, calldata: Bytes, opts: &TransactOptions) -> Result<PendingTx> {
        let fallback = self
            .binding
            .descriptor
            .fallback()
            .ok_or_else(|| Error::UnknownFunction("fallback".to_string()))?;
        if opts.has_value() && fallback.state_mutability != StateMutability::Payable {
            return Err(Error::Encoding(
                "fallback is not payable, can not attach value".to_string(),
            ));
        }
        self.send(calldata, opts).await
    }

    /// Submits a plain value transfer with empty calldata, handled by the
    /// receive function, or by the fallback if there is none.
    pub async fn transfer(&self, opts: &TransactOptions) -> Result<PendingTx> {
        let descriptor = &self.binding.descriptor;
        let payable = match (descriptor.receive(), descriptor.fallback()) {
            (Some(_), _) => true,
            (None, Some(fallback)) => fallback.state_mutability == StateMutability::Payable,
            (None, None) => return Err(Error::UnknownFunction("receive".to_string())),
        };
        if opts.has_value() && !payable {
            return Err(Error::Encoding(
                "contract can not receive value, fallback is not payable".to_string(),
            ));
        }
        self.send(Bytes::new(), opts).await
    }

    /// Transactor with the options preset for every transaction.
    pub fn with_options(&self, opts: TransactOptions) -> TransactSession<'_, T> {
        TransactSession {
            transactor: self,
            opts,
        }
    }

    async fn send(&self, calldata: Bytes, opts: &TransactOptions) -> Result<PendingTx> {
        let pending = self
            .backend
            .send_transaction(self.binding.address, calldata, opts)
            .await?;
        tracing::debug!(tx_hash = %pending.tx_hash(), "transaction submitted");
        Ok(pending)
    }
}

/// [`Transactor`] with preset [`TransactOptions`].
#[derive(derive_more::Debug)]
pub struct TransactSession<'a, T> {
    #[debug(skip)]
    transactor: &'a Transactor<T>,
    opts: TransactOptions,
}

impl<T: ChainTransactor> TransactSession<'_, T> {
    pub fn options(&self) -> &TransactOptions {
        &self.opts
    }

    pub async fn transact(&self, name: &str, args: &[DynSolValue]) -> Result<PendingTx> {
        self.transactor.transact(name, args, &self.opts).await
    }

    pub async fn transact_raw(&self, calldata: Bytes) -> Result<PendingTx> {
        self.transactor.transact_raw(calldata, &self.opts).await
    }

    pub async fn fallback(&self, calldata: Bytes) -> Result<PendingTx> {
        self.transactor.fallback(calldata, &self.opts).await
    }

    pub async fn transfer(&self) -> Result<PendingTx> {
        self.transactor.transfer(&self.opts).await
    }
}

/// Event view of a contract.
#[derive(Clone, derive_more::Debug)]
pub struct Filterer<L> {
    binding: Binding,
    #[debug(skip)]
    backend: L,
}

impl<L: LogSource> Filterer<L> {
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Queries past events over the block range.
    ///
    /// `rules` holds one list of accepted values per indexed parameter, an
    /// empty list matches any value.
    pub async fn filter(
        &self,
        name: &str,
        rules: &[Vec<DynSolValue>],
        opts: FilterOptions,
    ) -> Result<EventIterator> {
        let entry = self.binding.event(name)?;
        let filter = event::build_filter(self.binding.address, entry, rules)?
            .from_block(opts.from_block)
            .to_block(
                opts.to_block
                    .map(BlockNumberOrTag::Number)
                    .unwrap_or(BlockNumberOrTag::Latest),
            );
        let logs = self.backend.query_logs(&filter).await?;
        tracing::trace!(event = entry.binding_name(), logs = logs.len(), "queried logs");
        Ok(EventIterator::new(entry.clone(), logs))
    }

    /// Subscribes to future events, see [`EventSubscription`].
    ///
    /// Must be called within a tokio runtime.
    pub async fn watch(
        &self,
        name: &str,
        rules: &[Vec<DynSolValue>],
        opts: &WatchOptions,
    ) -> Result<EventSubscription> {
        let entry = self.binding.event(name)?;
        let mut filter = event::build_filter(self.binding.address, entry, rules)?;
        if let Some(from_block) = opts.from_block {
            filter = filter.from_block(from_block);
        }
        let logs = self.backend.subscribe_logs(filter).await?;
        Ok(EventSubscription::start(entry.clone(), logs, opts))
    }

    /// Decodes a log as the given event.
    pub fn parse(&self, name: &str, log: Log) -> Result<DecodedEvent> {
        self.binding.event(name)?.decode_log(log)
    }

    /// Decodes a log as whichever event of the contract its topic identifies.
    pub fn parse_any(&self, log: Log) -> Result<DecodedEvent> {
        self.binding.descriptor.decode_any_log(log)
    }
}

/// Contract with all capabilities over one backend.
#[derive(Clone, Debug)]
pub struct ContractInstance<B> {
    caller: Caller<B>,
    transactor: Transactor<B>,
    filterer: Filterer<B>,
}

impl<B> ContractInstance<B>
where
    B: ChainCaller + ChainTransactor + LogSource,
{
    pub fn binding(&self) -> &Binding {
        &self.caller.binding
    }

    pub fn address(&self) -> Address {
        self.caller.binding.address
    }

    pub fn caller(&self) -> &Caller<B> {
        &self.caller
    }

    pub fn transactor(&self) -> &Transactor<B> {
        &self.transactor
    }

    pub fn filterer(&self) -> &Filterer<B> {
        &self.filterer
    }

    pub async fn call(
        &self,
        name: &str,
        args: &[DynSolValue],
        opts: &CallOptions,
    ) -> Result<CallOutput> {
        self.caller.call(name, args, opts).await
    }

    pub async fn transact(
        &self,
        name: &str,
        args: &[DynSolValue],
        opts: &TransactOptions,
    ) -> Result<PendingTx> {
        self.transactor.transact(name, args, opts).await
    }

    pub async fn filter(
        &self,
        name: &str,
        rules: &[Vec<DynSolValue>],
        opts: FilterOptions,
    ) -> Result<EventIterator> {
        self.filterer.filter(name, rules, opts).await
    }

    pub async fn watch(
        &self,
        name: &str,
        rules: &[Vec<DynSolValue>],
        opts: &WatchOptions,
    ) -> Result<EventSubscription> {
        self.filterer.watch(name, rules, opts).await
    }

    pub fn parse(&self, name: &str, log: Log) -> Result<DecodedEvent> {
        self.filterer.parse(name, log)
    }
}
