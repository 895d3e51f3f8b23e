//! Ethereum contract bindings for the dYdX perpetual protocol.
//!
//! # Overview
//!
//! Generic runtime bindings driven by contract ABIs instead of per-contract
//! generated code.
//!
//! Parse an ABI into [`Descriptor`] (or take one of the embedded
//! [`abi::Contract`] ones), bind it to the deployed address with
//! [`contract::Binding`], then combine the binding with a chain backend:
//!
//! * [`contract::Caller`] for read-only calls decoded into [`CallOutput`]
//! * [`contract::Transactor`] for transaction submission
//! * [`contract::Filterer`] for historical ([`EventIterator`]) and live
//!   ([`EventSubscription`]) events
//!
//! Arguments and results are dynamically typed ABI values, see [`value`].
//! Overloaded functions get unique binding names, see [`descriptor`].
//!
//! The binding layer never retries: every operation returns the first
//! [`Error`] it encounters.
//!
//! # Backends
//!
//! Chain access is injected through the [`backend`] traits.
//! [`ProviderBackend`] implements them on top of an alloy provider, live
//! events are served by polling logs block by block, see [`stream::logs`].
//!
//! # Testing
//!
//! [`testing::MockChain`] is an in-memory backend with canned call responses,
//! recorded transactions and a log store. See `./tests` for examples.

pub mod abi;
pub mod backend;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod options;
pub mod stream;
pub mod testing;
pub mod value;

pub use backend::{ChainCaller, ChainTransactor, LogSource, PendingTx, ProviderBackend};
pub use contract::{
    Binding, CallSession, Caller, ContractInstance, Filterer, TransactSession, Transactor,
};
pub use descriptor::{Descriptor, DescriptorError, EventEntry, FunctionEntry};
pub use error::{Error, RemoteError, Result, RevertReason};
pub use event::{DecodedEvent, EventIterator, EventSubscription};
pub use options::{CallOptions, FilterOptions, TransactOptions, WatchOptions};
pub use value::CallOutput;
