//! Pass-through options of calls, transactions and log queries.
//!
//! None of these are interpreted by the binding layer itself, they are
//! handed over to the backend as is.

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    primitives::{Address, U256},
};

/// Default capacity of the event delivery channel of live subscriptions.
const DEFAULT_CHANNEL_SIZE: usize = 100;

/// Options of read-only calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallOptions {
    /// Address the call is made from.
    pub from: Option<Address>,

    /// Block to execute the call at.
    pub block: BlockId,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            from: None,
            block: BlockId::Number(BlockNumberOrTag::Latest),
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Historical call at the given block.
    pub fn at_block(mut self, block: impl Into<BlockId>) -> Self {
        self.block = block.into();
        self
    }

    /// Call against the pending state.
    pub fn pending(mut self) -> Self {
        self.block = BlockId::Number(BlockNumberOrTag::Pending);
        self
    }
}

/// Options of state-changing transactions.
///
/// Unset fields are left for the backend to fill (nonce management, gas
/// estimation and signing are done there).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactOptions {
    /// Signing identity, backend default signer if not set.
    pub from: Option<Address>,

    /// Wei attached to the transaction.
    pub value: Option<U256>,

    pub gas_limit: Option<u64>,

    /// Legacy gas price.
    pub gas_price: Option<u128>,

    pub max_fee_per_gas: Option<u128>,

    pub max_priority_fee_per_gas: Option<u128>,

    pub nonce: Option<u64>,
}

impl TransactOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn eip1559_fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Whether any non-zero value is attached.
    pub fn has_value(&self) -> bool {
        self.value.is_some_and(|v| !v.is_zero())
    }
}

/// Block range of historical log queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// First block of the range, inclusive.
    pub from_block: u64,

    /// Last block of the range, inclusive. Chain head if not set.
    pub to_block: Option<u64>,
}

impl FilterOptions {
    pub fn new(from_block: u64) -> Self {
        Self {
            from_block,
            to_block: None,
        }
    }

    pub fn range(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block: Some(to_block),
        }
    }
}

/// Options of live log subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchOptions {
    /// Block to start watching from, next block after the chain head if not set.
    pub from_block: Option<u64>,

    /// Skip logs that fail to decode instead of terminating the subscription.
    pub skip_malformed: bool,

    /// Capacity of the event delivery channel.
    pub channel_size: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            from_block: None,
            skip_malformed: false,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed = skip;
        self
    }

    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }
}
