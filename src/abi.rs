//! ABIs of the dYdX perpetual protocol contracts embedded into the crate.
//!
//! Descriptors are parsed once on first use and shared afterwards.

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use dashmap::DashMap;

use crate::descriptor::{Descriptor, DescriptorError};

static DESCRIPTORS: LazyLock<DashMap<Contract, Arc<Descriptor>>> = LazyLock::new(DashMap::new);

/// Contract with an embedded ABI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Contract {
    /// Upgradeable proxy the perpetual is deployed behind.
    AdminUpgradeabilityProxy,
    /// Interface of DEX wrappers used to swap collateral.
    IExchangeWrapper,
    /// Interface of a Maker medianizer.
    IMakerOracle,
    /// Interface of funding rate providers.
    IP1Funder,
    /// Interface of price oracles.
    IP1Oracle,
    /// Admin functions of the perpetual.
    P1Admin,
    /// Price oracle backed by a Chainlink aggregator.
    P1ChainlinkOracle,
    /// Proxy converting deposits and withdrawals between tokens.
    P1CurrencyConverterProxy,
    /// Trader contract for deleveraging underwater accounts.
    P1Deleveraging,
    /// Funding rate oracle.
    P1FundingOracle,
    /// Funding rate oracle of inverse perpetuals.
    P1InverseFundingOracle,
    /// Off-chain signed orders of inverse perpetuals.
    P1InverseOrders,
    /// Proxy for liquidating accounts with an insurance fund fee.
    P1LiquidatorProxy,
    /// Oracle mirroring a Maker medianizer.
    P1MirrorOracle,
    /// ETH-USD Maker medianizer mirror.
    P1MirrorOracleETHUSD,
    /// Local and global operator management.
    P1Operator,
    /// Oracle adapter inverting the price of another oracle.
    P1OracleInverter,
    /// Off-chain signed orders.
    P1Orders,
    /// Interest and funding settlement.
    P1Settlement,
    /// Bridge of funds between Solo and the perpetual.
    P1SoloBridgeProxy,
    /// Storage layout of the perpetual.
    P1Storage,
    /// Proxy depositing and withdrawing ETH as WETH.
    P1WethProxy,

    // Test doubles deployed by the protocol test suite
    TestChainlinkAggregator,
    TestExchangeWrapper,
    TestMakerOracle,
    TestP1Oracle,
    TestP1Trader,
    TestSolo,
}

impl Contract {
    pub const ALL: [Contract; 28] = [
        Self::AdminUpgradeabilityProxy,
        Self::IExchangeWrapper,
        Self::IMakerOracle,
        Self::IP1Funder,
        Self::IP1Oracle,
        Self::P1Admin,
        Self::P1ChainlinkOracle,
        Self::P1CurrencyConverterProxy,
        Self::P1Deleveraging,
        Self::P1FundingOracle,
        Self::P1InverseFundingOracle,
        Self::P1InverseOrders,
        Self::P1LiquidatorProxy,
        Self::P1MirrorOracle,
        Self::P1MirrorOracleETHUSD,
        Self::P1Operator,
        Self::P1OracleInverter,
        Self::P1Orders,
        Self::P1Settlement,
        Self::P1SoloBridgeProxy,
        Self::P1Storage,
        Self::P1WethProxy,
        Self::TestChainlinkAggregator,
        Self::TestExchangeWrapper,
        Self::TestMakerOracle,
        Self::TestP1Oracle,
        Self::TestP1Trader,
        Self::TestSolo,
    ];

    /// Contract name as it appears in the protocol sources.
    pub fn name(self) -> &'static str {
        match self {
            Self::AdminUpgradeabilityProxy => "AdminUpgradeabilityProxy",
            Self::IExchangeWrapper => "I_ExchangeWrapper",
            Self::IMakerOracle => "I_MakerOracle",
            Self::IP1Funder => "I_P1Funder",
            Self::IP1Oracle => "I_P1Oracle",
            Self::P1Admin => "P1Admin",
            Self::P1ChainlinkOracle => "P1ChainlinkOracle",
            Self::P1CurrencyConverterProxy => "P1CurrencyConverterProxy",
            Self::P1Deleveraging => "P1Deleveraging",
            Self::P1FundingOracle => "P1FundingOracle",
            Self::P1InverseFundingOracle => "P1InverseFundingOracle",
            Self::P1InverseOrders => "P1InverseOrders",
            Self::P1LiquidatorProxy => "P1LiquidatorProxy",
            Self::P1MirrorOracle => "P1MirrorOracle",
            Self::P1MirrorOracleETHUSD => "P1MirrorOracleETHUSD",
            Self::P1Operator => "P1Operator",
            Self::P1OracleInverter => "P1OracleInverter",
            Self::P1Orders => "P1Orders",
            Self::P1Settlement => "P1Settlement",
            Self::P1SoloBridgeProxy => "P1SoloBridgeProxy",
            Self::P1Storage => "P1Storage",
            Self::P1WethProxy => "P1WethProxy",
            Self::TestChainlinkAggregator => "Test_ChainlinkAggregator",
            Self::TestExchangeWrapper => "Test_ExchangeWrapper",
            Self::TestMakerOracle => "Test_MakerOracle",
            Self::TestP1Oracle => "Test_P1Oracle",
            Self::TestP1Trader => "Test_P1Trader",
            Self::TestSolo => "Test_Solo",
        }
    }

    /// JSON ABI of the contract.
    pub fn abi_json(self) -> &'static str {
        match self {
            Self::AdminUpgradeabilityProxy => include_str!("../abi/dydx/AdminUpgradeabilityProxy.json"),
            Self::IExchangeWrapper => include_str!("../abi/dydx/I_ExchangeWrapper.json"),
            Self::IMakerOracle => include_str!("../abi/dydx/I_MakerOracle.json"),
            Self::IP1Funder => include_str!("../abi/dydx/I_P1Funder.json"),
            Self::IP1Oracle => include_str!("../abi/dydx/I_P1Oracle.json"),
            Self::P1Admin => include_str!("../abi/dydx/P1Admin.json"),
            Self::P1ChainlinkOracle => include_str!("../abi/dydx/P1ChainlinkOracle.json"),
            Self::P1CurrencyConverterProxy => include_str!("../abi/dydx/P1CurrencyConverterProxy.json"),
            Self::P1Deleveraging => include_str!("../abi/dydx/P1Deleveraging.json"),
            Self::P1FundingOracle => include_str!("../abi/dydx/P1FundingOracle.json"),
            Self::P1InverseFundingOracle => include_str!("../abi/dydx/P1InverseFundingOracle.json"),
            Self::P1InverseOrders => include_str!("../abi/dydx/P1InverseOrders.json"),
            Self::P1LiquidatorProxy => include_str!("../abi/dydx/P1LiquidatorProxy.json"),
            Self::P1MirrorOracle => include_str!("../abi/dydx/P1MirrorOracle.json"),
            Self::P1MirrorOracleETHUSD => include_str!("../abi/dydx/P1MirrorOracleETHUSD.json"),
            Self::P1Operator => include_str!("../abi/dydx/P1Operator.json"),
            Self::P1OracleInverter => include_str!("../abi/dydx/P1OracleInverter.json"),
            Self::P1Orders => include_str!("../abi/dydx/P1Orders.json"),
            Self::P1Settlement => include_str!("../abi/dydx/P1Settlement.json"),
            Self::P1SoloBridgeProxy => include_str!("../abi/dydx/P1SoloBridgeProxy.json"),
            Self::P1Storage => include_str!("../abi/dydx/P1Storage.json"),
            Self::P1WethProxy => include_str!("../abi/dydx/P1WethProxy.json"),
            Self::TestChainlinkAggregator => include_str!("../abi/dydx/Test_ChainlinkAggregator.json"),
            Self::TestExchangeWrapper => include_str!("../abi/dydx/Test_ExchangeWrapper.json"),
            Self::TestMakerOracle => include_str!("../abi/dydx/Test_MakerOracle.json"),
            Self::TestP1Oracle => include_str!("../abi/dydx/Test_P1Oracle.json"),
            Self::TestP1Trader => include_str!("../abi/dydx/Test_P1Trader.json"),
            Self::TestSolo => include_str!("../abi/dydx/Test_Solo.json"),
        }
    }

    /// Parsed descriptor of the contract.
    pub fn descriptor(self) -> Result<Arc<Descriptor>, DescriptorError> {
        if let Some(descriptor) = DESCRIPTORS.get(&self) {
            return Ok(descriptor.clone());
        }
        let descriptor = Arc::new(Descriptor::from_json(self.abi_json())?);
        Ok(DESCRIPTORS.entry(self).or_insert(descriptor).clone())
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing unknown contract name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown contract: {0}")]
pub struct UnknownContract(pub String);

impl FromStr for Contract {
    type Err = UnknownContract;

    /// Case-insensitive, accepts both `I_P1Oracle` and `IP1Oracle` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "");
        Self::ALL
            .into_iter()
            .find(|c| c.name().replace('_', "").eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownContract(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_names() {
        assert_eq!(Contract::IP1Oracle.name(), "I_P1Oracle");
        assert_eq!(Contract::IP1Oracle.to_string(), "I_P1Oracle");
        assert_eq!("I_P1Oracle".parse::<Contract>().unwrap(), Contract::IP1Oracle);
        assert_eq!("ip1oracle".parse::<Contract>().unwrap(), Contract::IP1Oracle);
        assert_eq!("P1Orders".parse::<Contract>().unwrap(), Contract::P1Orders);
        assert!("P1Getters".parse::<Contract>().is_err());

        for contract in Contract::ALL {
            assert_eq!(contract.name().parse::<Contract>().unwrap(), contract);
        }
    }

    #[test]
    fn test_descriptor_is_cached() {
        let first = Contract::P1Orders.descriptor().unwrap();
        let second = Contract::P1Orders.descriptor().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
