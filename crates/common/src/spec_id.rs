// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hardfork specification ID mapping for the supported chains
//!
//! Simulations only run against chains whose activation schedule is known here.
//! Each schedule maps the first block of a hardfork to its [`SpecId`].

use revm::primitives::{
    eip4844::{BLOB_BASE_FEE_UPDATE_FRACTION_CANCUN, BLOB_BASE_FEE_UPDATE_FRACTION_PRAGUE},
    hardfork::SpecId,
};
use std::{collections::BTreeMap, fmt, sync::LazyLock};

/// Chain ID of Ethereum mainnet
pub const MAINNET_CHAIN_ID: u64 = 1;
/// Chain ID of the Sepolia testnet
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Ethereum mainnet hardforks keyed by their starting block number
static MAINNET_HARDFORKS: LazyLock<BTreeMap<u64, SpecId>> = LazyLock::new(|| {
    [
        (0, SpecId::FRONTIER),
        (1_150_000, SpecId::HOMESTEAD),
        (2_463_000, SpecId::TANGERINE),
        (2_675_000, SpecId::SPURIOUS_DRAGON),
        (4_370_000, SpecId::BYZANTIUM),
        // Constantinople was replaced by Petersburg at the same height
        (7_280_000, SpecId::PETERSBURG),
        (9_069_000, SpecId::ISTANBUL),
        (12_244_000, SpecId::BERLIN),
        (12_965_000, SpecId::LONDON),
        (13_773_000, SpecId::ARROW_GLACIER),
        (15_050_000, SpecId::GRAY_GLACIER),
        (15_537_394, SpecId::MERGE),
        (17_034_870, SpecId::SHANGHAI),
        (19_426_589, SpecId::CANCUN),
        (22_431_084, SpecId::PRAGUE),
    ]
    .into_iter()
    .collect()
});

/// Sepolia hardforks keyed by their starting block number
static SEPOLIA_HARDFORKS: LazyLock<BTreeMap<u64, SpecId>> = LazyLock::new(|| {
    [
        (0, SpecId::LONDON),
        (1_735_371, SpecId::MERGE),
        (2_990_908, SpecId::SHANGHAI),
        (5_187_023, SpecId::CANCUN),
        (7_836_331, SpecId::PRAGUE),
    ]
    .into_iter()
    .collect()
});

/// Error returned when a chain has no known hardfork schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported chain ID: {0}")]
pub struct UnsupportedChainError(pub u64);

/// A chain the simulator knows how to configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    /// Ethereum mainnet
    Mainnet,
    /// Sepolia testnet
    Sepolia,
}

impl SupportedChain {
    /// Resolve a chain ID, failing for chains without a hardfork schedule.
    pub fn from_chain_id(chain_id: u64) -> Result<Self, UnsupportedChainError> {
        match chain_id {
            MAINNET_CHAIN_ID => Ok(Self::Mainnet),
            SEPOLIA_CHAIN_ID => Ok(Self::Sepolia),
            other => Err(UnsupportedChainError(other)),
        }
    }

    /// The numeric chain ID.
    pub fn chain_id(self) -> u64 {
        match self {
            Self::Mainnet => MAINNET_CHAIN_ID,
            Self::Sepolia => SEPOLIA_CHAIN_ID,
        }
    }

    /// Hardfork active at `block_number`.
    pub fn spec_id(self, block_number: u64) -> SpecId {
        let schedule = match self {
            Self::Mainnet => &*MAINNET_HARDFORKS,
            Self::Sepolia => &*SEPOLIA_HARDFORKS,
        };
        schedule
            .range(..=block_number)
            .last()
            .map(|(_, spec_id)| *spec_id)
            .unwrap_or(SpecId::FRONTIER)
    }
}

impl fmt::Display for SupportedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => f.write_str("mainnet"),
            Self::Sepolia => f.write_str("sepolia"),
        }
    }
}

/// Get the SpecId for a given block number on Ethereum mainnet
pub fn get_mainnet_spec_id(block_number: u64) -> SpecId {
    SupportedChain::Mainnet.spec_id(block_number)
}

/// Get the SpecId for a block of the given chain.
pub fn get_spec_id(chain_id: u64, block_number: u64) -> Result<SpecId, UnsupportedChainError> {
    Ok(SupportedChain::from_chain_id(chain_id)?.spec_id(block_number))
}

/// Human readable hardfork name
pub fn hardfork_name(spec_id: SpecId) -> &'static str {
    match spec_id {
        SpecId::FRONTIER => "Frontier",
        SpecId::HOMESTEAD => "Homestead",
        SpecId::TANGERINE => "Tangerine Whistle",
        SpecId::SPURIOUS_DRAGON => "Spurious Dragon",
        SpecId::BYZANTIUM => "Byzantium",
        SpecId::CONSTANTINOPLE => "Constantinople",
        SpecId::PETERSBURG => "Petersburg",
        SpecId::ISTANBUL => "Istanbul",
        SpecId::BERLIN => "Berlin",
        SpecId::LONDON => "London",
        SpecId::ARROW_GLACIER => "Arrow Glacier",
        SpecId::GRAY_GLACIER => "Gray Glacier",
        SpecId::MERGE => "The Merge",
        SpecId::SHANGHAI => "Shanghai",
        SpecId::CANCUN => "Cancun",
        SpecId::PRAGUE => "Prague",
        _ => "Unknown",
    }
}

/// Returns the blob base fee update fraction based on the spec id.
pub fn get_blob_base_fee_update_fraction_by_spec_id(spec: SpecId) -> u64 {
    if spec >= SpecId::PRAGUE {
        BLOB_BASE_FEE_UPDATE_FRACTION_PRAGUE
    } else {
        BLOB_BASE_FEE_UPDATE_FRACTION_CANCUN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_spec_id() {
        assert_eq!(get_mainnet_spec_id(0), SpecId::FRONTIER);
        assert_eq!(get_mainnet_spec_id(1_149_999), SpecId::FRONTIER);
        assert_eq!(get_mainnet_spec_id(1_150_000), SpecId::HOMESTEAD);

        // Petersburg, not Constantinople
        assert_eq!(get_mainnet_spec_id(7_279_999), SpecId::BYZANTIUM);
        assert_eq!(get_mainnet_spec_id(7_280_000), SpecId::PETERSBURG);

        assert_eq!(get_mainnet_spec_id(15_537_394), SpecId::MERGE);
        assert_eq!(get_mainnet_spec_id(19_426_589), SpecId::CANCUN);
        assert_eq!(get_mainnet_spec_id(22_431_083), SpecId::CANCUN);
        assert_eq!(get_mainnet_spec_id(22_431_084), SpecId::PRAGUE);
        assert_eq!(get_mainnet_spec_id(u64::MAX), SpecId::PRAGUE);
    }

    #[test]
    fn test_sepolia_spec_id() {
        let sepolia = SupportedChain::from_chain_id(SEPOLIA_CHAIN_ID).unwrap();
        assert_eq!(sepolia, SupportedChain::Sepolia);
        assert_eq!(sepolia.spec_id(0), SpecId::LONDON);
        assert_eq!(sepolia.spec_id(5_187_023), SpecId::CANCUN);
        assert_eq!(sepolia.spec_id(8_000_000), SpecId::PRAGUE);
    }

    #[test]
    fn test_unsupported_chain() {
        let err = get_spec_id(10, 1).unwrap_err();
        assert_eq!(err, UnsupportedChainError(10));
        assert_eq!(err.to_string(), "unsupported chain ID: 10");
    }

    #[test]
    fn test_blob_fraction_switches_at_prague() {
        assert_eq!(
            get_blob_base_fee_update_fraction_by_spec_id(SpecId::CANCUN),
            BLOB_BASE_FEE_UPDATE_FRACTION_CANCUN
        );
        assert_eq!(
            get_blob_base_fee_update_fraction_by_spec_id(SpecId::PRAGUE),
            BLOB_BASE_FEE_UPDATE_FRACTION_PRAGUE
        );
        assert_eq!(hardfork_name(SpecId::PRAGUE), "Prague");
    }
}
