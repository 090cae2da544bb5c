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

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the contract/slot configuration.
///
/// Every variant is fatal: a configuration that fails to load is never used partially.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML or does not have the expected shape
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A `contracts` key is not a chain ID
    #[error("invalid chain ID {0:?}")]
    InvalidChainId(String),

    /// A contract key is not an address
    #[error("invalid contract address {raw:?} on chain {chain_id}")]
    InvalidAddress {
        /// Chain the contract is listed under
        chain_id: u64,
        /// Key as written
        raw: String,
    },

    /// A slot key is not a word of at most 32 bytes
    #[error("invalid slot key {raw:?} in {context}")]
    InvalidSlotKey {
        /// Layout or contract the slot belongs to
        context: String,
        /// Key as written
        raw: String,
    },

    /// `slots` is neither a table nor a storage layout reference
    #[error("invalid slots for contract {address} on chain {chain_id}: {reason}")]
    InvalidSlots {
        /// Chain the contract is listed under
        chain_id: u64,
        /// Contract address
        address: String,
        /// What was wrong
        reason: String,
    },

    /// A storage layout reference names a layout that does not exist
    #[error("contract {address} on chain {chain_id} references unknown storage layout {name:?}")]
    UnknownLayout {
        /// Chain the contract is listed under
        chain_id: u64,
        /// Contract address
        address: String,
        /// Referenced layout name
        name: String,
    },
}
