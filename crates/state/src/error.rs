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

use crate::StateKind;
use alloy_primitives::Address;
use revm::database_interface::DBErrorMarker;

/// Failure reported by a [`crate::StateFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Create a new error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Create from any displayable error
    pub fn from_error<E: std::fmt::Display>(err: E) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors surfaced by the state store to the EVM.
///
/// The store only returns these under [`crate::FetchPolicy::Strict`]; in the default policy
/// fetch failures are logged and replaced by zero values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Account state could not be fetched
    #[error("failed to fetch {kind} of {address}: {source}")]
    Fetch {
        /// What was being fetched
        kind: StateKind,
        /// Account the value belongs to
        address: Address,
        /// Underlying fetch failure
        source: FetchError,
    },
    /// A historical block hash could not be fetched
    #[error("failed to fetch hash of block {number}: {source}")]
    BlockHash {
        /// Requested block number
        number: u64,
        /// Underlying fetch failure
        source: FetchError,
    },
}

impl DBErrorMarker for StateError {}
