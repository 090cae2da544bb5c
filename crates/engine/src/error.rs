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

//! Error types for payload extraction and simulation.

use alloy_primitives::Bytes;
use revm::context::result::HaltReason;
use statediff_state::StateError;

/// Errors raised while reading the script output or the simulation link
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The start marker does not occur in the input
    #[error("marker {0:?} not found in script output")]
    MissingPrefix(String),
    /// The end marker does not follow the start marker
    #[error("marker {0:?} not found after the signing data")]
    MissingSuffix(String),
    /// The signing data is not valid hex
    #[error("signing data is not valid hex: {0}")]
    InvalidHex(String),
    /// The decoded signing data has the wrong size
    #[error("expected 66 bytes of EIP-712 signing data, got {0}")]
    InvalidLength(usize),
    /// No simulation link in the input
    #[error("no simulation link starting with {0:?} found")]
    MissingLink(String),
    /// The simulation link is not a valid URL
    #[error("invalid simulation link: {0}")]
    InvalidLink(String),
    /// A required simulation parameter is absent
    #[error("simulation link has no {0:?} parameter")]
    MissingParameter(&'static str),
    /// A simulation parameter could not be parsed
    #[error("invalid {name:?} parameter: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors raised while simulating the call
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The call reverted
    #[error("transaction reverted during simulation (gas used {gas_used}): 0x{}", hex::encode(output))]
    Reverted {
        /// Gas consumed before the revert
        gas_used: u64,
        /// Revert data
        output: Bytes,
    },
    /// The call halted, e.g. out of gas
    #[error("transaction halted during simulation (gas used {gas_used}): {reason:?}")]
    Halted {
        /// Gas consumed before the halt
        gas_used: u64,
        /// Why execution stopped
        reason: HaltReason,
    },
    /// revm rejected the transaction or the database failed
    #[error("EVM execution failed: {0}")]
    Evm(String),
    /// The state store failed under the strict fetch policy
    #[error(transparent)]
    State(#[from] StateError),
    /// The call data could not be interpreted
    #[error("invalid call data: {0}")]
    InvalidCalldata(String),
}
