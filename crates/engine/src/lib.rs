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

//! statediff engine - simulation of a signing task
//!
//! The engine turns the output of a task script into a simulated state diff:
//!
//! - [`payload`] pulls the EIP-712 signing data out of the script output
//! - [`link`] parses the simulation link describing the call
//! - [`transaction`] builds the call and identifies the target Safe
//! - [`simulate`] runs the call on a caching state store and collects the diffs
//! - [`core`] ties the steps together against a live RPC endpoint

/// Engine configuration and the end-to-end workflow
pub mod core;
pub use core::*;

/// Error types of the engine
pub mod error;
pub use error::*;

/// Inspectors observing the simulated call
pub mod inspector;
pub use inspector::*;

/// Simulation link parsing
pub mod link;
pub use link::*;

/// Signing payload extraction
pub mod payload;
pub use payload::*;

/// The execution driver
pub mod simulate;
pub use simulate::*;

/// Transaction construction and Multicall3 decoding
pub mod transaction;
pub use transaction::*;
