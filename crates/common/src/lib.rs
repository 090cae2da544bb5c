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

//! statediff common - shared functionality for statediff components
//!
//! This crate provides the pieces shared by the state store, the execution
//! driver and the binary: logging setup, environment variable names, fork
//! setup against a live RPC endpoint and hardfork selection.

/// EVM context helpers: context type alias and validation relaxations for simulation
pub mod context;
/// Environment variable names used across statediff
pub mod env;
/// Fork setup: connecting to the RPC endpoint and pinning the latest block
pub mod forking;
/// Logging setup and utilities for consistent logging across statediff components
pub mod logging;
/// `SpecId` tables for selecting the hardfork of a supported chain
pub mod spec_id;

pub use context::*;
pub use forking::*;
pub use logging::*;
pub use spec_id::*;
