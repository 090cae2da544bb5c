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

//! Environment variable name constants for statediff configuration.
//!
//! These constants are the single source of truth for environment variable names; the CLI
//! binds them to flags through clap's `env` attribute.
//!
//! # Environment Variables
//!
//! - [`ETH_RPC_URL`] - RPC endpoint used for forking
//! - [`STATEDIFF_CONFIG`] - Path to the contracts/slots configuration document
//! - [`STATEDIFF_LINK_HOST`] - Prefix identifying the simulation link in script output

/// Environment variable holding the RPC endpoint.
///
/// Shared with the wider Ethereum tooling ecosystem (forge, cast), so an existing `.env`
/// works unchanged.
///
/// # Examples
///
/// ```bash
/// ETH_RPC_URL=https://eth.llamarpc.com statediff -- forge script SignTask
/// ```
pub const ETH_RPC_URL: &str = "ETH_RPC_URL";

/// Environment variable for the configuration document path.
///
/// # Default
///
/// When not set, `config/contracts.yaml` relative to the working directory is used.
pub const STATEDIFF_CONFIG: &str = "STATEDIFF_CONFIG";

/// Environment variable overriding the host prefix used to locate the simulation link.
///
/// # Default
///
/// `https://dashboard.tenderly.co`
pub const STATEDIFF_LINK_HOST: &str = "STATEDIFF_LINK_HOST";
