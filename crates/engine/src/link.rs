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

//! Simulation link parsing.
//!
//! A simulation link carries the call to simulate in its query string: `from`,
//! `contractAddress`, `rawFunctionInput`, and optionally `stateOverrides` (JSON) and
//! `network`.

use crate::PayloadError;
use alloy_primitives::{Address, Bytes};
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

/// Parameters of the call to simulate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationParams {
    /// Sender of the call
    pub from: Address,
    /// Called contract
    pub contract: Address,
    /// Call data
    pub input: Bytes,
    /// Raw JSON of the storage overrides, if any
    pub state_overrides: Option<String>,
    /// Network the link was produced for, as written in the link
    pub network: Option<String>,
}

impl SimulationParams {
    /// Parameters for a call without overrides.
    pub fn new(from: Address, contract: Address, input: Bytes) -> Self {
        Self { from, contract, input, state_overrides: None, network: None }
    }

    /// Set the raw JSON storage overrides
    pub fn with_state_overrides(mut self, overrides: impl Into<String>) -> Self {
        self.state_overrides = Some(overrides.into());
        self
    }

    /// Set the network identifier
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Parse the query string of a simulation link.
    ///
    /// A missing `from` falls back to the zero address.
    pub fn from_link(link: &str) -> Result<Self, PayloadError> {
        let url = Url::parse(link).map_err(|e| PayloadError::InvalidLink(e.to_string()))?;

        let mut from = None;
        let mut contract = None;
        let mut input = None;
        let mut params = Self::new(Address::ZERO, Address::ZERO, Bytes::new());

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "from" => from = Some(parse_address("from", &value)?),
                "contractAddress" => contract = Some(parse_address("contractAddress", &value)?),
                "rawFunctionInput" => input = Some(parse_bytes("rawFunctionInput", &value)?),
                "stateOverrides" if !value.trim().is_empty() => {
                    params.state_overrides = Some(value.into_owned())
                }
                "network" => params.network = Some(value.into_owned()),
                other => debug!("Ignoring simulation link parameter {other:?}"),
            }
        }

        params.contract = contract.ok_or(PayloadError::MissingParameter("contractAddress"))?;
        params.input = input.ok_or(PayloadError::MissingParameter("rawFunctionInput"))?;
        params.from = from.unwrap_or_else(|| {
            warn!("Simulation link has no sender, simulating from the zero address");
            Address::ZERO
        });

        Ok(params)
    }

    /// Chain ID the link was produced for, when it is numeric.
    pub fn network_chain_id(&self) -> Option<u64> {
        self.network.as_deref().and_then(|network| network.trim().parse().ok())
    }
}

impl FromStr for SimulationParams {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_link(s)
    }
}

/// Parse an address parameter.
pub fn parse_address(name: &'static str, value: &str) -> Result<Address, PayloadError> {
    value
        .trim()
        .parse()
        .map_err(|e| PayloadError::InvalidParameter { name, reason: format!("{e}") })
}

/// Parse a hex bytes parameter, with or without `0x`.
pub fn parse_bytes(name: &'static str, value: &str) -> Result<Bytes, PayloadError> {
    let value = value.trim();
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map(Bytes::from)
        .map_err(|e| PayloadError::InvalidParameter { name, reason: e.to_string() })
}
