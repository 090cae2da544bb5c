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

//! Core engine: from task script output to a simulated state diff.
//!
//! # Workflow Overview
//!
//! 1. **Extraction**: Find the signing data and the simulation link in the script output
//! 2. **Forking**: Connect to the RPC endpoint and pin its latest block
//! 3. **Execution**: Run the call on a caching store with the link's overrides applied
//! 4. **Collection**: Hand the diffs, overrides and preimages to the report builder

use crate::{
    extract_signing_payload, find_simulation_link, simulate, target_safe, PayloadError,
    SigningPayload, SimulationOutcome, SimulationParams, DEFAULT_GAS_LIMIT, DEFAULT_LINK_HOST,
    DEFAULT_PREFIX, DEFAULT_SUFFIX,
};
use alloy_primitives::Address;
use eyre::Result;
use statediff_common::{connect_provider, fork_latest, ForkInfo};
use statediff_state::{CachingStateStore, FetchPolicy, RpcStateFetcher};
use tracing::{debug, info};

/// Configuration for the simulation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Gas limit of the simulated call
    pub gas_limit: u64,
    /// What to do when a state fetch fails
    pub fetch_policy: FetchPolicy,
    /// Marker printed before the signing data
    pub prefix: String,
    /// Marker printed after the signing data
    pub suffix: String,
    /// Host prefix of the simulation link
    pub link_host: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            fetch_policy: FetchPolicy::default(),
            prefix: DEFAULT_PREFIX.into(),
            suffix: DEFAULT_SUFFIX.into(),
            link_host: DEFAULT_LINK_HOST.into(),
        }
    }
}

impl EngineConfig {
    /// Set the gas limit of the simulated call
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set the fetch failure policy
    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Set the signing data markers
    pub fn with_markers(mut self, prefix: String, suffix: String) -> Self {
        self.prefix = prefix;
        self.suffix = suffix;
        self
    }

    /// Set the host prefix of the simulation link
    pub fn with_link_host(mut self, host: String) -> Self {
        self.link_host = host;
        self
    }
}

/// What a task script announced it wants signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTask {
    /// Hashes shown by the signing device
    pub payload: SigningPayload,
    /// Call described by the simulation link
    pub params: SimulationParams,
}

/// A finished simulation against a live endpoint
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// The pinned block
    pub fork_info: ForkInfo,
    /// Safe that signs the call
    pub target_safe: Address,
    /// Diffs and auxiliary data of the call
    pub outcome: SimulationOutcome,
}

/// The simulation engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine from configuration
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pull the signing payload and the simulation link out of task script output.
    pub fn extract(&self, output: &str) -> Result<ExtractedTask, PayloadError> {
        let payload = extract_signing_payload(output, &self.config.prefix, &self.config.suffix)?;
        let link = find_simulation_link(output, &self.config.link_host)
            .ok_or_else(|| PayloadError::MissingLink(self.config.link_host.clone()))?;
        debug!("Found simulation link {link}");
        let params = SimulationParams::from_link(link)?;
        Ok(ExtractedTask { payload, params })
    }

    /// Fork the latest block behind `rpc_url` and simulate `params` on it.
    pub async fn run(&self, rpc_url: &str, params: &SimulationParams) -> Result<SimulationRun> {
        let safe = target_safe(params.contract, &params.input)?;
        info!("Target Safe is {safe}");

        let provider = connect_provider(rpc_url).await?;
        let fork_info = fork_latest(&provider).await?;

        let fetcher = RpcStateFetcher::new(provider, fork_info.block_number)?;
        let store = CachingStateStore::new(fetcher).with_policy(self.config.fetch_policy);
        let outcome = simulate(store, &fork_info, params, self.config.gas_limit)?;

        Ok(SimulationRun { fork_info, target_safe: safe, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn script_output(host: &str) -> String {
        format!(
            "Simulating...\nvvvvvvvv\n0x1901{}{}\n^^^^^^^^\nSimulation link: {host}/u/p/simulator/new?network=1&contractAddress=0x9855054731540a48b28990b63dcf4f33d8ae46a1&from=0x1804c8AB1F12E6bbf3894d4083f33e07309d1f38&rawFunctionInput=0x1234\nDone\n",
            "11".repeat(32),
            "22".repeat(32)
        )
    }

    #[test]
    fn test_extract_task() {
        let engine = Engine::default();
        let task = engine.extract(&script_output(DEFAULT_LINK_HOST)).unwrap();

        assert_eq!(task.payload.domain_hash.0, [0x11; 32]);
        assert_eq!(task.payload.message_hash.0, [0x22; 32]);
        assert_eq!(task.params.contract, address!("9855054731540a48b28990b63dcf4f33d8ae46a1"));
        assert_eq!(task.params.input.as_ref(), &[0x12, 0x34]);
        assert_eq!(task.params.network_chain_id(), Some(1));
    }

    #[test]
    fn test_extract_with_custom_link_host() {
        let engine = Engine::new(
            EngineConfig::default().with_link_host("https://sim.example.org".to_string()),
        );
        assert!(engine.extract(&script_output("https://sim.example.org")).is_ok());

        let err = engine.extract(&script_output(DEFAULT_LINK_HOST)).unwrap_err();
        assert_eq!(err, PayloadError::MissingLink("https://sim.example.org".to_string()));
    }

    #[test]
    fn test_extract_with_custom_markers() {
        let engine = Engine::new(
            EngineConfig::default().with_markers("<<<".to_string(), ">>>".to_string()),
        );
        let output = script_output(DEFAULT_LINK_HOST)
            .replace("vvvvvvvv", "<<<")
            .replace("^^^^^^^^", ">>>");
        assert!(engine.extract(&output).is_ok());
        assert!(Engine::default().extract(&output).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.gas_limit, 8_000_000);
        assert_eq!(config.fetch_policy, FetchPolicy::Degrade);
        assert_eq!(config.link_host, "https://dashboard.tenderly.co");
    }
}
