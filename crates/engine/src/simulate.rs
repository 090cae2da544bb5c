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

//! The execution driver.
//!
//! Runs exactly one call against a [`CachingStateStore`] and turns whatever it committed
//! into state diffs. Storage overrides are applied first, so their values are what the
//! call reads and what the diffs are measured against.

use crate::{build_tx_env, PreimageRecorder, SimulationError, SimulationParams};
use revm::{
    context::result::{EVMError, ExecutionResult},
    DatabaseCommit, ExecuteEvm, InspectEvm, MainBuilder,
};
use statediff_common::{new_simulation_context, ForkInfo};
use statediff_state::{
    CachingStateStore, Override, PreimageRegistry, StateDiff, StateFetcher,
};
use tracing::{debug, info, warn};

/// Everything a simulation produced
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// One entry per written address, unordered
    pub diffs: Vec<StateDiff>,
    /// Overrides applied before execution
    pub overrides: Vec<Override>,
    /// Hash preimages observed during execution
    pub preimages: PreimageRegistry,
    /// Gas used by the call
    pub gas_used: u64,
    /// Fetches that failed and were replaced by zero values
    pub fetch_failures: usize,
}

/// Simulate `params` on top of the forked block.
///
/// A revert or halt is an error: the report describes what the transaction does when it
/// succeeds, so there is nothing to report for a failing one.
pub fn simulate<F: StateFetcher>(
    mut store: CachingStateStore<F>,
    fork_info: &ForkInfo,
    params: &SimulationParams,
    gas_limit: u64,
) -> Result<SimulationOutcome, SimulationError> {
    if let Some(network) = params.network_chain_id() {
        if network != fork_info.chain_id {
            warn!(
                "Simulation link targets chain {network} but the RPC endpoint serves chain {}",
                fork_info.chain_id
            );
        }
    }

    if let Some(json) = &params.state_overrides {
        store.apply_overrides_json(json);
    }
    info!(
        "Simulating call from {} to {} with {} override(s)",
        params.from,
        params.contract,
        store.overrides().len()
    );

    let tx = build_tx_env(params, fork_info.chain_id, gas_limit);
    let mut recorder = PreimageRecorder::new();

    let (result, state) = {
        let ctx = new_simulation_context(&mut store, fork_info);
        let mut evm = ctx.build_mainnet_with_inspector(&mut recorder);
        let result = evm.inspect_one_tx(tx).map_err(|err| match err {
            EVMError::Database(err) => SimulationError::State(err),
            other => SimulationError::Evm(other.to_string()),
        })?;
        (result, evm.finalize())
    };

    let preimages = recorder.take_registry();
    debug!("Recorded {} preimage(s)", preimages.len());
    for (hash, preimage) in preimages.iter() {
        store.record_preimage(*hash, preimage.clone());
    }

    let gas_used = result.gas_used();
    match result {
        ExecutionResult::Success { .. } => {}
        ExecutionResult::Revert { output, .. } => {
            return Err(SimulationError::Reverted { gas_used, output });
        }
        ExecutionResult::Halt { reason, .. } => {
            return Err(SimulationError::Halted { gas_used, reason });
        }
    }

    store.commit(state);
    if let Some(err) = store.take_commit_error() {
        return Err(SimulationError::State(err));
    }

    let fetch_failures = store.fetch_failures();
    if fetch_failures > 0 {
        warn!("{fetch_failures} state fetch(es) failed and were treated as zero");
    }

    let (diffs, overrides, preimages) = store.into_parts();
    info!("Simulation succeeded using {gas_used} gas, {} address(es) written", diffs.len());

    Ok(SimulationOutcome { diffs, overrides, preimages, gas_used, fetch_failures })
}
