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

//! Fork setup against a live RPC endpoint
//!
//! The simulator never replays history: it pins the latest block of a supported
//! chain and runs a single call on top of it. This module connects to the endpoint,
//! checks the chain and captures the block header fields the EVM needs.

use crate::{get_blob_base_fee_update_fraction_by_spec_id, hardfork_name, SupportedChain};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::BlockNumberOrTag;
use eyre::{eyre, Result};
use revm::{
    context::BlockEnv, context_interface::block::BlobExcessGasAndPrice,
    primitives::hardfork::SpecId,
};
use tracing::{debug, info};

/// Fork configuration details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkInfo {
    /// Block number that was forked
    pub block_number: u64,
    /// Block hash
    pub block_hash: B256,
    /// Timestamp of the block
    pub timestamp: u64,
    /// Chain ID
    pub chain_id: u64,
    /// Spec ID for the hardfork
    pub spec_id: SpecId,
    /// Base fee of the block, zero before London
    pub base_fee: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Fee recipient
    pub beneficiary: Address,
    /// Difficulty, zero after the merge
    pub difficulty: U256,
    /// `mix_hash` of the header, used as `prevrandao`
    pub prevrandao: B256,
    /// Excess blob gas, absent before Cancun
    pub excess_blob_gas: Option<u64>,
}

impl ForkInfo {
    /// Copy the pinned header into a revm block environment.
    pub fn apply_to_block(&self, b: &mut BlockEnv) {
        b.number = U256::from(self.block_number);
        b.timestamp = U256::from(self.timestamp);
        b.beneficiary = self.beneficiary;
        b.basefee = self.base_fee;
        b.difficulty = self.difficulty;
        b.gas_limit = self.gas_limit;
        b.prevrandao = Some(self.prevrandao);
        let update_fraction = get_blob_base_fee_update_fraction_by_spec_id(self.spec_id);
        b.blob_excess_gas_and_price =
            self.excess_blob_gas.map(|g| BlobExcessGasAndPrice::new(g, update_fraction));
    }
}

/// Connect to the RPC endpoint.
pub async fn connect_provider(rpc_url: &str) -> Result<DynProvider> {
    let provider = ProviderBuilder::new()
        .connect(rpc_url)
        .await
        .map_err(|e| eyre!("Failed to connect to RPC endpoint {rpc_url}: {e}"))?;
    Ok(provider.erased())
}

/// Pin the latest block of the provider's chain.
///
/// Fails for chains without a known hardfork schedule, before any state is fetched.
pub async fn fork_latest<P: Provider>(provider: &P) -> Result<ForkInfo> {
    let chain_id =
        provider.get_chain_id().await.map_err(|e| eyre!("Failed to get chain ID: {e}"))?;
    let chain = SupportedChain::from_chain_id(chain_id)?;

    let block = provider
        .get_block_by_number(BlockNumberOrTag::Latest)
        .await?
        .ok_or_else(|| eyre!("Latest block not found"))?;

    let block_number = block.header.number;
    let spec_id = chain.spec_id(block_number);

    let fork_info = ForkInfo {
        block_number,
        block_hash: block.header.hash,
        timestamp: block.header.timestamp,
        chain_id,
        spec_id,
        base_fee: block.header.base_fee_per_gas.unwrap_or_default(),
        gas_limit: block.header.gas_limit,
        beneficiary: block.header.beneficiary,
        difficulty: block.header.difficulty,
        prevrandao: block.header.mix_hash,
        excess_blob_gas: block.header.excess_blob_gas,
    };

    info!(
        "Forked {chain} at block {block_number} ({})",
        hardfork_name(spec_id),
    );
    debug!(?fork_info, "Fork details");

    Ok(fork_info)
}
