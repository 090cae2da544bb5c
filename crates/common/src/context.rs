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

//! Context-related types and helpers
//!
//! Simulated calls are not signed transactions: the sender may be a contract, may not
//! hold enough ether and pays a zero gas price. The helpers here configure revm so that
//! such a call is accepted while keeping the pinned block and hardfork intact.

use crate::ForkInfo;
use revm::{
    context::{BlockEnv, CfgEnv, TxEnv},
    Context, Database, MainContext,
};

/// Type alias for the simulation context
pub type SimContext<DB> = Context<BlockEnv, TxEnv, CfgEnv, DB>;

/// Turn off the transaction validation that a signed transaction would pass.
pub fn relax_cfg_constraints(cfg: &mut CfgEnv) {
    cfg.disable_nonce_check = true;
    cfg.disable_balance_check = true;
    cfg.disable_base_fee = true;
    cfg.disable_block_gas_limit = true;
    cfg.disable_eip3607 = true;
}

/// Build a mainnet-flavoured context over `db`, pinned to the forked block.
pub fn new_simulation_context<DB: Database>(db: DB, fork_info: &ForkInfo) -> SimContext<DB> {
    Context::mainnet()
        .with_db(db)
        .modify_block_chained(|b| fork_info.apply_to_block(b))
        .modify_cfg_chained(|c| {
            c.chain_id = fork_info.chain_id;
            c.spec = fork_info.spec_id;
            relax_cfg_constraints(c);
        })
}
