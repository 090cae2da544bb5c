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

//! Transaction construction and target detection.

use crate::{SimulationError, SimulationParams};
use alloy_primitives::{address, Address, TxKind, U256};
use alloy_sol_types::{sol, SolCall};
use revm::context::TxEnv;

/// Gas limit of every simulated call
pub const DEFAULT_GAS_LIMIT: u64 = 8_000_000;

/// Canonical Multicall3 deployment, identical on every supported chain
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    struct Call {
        address target;
        bytes callData;
    }

    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Call3Value {
        address target;
        bool allowFailure;
        uint256 value;
        bytes callData;
    }

    function aggregate(Call[] calldata calls) external payable;
    function aggregate3(Call3[] calldata calls) external payable;
    function aggregate3Value(Call3Value[] calldata calls) external payable;
}

/// Build the call-style transaction for `params`.
///
/// The call carries no value and a zero gas price, so the sender needs no funds.
pub fn build_tx_env(params: &SimulationParams, chain_id: u64, gas_limit: u64) -> TxEnv {
    TxEnv::builder()
        .caller(params.from)
        .kind(TxKind::Call(params.contract))
        .data(params.input.clone())
        .value(U256::ZERO)
        .gas_limit(gas_limit)
        .gas_price(0)
        .chain_id(Some(chain_id))
        .build_fill()
}

/// The Safe whose signatures the call carries.
///
/// Calls through Multicall3 are batches; the first call of the batch targets the Safe.
/// Any other call goes straight to the Safe.
pub fn target_safe(to: Address, input: &[u8]) -> Result<Address, SimulationError> {
    if to != MULTICALL3_ADDRESS {
        return Ok(to);
    }

    let targets = multicall_targets(input)?;
    targets.first().copied().ok_or_else(|| {
        SimulationError::InvalidCalldata("Multicall3 batch contains no calls".to_string())
    })
}

/// Targets of a Multicall3 batch, in call order.
pub fn multicall_targets(input: &[u8]) -> Result<Vec<Address>, SimulationError> {
    let invalid = |e: alloy_sol_types::Error| SimulationError::InvalidCalldata(e.to_string());
    let selector = input.get(..4).ok_or_else(|| {
        SimulationError::InvalidCalldata("call data shorter than a selector".to_string())
    })?;

    if selector == aggregate3Call::SELECTOR {
        let call = aggregate3Call::abi_decode(input).map_err(invalid)?;
        Ok(call.calls.iter().map(|c| c.target).collect())
    } else if selector == aggregate3ValueCall::SELECTOR {
        let call = aggregate3ValueCall::abi_decode(input).map_err(invalid)?;
        Ok(call.calls.iter().map(|c| c.target).collect())
    } else if selector == aggregateCall::SELECTOR {
        let call = aggregateCall::abi_decode(input).map_err(invalid)?;
        Ok(call.calls.iter().map(|c| c.target).collect())
    } else {
        Err(SimulationError::InvalidCalldata(format!(
            "unknown Multicall3 selector 0x{}",
            hex::encode(selector)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    const SAFE: Address = address!("9855054731540a48b28990b63dcf4f33d8ae46a1");
    const OTHER: Address = address!("00000000000000000000000000000000000000bb");
    const SENDER: Address = address!("1804c8ab1f12e6bbf3894d4083f33e07309d1f38");

    fn call3(target: Address) -> Call3 {
        Call3 {
            target,
            allowFailure: false,
            callData: Bytes::from_static(&[0x6a, 0x76, 0x12, 0x02]),
        }
    }

    #[test]
    fn test_direct_call_targets_callee() {
        assert_eq!(target_safe(SAFE, &[0xde, 0xad]).unwrap(), SAFE);
    }

    #[test]
    fn test_aggregate3_first_target() {
        let input = aggregate3Call { calls: vec![call3(SAFE), call3(OTHER)] }.abi_encode();
        assert_eq!(target_safe(MULTICALL3_ADDRESS, &input).unwrap(), SAFE);
        assert_eq!(multicall_targets(&input).unwrap(), vec![SAFE, OTHER]);
    }

    #[test]
    fn test_aggregate_first_target() {
        let input = aggregateCall {
            calls: vec![Call { target: OTHER, callData: Bytes::new() }],
        }
        .abi_encode();
        assert_eq!(target_safe(MULTICALL3_ADDRESS, &input).unwrap(), OTHER);
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let input = aggregate3Call { calls: vec![] }.abi_encode();
        assert!(matches!(
            target_safe(MULTICALL3_ADDRESS, &input),
            Err(SimulationError::InvalidCalldata(_))
        ));
    }

    #[test]
    fn test_garbage_calldata_is_an_error() {
        assert!(target_safe(MULTICALL3_ADDRESS, &[0x01]).is_err());
        assert!(target_safe(MULTICALL3_ADDRESS, &[0xff, 0xff, 0xff, 0xff, 0x00]).is_err());
    }

    #[test]
    fn test_build_tx_env() {
        let params = SimulationParams::new(SENDER, SAFE, Bytes::from_static(&[0x01, 0x02]));
        let tx = build_tx_env(&params, 1, DEFAULT_GAS_LIMIT);

        assert_eq!(tx.caller, SENDER);
        assert_eq!(tx.kind, TxKind::Call(SAFE));
        assert_eq!(tx.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(tx.gas_price, 0);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.chain_id, Some(1));
        assert_eq!(tx.data, params.input);
    }
}
