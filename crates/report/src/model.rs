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

//! The structured report model.
//!
//! Building the model applies every normalization rule once, so that each renderer only
//! formats what it is given:
//!
//! - overrides and changes are ordered by checksummed address string, then by slot
//! - storage entries whose value did not change are dropped
//! - addresses left without entries are dropped
//! - every slot is labelled from configuration, with placeholders where it is silent

use crate::{SlotKind, SlotResolution, ValidationConfig};
use alloy_primitives::{Address, B256};
use itertools::Itertools;
use statediff_state::{Override, PreimageRegistry, StateDiff};
use std::collections::BTreeMap;
use tracing::debug;

/// Placeholder detail of a change the configuration does not explain further
pub const PLACEHOLDER_DETAIL: &str = "<<Detail>>";

/// Simulation results a report is built from
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    /// Chain the simulation ran on
    pub chain_id: u64,
    /// Safe whose signers use the report
    pub target_safe: Address,
    /// EIP-712 domain hash shown by the signing device
    pub domain_hash: B256,
    /// EIP-712 message hash shown by the signing device
    pub message_hash: B256,
    /// Storage overrides applied before the simulation
    pub overrides: &'a [Override],
    /// Diffs recorded by the simulation, in any order
    pub diffs: &'a [StateDiff],
    /// Preimages observed during the simulation
    pub preimages: &'a PreimageRegistry,
}

/// A contract as shown in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRef {
    /// Configured name, or the placeholder
    pub name: String,
    /// Implementation name, falling back to `name`
    pub general_name: String,
    /// Contract address
    pub address: Address,
}

/// One overridden slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    /// Slot key
    pub key: B256,
    /// Forced value
    pub value: B256,
    /// Configured decoding of the slot
    pub kind: SlotKind,
    /// `value`, decoded
    pub decoded_value: String,
    /// What the slot holds
    pub summary: String,
    /// Why the slot is overridden
    pub meaning: String,
}

/// Overrides of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSection {
    /// The overridden contract
    pub contract: ContractRef,
    /// Overridden slots, by key
    pub entries: Vec<OverrideEntry>,
}

/// One changed slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Slot key
    pub key: B256,
    /// Value before the simulation
    pub before: B256,
    /// Value after the simulation
    pub after: B256,
    /// Configured decoding of the slot
    pub kind: SlotKind,
    /// `before`, decoded
    pub decoded_before: String,
    /// `after`, decoded
    pub decoded_after: String,
    /// What the slot holds
    pub summary: String,
    /// How the slot was identified
    pub detail: String,
}

/// Changes of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSection {
    /// The changed contract
    pub contract: ContractRef,
    /// Changed slots, by key
    pub entries: Vec<ChangeEntry>,
}

/// Everything a signer is asked to check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Chain the simulation ran on
    pub chain_id: u64,
    /// The Safe being signed for
    pub target: ContractRef,
    /// EIP-712 domain hash
    pub domain_hash: B256,
    /// EIP-712 message hash
    pub message_hash: B256,
    /// Overrides, by contract address
    pub overrides: Vec<OverrideSection>,
    /// Changes, by contract address
    pub changes: Vec<ChangeSection>,
}

impl ValidationReport {
    /// Build the report model.
    pub fn build(config: &ValidationConfig, inputs: ReportInputs<'_>) -> Self {
        let contract_ref = |address: Address| {
            let contract = config.contract(inputs.chain_id, address);
            ContractRef {
                name: contract.name.clone(),
                general_name: contract.display_name().to_string(),
                address,
            }
        };

        // Later overrides of the same slot win, as they do when applied.
        let mut forced: BTreeMap<Address, BTreeMap<B256, B256>> = BTreeMap::new();
        for entry in inputs.overrides {
            let slots = forced.entry(entry.contract_address).or_default();
            for slot in &entry.storage {
                slots.insert(slot.key, slot.value);
            }
        }

        let overrides: Vec<_> = forced
            .into_iter()
            .sorted_by_cached_key(|(address, _)| address.to_checksum(None))
            .filter(|(_, slots)| !slots.is_empty())
            .map(|(address, slots)| {
                let contract = config.contract(inputs.chain_id, address);
                let entries = slots
                    .into_iter()
                    .map(|(key, value)| {
                        let slot =
                            contract.resolve_slot(key, None, inputs.preimages).slot();
                        OverrideEntry {
                            key,
                            value,
                            kind: slot.kind.clone(),
                            decoded_value: slot.kind.decode(value),
                            summary: slot.summary.clone(),
                            meaning: slot.override_meaning.clone(),
                        }
                    })
                    .collect();
                OverrideSection { contract: contract_ref(address), entries }
            })
            .collect();

        let changes: Vec<_> = inputs
            .diffs
            .iter()
            .sorted_by_cached_key(|diff| diff.address.to_checksum(None))
            .filter_map(|diff| {
                let contract = config.contract(inputs.chain_id, diff.address);
                let entries: Vec<_> = diff
                    .changed_storage()
                    .into_iter()
                    .map(|storage| {
                        let resolution = contract.resolve_slot(
                            storage.key,
                            storage.preimage.as_ref().map(|p| &p[..]),
                            inputs.preimages,
                        );
                        let slot = resolution.slot();
                        let detail = match resolution {
                            SlotResolution::ViaPreimage { base, .. } => {
                                format!("Mapping entry under base slot {base}")
                            }
                            _ => PLACEHOLDER_DETAIL.to_string(),
                        };
                        ChangeEntry {
                            key: storage.key,
                            before: storage.value_before,
                            after: storage.value_after,
                            kind: slot.kind.clone(),
                            decoded_before: slot.kind.decode(storage.value_before),
                            decoded_after: slot.kind.decode(storage.value_after),
                            summary: slot.summary.clone(),
                            detail,
                        }
                    })
                    .collect();
                (!entries.is_empty())
                    .then(|| ChangeSection { contract: contract_ref(diff.address), entries })
            })
            .collect();

        debug!(
            "Built report with {} override section(s) and {} change section(s)",
            overrides.len(),
            changes.len()
        );

        Self {
            chain_id: inputs.chain_id,
            target: contract_ref(inputs.target_safe),
            domain_hash: inputs.domain_hash,
            message_hash: inputs.message_hash,
            overrides,
            changes,
        }
    }

    /// Number of changed slots over all contracts
    pub fn change_count(&self) -> usize {
        self.changes.iter().map(|section| section.entries.len()).sum()
    }
}
