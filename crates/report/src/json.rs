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

//! JSON report shapes.
//!
//! [`ToolReport`] is consumed by the signing tool; [`FormattedReport`] wraps the same data
//! with task metadata for archiving next to the task.

use crate::ValidationReport;
use serde::{Deserialize, Serialize};

/// Overrides of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonStateOverride {
    /// Contract name
    pub name: String,
    /// Checksummed contract address
    pub address: String,
    /// Overridden slots
    pub overrides: Vec<JsonOverride>,
}

/// One overridden slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOverride {
    /// Slot key
    pub key: String,
    /// Forced value
    pub value: String,
    /// Why the slot is overridden
    pub description: String,
}

/// Changes of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonStateChange {
    /// Contract name
    pub name: String,
    /// Checksummed contract address
    pub address: String,
    /// Changed slots
    pub changes: Vec<JsonChange>,
}

/// One changed slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonChange {
    /// Slot key
    pub key: String,
    /// Value before the simulation
    pub before: String,
    /// Value after the simulation
    pub after: String,
    /// What the slot holds
    pub description: String,
}

/// Report read by the signing tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReport {
    /// EIP-712 domain hash
    pub domain_hash: String,
    /// EIP-712 message hash
    pub message_hash: String,
    /// Safe being signed for
    pub target_safe: String,
    /// Overrides, by contract address
    pub state_overrides: Vec<JsonStateOverride>,
    /// Changes, by contract address
    pub state_changes: Vec<JsonStateChange>,
}

impl From<&ValidationReport> for ToolReport {
    fn from(report: &ValidationReport) -> Self {
        Self {
            domain_hash: report.domain_hash.to_string(),
            message_hash: report.message_hash.to_string(),
            target_safe: report.target.address.to_string(),
            state_overrides: state_overrides(report),
            state_changes: state_changes(report),
        }
    }
}

/// Descriptive fields of the task a report belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Task name
    pub task_name: String,
    /// Script that produced the transaction
    pub script_name: String,
    /// Signature of the script entry point
    pub signature: String,
    /// Arguments of the script entry point
    pub args: String,
    /// Hash expected from a nested Safe, if any
    pub expected_nested_hash: String,
}

/// The hashes a signer compares against the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAndMessageHashes {
    /// Safe being signed for
    pub address: String,
    /// EIP-712 domain hash
    pub domain_hash: String,
    /// EIP-712 message hash
    pub message_hash: String,
}

/// Report with task metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedReport {
    /// Task name
    pub task_name: String,
    /// Script that produced the transaction
    pub script_name: String,
    /// Signature of the script entry point
    pub signature: String,
    /// Arguments of the script entry point
    pub args: String,
    /// Hashes to compare against the device
    pub expected_domain_and_message_hashes: DomainAndMessageHashes,
    /// Hash expected from a nested Safe, if any
    pub expected_nested_hash: String,
    /// Overrides, by contract address
    pub state_overrides: Vec<JsonStateOverride>,
    /// Changes, by contract address
    pub state_changes: Vec<JsonStateChange>,
}

impl FormattedReport {
    /// Wrap `report` with `metadata`.
    pub fn new(report: &ValidationReport, metadata: TaskMetadata) -> Self {
        let TaskMetadata { task_name, script_name, signature, args, expected_nested_hash } =
            metadata;
        Self {
            task_name,
            script_name,
            signature,
            args,
            expected_domain_and_message_hashes: DomainAndMessageHashes {
                address: report.target.address.to_string(),
                domain_hash: report.domain_hash.to_string(),
                message_hash: report.message_hash.to_string(),
            },
            expected_nested_hash,
            state_overrides: state_overrides(report),
            state_changes: state_changes(report),
        }
    }
}

fn state_overrides(report: &ValidationReport) -> Vec<JsonStateOverride> {
    report
        .overrides
        .iter()
        .map(|section| JsonStateOverride {
            name: section.contract.name.clone(),
            address: section.contract.address.to_string(),
            overrides: section
                .entries
                .iter()
                .map(|entry| JsonOverride {
                    key: entry.key.to_string(),
                    value: entry.value.to_string(),
                    description: entry.meaning.clone(),
                })
                .collect(),
        })
        .collect()
}

fn state_changes(report: &ValidationReport) -> Vec<JsonStateChange> {
    report
        .changes
        .iter()
        .map(|section| JsonStateChange {
            name: section.contract.name.clone(),
            address: section.contract.address.to_string(),
            changes: section
                .entries
                .iter()
                .map(|entry| JsonChange {
                    key: entry.key.to_string(),
                    before: entry.before.to_string(),
                    after: entry.after.to_string(),
                    description: entry.summary.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Pretty-print a JSON report with a trailing newline.
pub fn to_pretty_json<T: Serialize>(report: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}
