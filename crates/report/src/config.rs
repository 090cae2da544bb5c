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

//! Contract and slot configuration.
//!
//! The configuration names contracts per chain and explains their storage slots.
//! Contracts sharing an implementation share a named storage layout:
//!
//! ```yaml
//! storage-layouts:
//!   gnosis-safe:
//!     "0x04":
//!       type: uint256
//!       summary: Threshold
//!       override-meaning: Override the threshold to 1 so the transaction simulation can occur.
//! contracts:
//!   1:
//!     "0x9855054731540A48b28990B63DcF4f33d8AE46A1":
//!       name: Incident Multisig
//!       general-name: Safe
//!       slots: ${{storage-layouts.gnosis-safe}}
//! ```
//!
//! References are resolved while loading; anything that does not resolve makes the
//! whole configuration unusable. Lookups never fail: unknown contracts and slots come
//! back as placeholders.

use crate::{ConfigError, SlotKind};
use alloy_primitives::{Address, B256};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use statediff_state::{parse_word, PreimageRegistry};
use std::{collections::BTreeMap, fs, path::Path, sync::LazyLock};
use tracing::{debug, trace};

/// Placeholder name of an unconfigured contract
pub const PLACEHOLDER_CONTRACT_NAME: &str = "<<ContractName>>";
/// Placeholder kind of an unconfigured slot
pub const PLACEHOLDER_KIND: &str = "<<DecodedKind>>";
/// Placeholder summary of an unconfigured slot
pub const PLACEHOLDER_SUMMARY: &str = "<<Summary>>";
/// Placeholder override meaning of an unconfigured slot
pub const PLACEHOLDER_OVERRIDE_MEANING: &str = "<<OverrideMeaning>>";

/// Longest chain of nested mapping preimages followed when resolving a slot
pub const MAX_PREIMAGE_DEPTH: usize = 8;

const LAYOUT_REFERENCE_PREFIX: &str = "storage-layouts.";

static PLACEHOLDER_CONTRACT: LazyLock<ContractConfig> = LazyLock::new(ContractConfig::placeholder);
static PLACEHOLDER_SLOT: LazyLock<Slot> = LazyLock::new(Slot::default);

/// Meaning of one storage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// How values of the slot are decoded
    pub kind: SlotKind,
    /// What the slot holds
    pub summary: String,
    /// Why a simulation may override the slot
    pub override_meaning: String,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            kind: SlotKind::Unknown(PLACEHOLDER_KIND.to_string()),
            summary: PLACEHOLDER_SUMMARY.to_string(),
            override_meaning: PLACEHOLDER_OVERRIDE_MEANING.to_string(),
        }
    }
}

/// A configured contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    /// Name of this deployment
    pub name: String,
    /// Name of the implementation, shared by deployments of the same contract
    pub general_name: Option<String>,
    /// Slot meanings keyed by slot
    pub slots: BTreeMap<B256, Slot>,
}

impl ContractConfig {
    fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_CONTRACT_NAME.to_string(),
            general_name: None,
            slots: BTreeMap::new(),
        }
    }

    /// The general name, falling back to the deployment name.
    pub fn display_name(&self) -> &str {
        self.general_name.as_deref().unwrap_or(&self.name)
    }

    /// Find the meaning of `key`.
    ///
    /// An exact match wins. Otherwise the slot is treated as a mapping entry: when its
    /// preimage is `key ‖ base slot`, the base slot is looked up instead, following
    /// nested mappings through `registry` for at most [`MAX_PREIMAGE_DEPTH`] levels.
    pub fn resolve_slot<'a, 'p>(
        &'a self,
        key: B256,
        preimage: Option<&'p [u8]>,
        registry: &'p PreimageRegistry,
    ) -> SlotResolution<'a> {
        if let Some(slot) = self.slots.get(&key) {
            return SlotResolution::Exact(slot);
        }

        let mut preimage = preimage.or_else(|| registry.get(&key).map(|p| &p[..]));
        for depth in 1..=MAX_PREIMAGE_DEPTH {
            let Some(bytes) = preimage.filter(|bytes| bytes.len() == 64) else {
                break;
            };
            let base = B256::from_slice(&bytes[32..]);
            if let Some(slot) = self.slots.get(&base) {
                trace!(%key, %base, depth, "resolved slot through preimage");
                return SlotResolution::ViaPreimage { slot, base, depth };
            }
            preimage = registry.get(&base).map(|p| &p[..]);
        }

        SlotResolution::Unresolved
    }
}

/// Outcome of a slot lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution<'a> {
    /// The slot itself is configured
    Exact(&'a Slot),
    /// The slot belongs to a mapping whose base slot is configured
    ViaPreimage {
        /// Meaning of the mapping
        slot: &'a Slot,
        /// Base slot of the mapping
        base: B256,
        /// Number of preimages followed
        depth: usize,
    },
    /// Nothing matched
    Unresolved,
}

impl<'a> SlotResolution<'a> {
    /// The resolved slot, or the placeholder slot.
    pub fn slot(&self) -> &'a Slot {
        match self {
            Self::Exact(slot) | Self::ViaPreimage { slot, .. } => slot,
            Self::Unresolved => &PLACEHOLDER_SLOT,
        }
    }
}

/// Fully resolved configuration: chain ID → contract address → contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    contracts: BTreeMap<u64, BTreeMap<Address, ContractConfig>>,
}

impl ValidationConfig {
    /// Load and resolve the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded configuration for {} contract(s) from {:?}", config.len(), path);
        Ok(config)
    }

    /// Parse and resolve a configuration document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        raw.resolve()
    }

    /// The configured contract, or the placeholder contract.
    pub fn contract(&self, chain_id: u64, address: Address) -> &ContractConfig {
        self.get(chain_id, address).unwrap_or(&PLACEHOLDER_CONTRACT)
    }

    /// The configured contract, if any
    pub fn get(&self, chain_id: u64, address: Address) -> Option<&ContractConfig> {
        self.contracts.get(&chain_id).and_then(|contracts| contracts.get(&address))
    }

    /// Chains with at least one configured contract
    pub fn chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.contracts.keys().copied()
    }

    /// Number of configured contracts over all chains
    pub fn len(&self) -> usize {
        self.contracts.values().map(BTreeMap::len).sum()
    }

    /// Whether no contract is configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    #[serde(default)]
    storage_layouts: BTreeMap<String, Mapping>,
    #[serde(default)]
    contracts: Mapping,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawContract {
    name: Option<String>,
    general_name: Option<String>,
    #[serde(default)]
    slots: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSlot {
    #[serde(rename = "type")]
    kind: Option<String>,
    summary: Option<String>,
    override_meaning: Option<String>,
}

impl RawSlot {
    fn into_slot(self) -> Slot {
        let placeholder = Slot::default();
        Slot {
            kind: self
                .kind
                .map_or(placeholder.kind, |tag| tag.parse().unwrap_or_else(|e| match e {})),
            summary: self.summary.unwrap_or(placeholder.summary),
            override_meaning: self.override_meaning.unwrap_or(placeholder.override_meaning),
        }
    }
}

impl RawConfig {
    fn resolve(self) -> Result<ValidationConfig, ConfigError> {
        let mut layouts = BTreeMap::new();
        for (name, table) in self.storage_layouts {
            let slots = parse_slot_table(&table, &format!("storage layout {name:?}"))?;
            layouts.insert(name, slots);
        }

        let mut contracts: BTreeMap<u64, BTreeMap<Address, ContractConfig>> = BTreeMap::new();
        for (chain_key, entries) in self.contracts {
            let chain_id = parse_chain_id(&chain_key)?;
            if entries.is_null() {
                continue;
            }
            let entries: Mapping = serde_yaml::from_value(entries)?;

            for (address_key, entry) in entries {
                let raw_address = scalar_to_string(&address_key).unwrap_or_default();
                let address = raw_address
                    .parse::<Address>()
                    .map_err(|_| ConfigError::InvalidAddress {
                        chain_id,
                        raw: raw_address.clone(),
                    })?;
                let raw: RawContract = serde_yaml::from_value(entry)?;

                let slots = match raw.slots {
                    Value::Null => BTreeMap::new(),
                    Value::Mapping(table) => {
                        parse_slot_table(&table, &format!("contract {raw_address}"))?
                    }
                    Value::String(reference) => {
                        let name = parse_layout_reference(&reference).ok_or_else(|| {
                            ConfigError::InvalidSlots {
                                chain_id,
                                address: raw_address.clone(),
                                reason: format!("{reference:?} is not a storage layout reference"),
                            }
                        })?;
                        layouts.get(name).cloned().ok_or_else(|| ConfigError::UnknownLayout {
                            chain_id,
                            address: raw_address.clone(),
                            name: name.to_string(),
                        })?
                    }
                    other => {
                        return Err(ConfigError::InvalidSlots {
                            chain_id,
                            address: raw_address,
                            reason: format!("expected a table or a reference, found {other:?}"),
                        })
                    }
                };

                let contract = ContractConfig {
                    name: raw.name.unwrap_or_else(|| PLACEHOLDER_CONTRACT_NAME.to_string()),
                    general_name: raw.general_name,
                    slots,
                };
                contracts.entry(chain_id).or_default().insert(address, contract);
            }
        }

        Ok(ValidationConfig { contracts })
    }
}

/// Name referenced by `${{storage-layouts.NAME}}`.
pub fn parse_layout_reference(reference: &str) -> Option<&str> {
    let inner = reference.trim().strip_prefix("${{")?.strip_suffix("}}")?.trim();
    let name = inner.strip_prefix(LAYOUT_REFERENCE_PREFIX)?;
    (!name.is_empty()).then_some(name)
}

fn parse_slot_table(table: &Mapping, context: &str) -> Result<BTreeMap<B256, Slot>, ConfigError> {
    let mut slots = BTreeMap::new();
    for (key, value) in table {
        let raw_key = scalar_to_string(key).unwrap_or_default();
        let slot = parse_word(&raw_key).ok_or_else(|| ConfigError::InvalidSlotKey {
            context: context.to_string(),
            raw: raw_key.clone(),
        })?;
        let raw: RawSlot = serde_yaml::from_value(value.clone())?;
        slots.insert(slot, raw.into_slot());
    }
    Ok(slots)
}

fn parse_chain_id(key: &Value) -> Result<u64, ConfigError> {
    match key {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ConfigError::InvalidChainId(scalar_to_string(key).unwrap_or_default()))
}

// Unquoted hex keys such as `0x04` may arrive as numbers.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => number.as_u64().map(|n| format!("{n:#x}")),
        _ => None,
    }
}
