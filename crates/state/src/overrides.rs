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

//! Storage overrides supplied with a simulation.
//!
//! Overrides travel as JSON in the simulation link:
//!
//! ```json
//! [{"contractAddress": "0x…", "storage": [{"key": "0x…", "value": "0x…"}]}]
//! ```
//!
//! Keys and values shorter than 32 bytes are left-padded.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One overridden storage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOverride {
    /// Slot key
    #[serde(with = "word")]
    pub key: B256,
    /// Value the slot holds before the simulation starts
    #[serde(with = "word")]
    pub value: B256,
}

/// Storage overrides for one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    /// Contract whose storage is overridden
    pub contract_address: Address,
    /// Overridden slots
    #[serde(default)]
    pub storage: Vec<StorageOverride>,
}

/// Parse the JSON override list.
pub fn parse_overrides(json: &str) -> Result<Vec<Override>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Parse the JSON override list, falling back to no overrides when it is malformed.
pub fn parse_overrides_or_empty(json: &str) -> Vec<Override> {
    match parse_overrides(json) {
        Ok(overrides) => overrides,
        Err(err) => {
            warn!("Ignoring malformed state overrides: {err}");
            Vec::new()
        }
    }
}

mod word {
    use alloy_primitives::{hex, B256};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(word: &B256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_prefixed(word))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<B256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        crate::parse_word(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid 32-byte word: {raw:?}")))
    }
}
