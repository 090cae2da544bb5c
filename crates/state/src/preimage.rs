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

use alloy_primitives::{Bytes, B256};
use std::collections::HashMap;

/// Hash preimages revealed during execution.
///
/// Solidity derives mapping and dynamic-array slots by hashing; recording the hashed input
/// lets the report explain a slot such as `keccak256(key . base_slot)` in terms of its base
/// slot. Later recordings for the same hash replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreimageRegistry {
    entries: HashMap<B256, Bytes>,
}

impl PreimageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `preimage` as the input that hashed to `hash`.
    pub fn record(&mut self, hash: B256, preimage: Bytes) {
        self.entries.insert(hash, preimage);
    }

    /// Preimage of `hash`, if one was recorded
    pub fn get(&self, hash: &B256) -> Option<&Bytes> {
        self.entries.get(hash)
    }

    /// Base slot of a mapping slot.
    ///
    /// A Solidity mapping entry lives at `keccak256(key . slot)`, a 64-byte preimage whose
    /// second word is the mapping's own slot.
    pub fn mapping_base_slot(&self, hash: &B256) -> Option<B256> {
        self.get(hash)
            .filter(|preimage| preimage.len() == 64)
            .map(|preimage| B256::from_slice(&preimage[32..]))
    }

    /// Iterate over recorded hashes and preimages
    pub fn iter(&self) -> impl Iterator<Item = (&B256, &Bytes)> {
        self.entries.iter()
    }

    /// Number of recorded preimages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
