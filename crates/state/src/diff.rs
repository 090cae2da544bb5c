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

//! Diff model.
//!
//! A [`StateDiff`] is created lazily the first time an address is mutated. Its "before"
//! values are captured exactly once, on the first observed write, and are never touched
//! again; only the "after" side moves.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value observed before and after the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange<T> {
    /// Value at the pinned block (or the override that replaced it)
    pub before: T,
    /// Value once the simulation finished
    pub after: T,
}

impl<T: PartialEq> ValueChange<T> {
    /// Whether the value ended where it started
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Change of one storage slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDiff {
    /// Slot key
    pub key: B256,
    /// Value before the first write seen in this run
    pub value_before: B256,
    /// Latest written value
    pub value_after: B256,
    /// Preimage of `key` when the slot was derived from a hash seen during execution
    pub preimage: Option<Bytes>,
}

impl StorageDiff {
    /// Start tracking a slot whose value was `value_before`.
    pub fn new(key: B256, value_before: B256) -> Self {
        Self { key, value_before, value_after: value_before, preimage: None }
    }

    /// Whether the slot ended where it started
    pub fn is_noop(&self) -> bool {
        self.value_before == self.value_after
    }
}

/// Everything that changed for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiff {
    /// The account
    pub address: Address,
    /// Balance change, if the balance was written
    pub balance: Option<ValueChange<U256>>,
    /// Nonce change, if the nonce was written
    pub nonce: Option<ValueChange<u64>>,
    /// Written storage slots keyed by slot
    pub storage: HashMap<B256, StorageDiff>,
}

impl StateDiff {
    /// An empty diff for `address`
    pub fn new(address: Address) -> Self {
        Self { address, balance: None, nonce: None, storage: HashMap::new() }
    }

    /// Storage entries whose value actually changed, in slot order.
    pub fn changed_storage(&self) -> Vec<&StorageDiff> {
        let mut changed: Vec<_> = self.storage.values().filter(|diff| !diff.is_noop()).collect();
        changed.sort_by_key(|diff| diff.key);
        changed
    }

    /// Whether nothing observable changed for this address
    pub fn is_noop(&self) -> bool {
        self.balance.as_ref().is_none_or(ValueChange::is_noop)
            && self.nonce.as_ref().is_none_or(ValueChange::is_noop)
            && self.storage.values().all(StorageDiff::is_noop)
    }
}
