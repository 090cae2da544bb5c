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

//! Typed state cache.
//!
//! Entries are keyed by [`CacheKey`], so a balance can never be read back as a nonce.
//! Nothing is evicted: a cache lives for exactly one simulation.

use alloy_primitives::{Address, Bytes, B256, U256};
use dashmap::DashMap;
use std::fmt;

/// The kinds of account state the store tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKind {
    /// Ether balance
    Balance,
    /// Runtime bytecode
    Code,
    /// A storage slot
    Storage,
    /// Account nonce
    Nonce,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Balance => "balance",
            Self::Code => "code",
            Self::Storage => "storage",
            Self::Nonce => "nonce",
        })
    }
}

/// Key of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Balance of an account
    Balance(Address),
    /// Code of an account
    Code(Address),
    /// One storage slot of an account
    Storage(Address, B256),
    /// Nonce of an account
    Nonce(Address),
}

impl CacheKey {
    /// Kind of state this key addresses.
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Balance(_) => StateKind::Balance,
            Self::Code(_) => StateKind::Code,
            Self::Storage(..) => StateKind::Storage,
            Self::Nonce(_) => StateKind::Nonce,
        }
    }

    /// Account this key belongs to.
    pub fn address(&self) -> Address {
        match self {
            Self::Balance(address)
            | Self::Code(address)
            | Self::Storage(address, _)
            | Self::Nonce(address) => *address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedValue {
    Balance(U256),
    Code(Bytes),
    Storage(B256),
    Nonce(u64),
}

/// Read-through cache of account state at the pinned block
#[derive(Debug, Default)]
pub struct StateCache {
    entries: DashMap<CacheKey, CachedValue>,
}

impl StateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached balance of `address`
    pub fn balance(&self, address: Address) -> Option<U256> {
        match self.entries.get(&CacheKey::Balance(address)).as_deref() {
            Some(CachedValue::Balance(balance)) => Some(*balance),
            _ => None,
        }
    }

    /// Cached code of `address`
    pub fn code(&self, address: Address) -> Option<Bytes> {
        match self.entries.get(&CacheKey::Code(address)).as_deref() {
            Some(CachedValue::Code(code)) => Some(code.clone()),
            _ => None,
        }
    }

    /// Cached value of a storage slot
    pub fn storage(&self, address: Address, slot: B256) -> Option<B256> {
        match self.entries.get(&CacheKey::Storage(address, slot)).as_deref() {
            Some(CachedValue::Storage(value)) => Some(*value),
            _ => None,
        }
    }

    /// Cached nonce of `address`
    pub fn nonce(&self, address: Address) -> Option<u64> {
        match self.entries.get(&CacheKey::Nonce(address)).as_deref() {
            Some(CachedValue::Nonce(nonce)) => Some(*nonce),
            _ => None,
        }
    }

    /// Store a balance
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.entries.insert(CacheKey::Balance(address), CachedValue::Balance(balance));
    }

    /// Store code
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.entries.insert(CacheKey::Code(address), CachedValue::Code(code));
    }

    /// Store a storage slot value
    pub fn set_storage(&self, address: Address, slot: B256, value: B256) {
        self.entries.insert(CacheKey::Storage(address, slot), CachedValue::Storage(value));
    }

    /// Store a nonce
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.entries.insert(CacheKey::Nonce(address), CachedValue::Nonce(nonce));
    }

    /// Whether `key` has an entry
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries of one kind
    pub fn count(&self, kind: StateKind) -> usize {
        self.entries.iter().filter(|entry| entry.key().kind() == kind).count()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
