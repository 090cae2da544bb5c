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

//! The caching, diff-recording state store.
//!
//! [`CachingStateStore`] is the database revm runs against. Reads go through a typed
//! [`StateCache`] in front of a [`StateFetcher`]; writes arrive through
//! [`DatabaseCommit::commit`] once the call has finished and are reduced to one
//! [`StateDiff`] per touched address.
//!
//! Access lists, transient storage, logs, snapshots and self-destructs are owned by
//! revm's journal and never reach the store.

use crate::{
    parse_overrides_or_empty, u256_to_word, word_to_u256, FetchError, Override,
    PreimageRegistry, StateCache, StateDiff, StateError, StateFetcher, StateKind, StorageDiff,
    ValueChange,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use revm::{
    primitives::{AddressMap, KECCAK_EMPTY},
    state::{Account, AccountInfo, Bytecode},
    Database, DatabaseCommit,
};
use std::{cmp::Ordering, collections::HashMap};
use tracing::{debug, error, warn};

/// What the store does when the fetcher fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Log the failure, count it and continue with a zero value
    #[default]
    Degrade,
    /// Surface the failure to the EVM, aborting the simulation
    Strict,
}

/// State database recording every mutation as a before/after diff
#[derive(Debug)]
pub struct CachingStateStore<F> {
    fetcher: F,
    policy: FetchPolicy,
    cache: StateCache,
    code_by_hash: HashMap<B256, Bytecode>,
    diffs: HashMap<Address, StateDiff>,
    preimages: PreimageRegistry,
    overrides: Vec<Override>,
    fetch_failures: usize,
    commit_error: Option<StateError>,
}

impl<F: StateFetcher> CachingStateStore<F> {
    /// Create a store that degrades on fetch failures
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            policy: FetchPolicy::default(),
            cache: StateCache::new(),
            code_by_hash: HashMap::new(),
            diffs: HashMap::new(),
            preimages: PreimageRegistry::new(),
            overrides: Vec::new(),
            fetch_failures: 0,
            commit_error: None,
        }
    }

    /// Set the fetch failure policy
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The read cache
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Number of fetches that failed and were replaced by a zero value
    pub fn fetch_failures(&self) -> usize {
        self.fetch_failures
    }

    /// First error raised while recording a commit, if any.
    ///
    /// [`DatabaseCommit::commit`] cannot fail, so the error is held here until the caller
    /// asks for it.
    pub fn take_commit_error(&mut self) -> Option<StateError> {
        self.commit_error.take()
    }

    fn degrade<T: Default>(
        &mut self,
        kind: StateKind,
        address: Address,
        source: FetchError,
    ) -> Result<T, StateError> {
        match self.policy {
            FetchPolicy::Strict => Err(StateError::Fetch { kind, address, source }),
            FetchPolicy::Degrade => {
                self.fetch_failures += 1;
                warn!(%address, "Failed to fetch {kind}, using the zero value: {source}");
                Ok(T::default())
            }
        }
    }

    /// Balance of `address` at the pinned block, or as last written.
    pub fn get_balance(&mut self, address: Address) -> Result<U256, StateError> {
        if let Some(balance) = self.cache.balance(address) {
            return Ok(balance);
        }
        let balance = match self.fetcher.balance(address) {
            Ok(balance) => balance,
            Err(err) => self.degrade(StateKind::Balance, address, err)?,
        };
        self.cache.set_balance(address, balance);
        Ok(balance)
    }

    /// Code of `address`.
    pub fn get_code(&mut self, address: Address) -> Result<Bytes, StateError> {
        if let Some(code) = self.cache.code(address) {
            return Ok(code);
        }
        let code = match self.fetcher.code(address) {
            Ok(code) => code,
            Err(err) => self.degrade(StateKind::Code, address, err)?,
        };
        self.cache.set_code(address, code.clone());
        Ok(code)
    }

    /// Value of storage slot `slot` of `address`.
    pub fn get_storage(&mut self, address: Address, slot: B256) -> Result<B256, StateError> {
        if let Some(value) = self.cache.storage(address, slot) {
            return Ok(value);
        }
        let value = match self.fetcher.storage(address, slot) {
            Ok(value) => value,
            Err(err) => self.degrade(StateKind::Storage, address, err)?,
        };
        self.cache.set_storage(address, slot, value);
        Ok(value)
    }

    /// Nonce of `address`.
    pub fn get_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        if let Some(nonce) = self.cache.nonce(address) {
            return Ok(nonce);
        }
        let nonce = match self.fetcher.nonce(address) {
            Ok(nonce) => nonce,
            Err(err) => self.degrade(StateKind::Nonce, address, err)?,
        };
        self.cache.set_nonce(address, nonce);
        Ok(nonce)
    }

    fn diff_mut(&mut self, address: Address) -> &mut StateDiff {
        self.diffs.entry(address).or_insert_with(|| StateDiff::new(address))
    }

    fn write_balance(&mut self, address: Address, previous: U256, balance: U256) {
        self.diff_mut(address)
            .balance
            .get_or_insert(ValueChange { before: previous, after: previous })
            .after = balance;
        self.cache.set_balance(address, balance);
    }

    /// Credit `amount` to `address`, returning the balance before the credit.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<U256, StateError> {
        let previous = self.get_balance(address)?;
        self.write_balance(address, previous, previous.saturating_add(amount));
        Ok(previous)
    }

    /// Debit `amount` from `address`, returning the balance before the debit.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<U256, StateError> {
        let previous = self.get_balance(address)?;
        self.write_balance(address, previous, previous.saturating_sub(amount));
        Ok(previous)
    }

    /// Write a nonce.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        let previous = self.get_nonce(address)?;
        self.diff_mut(address)
            .nonce
            .get_or_insert(ValueChange { before: previous, after: previous })
            .after = nonce;
        self.cache.set_nonce(address, nonce);
        Ok(())
    }

    /// Write a storage slot.
    ///
    /// The first write to a slot captures its current value as "before"; later writes only
    /// move "after".
    pub fn set_storage(
        &mut self,
        address: Address,
        slot: B256,
        value: B256,
    ) -> Result<(), StateError> {
        let previous = self.get_storage(address, slot)?;
        self.write_storage(address, slot, previous, value);
        Ok(())
    }

    fn write_storage(&mut self, address: Address, slot: B256, before: B256, value: B256) {
        let preimage = self.preimages.get(&slot).cloned();
        let diff = self
            .diff_mut(address)
            .storage
            .entry(slot)
            .or_insert_with(|| StorageDiff::new(slot, before));
        diff.value_after = value;
        if preimage.is_some() {
            diff.preimage = preimage;
        }
        self.cache.set_storage(address, slot, value);
    }

    /// Seed the store with overrides before execution.
    ///
    /// Each overridden value becomes the slot's "before" value without consulting the
    /// fetcher, so an override on its own never shows up as a change.
    pub fn apply_overrides(&mut self, overrides: Vec<Override>) {
        for entry in &overrides {
            for slot in &entry.storage {
                debug!(
                    address = %entry.contract_address,
                    key = %slot.key,
                    "Applying storage override"
                );
                self.write_storage(entry.contract_address, slot.key, slot.value, slot.value);
            }
        }
        self.overrides.extend(overrides);
    }

    /// Decode a JSON override list and apply it; malformed input applies nothing.
    pub fn apply_overrides_json(&mut self, json: &str) {
        let overrides = parse_overrides_or_empty(json);
        self.apply_overrides(overrides);
    }

    /// Overrides applied so far
    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// Record that `preimage` hashes to `hash`.
    pub fn record_preimage(&mut self, hash: B256, preimage: Bytes) {
        self.preimages.record(hash, preimage);
    }

    /// Recorded preimages
    pub fn preimages(&self) -> &PreimageRegistry {
        &self.preimages
    }

    /// Snapshot of all diffs, in no particular order.
    pub fn diffs(&self) -> Vec<StateDiff> {
        self.diffs.values().cloned().collect()
    }

    /// Diff of one address, if it was written
    pub fn diff(&self, address: &Address) -> Option<&StateDiff> {
        self.diffs.get(address)
    }

    /// Consume the store, keeping what a report needs.
    pub fn into_parts(self) -> (Vec<StateDiff>, Vec<Override>, PreimageRegistry) {
        (self.diffs.into_values().collect(), self.overrides, self.preimages)
    }

    fn commit_account(&mut self, address: Address, account: Account) -> Result<(), StateError> {
        let previous = self.get_balance(address)?;
        match account.info.balance.cmp(&previous) {
            Ordering::Greater => {
                self.add_balance(address, account.info.balance - previous)?;
            }
            Ordering::Less => {
                self.sub_balance(address, previous - account.info.balance)?;
            }
            Ordering::Equal => {}
        }

        if account.info.nonce != self.get_nonce(address)? {
            self.set_nonce(address, account.info.nonce)?;
        }

        if account.is_created() {
            if let Some(code) = &account.info.code {
                self.cache.set_code(address, code.original_bytes());
                self.code_by_hash.insert(account.info.code_hash, code.clone());
            }
        }

        let mut slots: Vec<_> =
            account.storage.into_iter().filter(|(_, slot)| slot.is_changed()).collect();
        slots.sort_unstable_by_key(|(key, _)| *key);
        for (key, slot) in slots {
            self.set_storage(address, u256_to_word(key), u256_to_word(slot.present_value))?;
        }

        Ok(())
    }
}

impl<F: StateFetcher> Database for CachingStateStore<F> {
    type Error = StateError;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        let balance = self.get_balance(address)?;
        let nonce = self.get_nonce(address)?;
        let code = self.get_code(address)?;

        let (code_hash, bytecode) = if code.is_empty() {
            (KECCAK_EMPTY, Bytecode::default())
        } else {
            let bytecode = Bytecode::new_raw(code);
            (bytecode.hash_slow(), bytecode)
        };
        self.code_by_hash.entry(code_hash).or_insert_with(|| bytecode.clone());

        // Every address exists; the store is an execution stub, not a ledger.
        Ok(Some(AccountInfo::new(balance, nonce, code_hash, bytecode)))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        Ok(self.code_by_hash.get(&code_hash).cloned().unwrap_or_default())
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        Ok(word_to_u256(self.get_storage(address, u256_to_word(index))?))
    }

    fn block_hash(&mut self, number: u64) -> Result<B256, Self::Error> {
        match self.fetcher.block_hash(number) {
            Ok(hash) => Ok(hash),
            Err(source) if self.policy == FetchPolicy::Strict => {
                Err(StateError::BlockHash { number, source })
            }
            Err(source) => {
                self.fetch_failures += 1;
                warn!(number, "Failed to fetch block hash, using zero: {source}");
                Ok(B256::ZERO)
            }
        }
    }
}

impl<F: StateFetcher> DatabaseCommit for CachingStateStore<F> {
    fn commit(&mut self, changes: AddressMap<Account>) {
        let mut touched: Vec<_> =
            changes.into_iter().filter(|(_, account)| account.is_touched()).collect();
        touched.sort_unstable_by_key(|(address, _)| *address);

        for (address, account) in touched {
            if let Err(err) = self.commit_account(address, account) {
                error!(%address, "Failed to record committed account: {err}");
                self.commit_error.get_or_insert(err);
            }
        }
    }
}
