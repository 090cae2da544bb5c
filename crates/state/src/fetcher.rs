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

//! State fetchers.
//!
//! The EVM asks for state synchronously, one account or slot at a time. A
//! [`StateFetcher`] answers those questions at a single pinned block: the
//! [`RpcStateFetcher`] asks a remote node, the [`InMemoryFetcher`] answers from fixtures.

use crate::FetchError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, BlockNumberOrTag};
use auto_impl::auto_impl;
use std::{
    collections::{HashMap, HashSet},
    future::{Future, IntoFuture},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::trace;

/// Synchronous source of account state at a pinned block
#[auto_impl(&, Box, Arc)]
pub trait StateFetcher {
    /// Balance of `address`
    fn balance(&self, address: Address) -> Result<U256, FetchError>;

    /// Runtime code of `address`
    fn code(&self, address: Address) -> Result<Bytes, FetchError>;

    /// Value of storage slot `slot` of `address`
    fn storage(&self, address: Address, slot: B256) -> Result<B256, FetchError>;

    /// Nonce of `address`
    fn nonce(&self, address: Address) -> Result<u64, FetchError>;

    /// Hash of block `number`
    fn block_hash(&self, number: u64) -> Result<B256, FetchError>;
}

enum RuntimeHandle {
    Shared(Handle),
    Owned(Runtime),
}

/// Fetches state from a remote node at a fixed block.
///
/// Requests are issued one by one with no retries and no timeout layer: the first
/// answer, or the first failure, is final.
pub struct RpcStateFetcher<P> {
    provider: P,
    block: BlockId,
    runtime: RuntimeHandle,
}

impl<P: std::fmt::Debug> std::fmt::Debug for RpcStateFetcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcStateFetcher")
            .field("provider", &self.provider)
            .field("block", &self.block)
            .finish_non_exhaustive()
    }
}

impl<P: Provider> RpcStateFetcher<P> {
    /// Create a fetcher pinned to `block_number`.
    ///
    /// Reuses the ambient tokio runtime when there is one, otherwise starts a private one.
    pub fn new(provider: P, block_number: u64) -> Result<Self, FetchError> {
        let runtime = match Handle::try_current() {
            Ok(handle) => RuntimeHandle::Shared(handle),
            Err(_) => RuntimeHandle::Owned(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(FetchError::from_error)?,
            ),
        };
        Ok(Self { provider, block: BlockId::number(block_number), runtime })
    }

    fn block_on<F>(&self, fut: F) -> Result<F::Output, FetchError>
    where
        F: Future + Send,
        F::Output: Send,
    {
        match &self.runtime {
            RuntimeHandle::Owned(runtime) => Ok(runtime.block_on(fut)),
            RuntimeHandle::Shared(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => std::thread::scope(|scope| {
                    scope
                        .spawn(|| handle.block_on(fut))
                        .join()
                        .map_err(|_| FetchError::new("fetch thread panicked"))
                }),
                _ => Ok(tokio::task::block_in_place(|| handle.block_on(fut))),
            },
        }
    }
}

impl<P: Provider> StateFetcher for RpcStateFetcher<P> {
    fn balance(&self, address: Address) -> Result<U256, FetchError> {
        trace!(%address, "fetching balance");
        self.block_on(self.provider.get_balance(address).block_id(self.block).into_future())?
            .map_err(FetchError::from_error)
    }

    fn code(&self, address: Address) -> Result<Bytes, FetchError> {
        trace!(%address, "fetching code");
        self.block_on(self.provider.get_code_at(address).block_id(self.block).into_future())?
            .map_err(FetchError::from_error)
    }

    fn storage(&self, address: Address, slot: B256) -> Result<B256, FetchError> {
        trace!(%address, %slot, "fetching storage");
        let value = self
            .block_on(
                self.provider
                    .get_storage_at(address, crate::word_to_u256(slot))
                    .block_id(self.block)
                    .into_future(),
            )?
            .map_err(FetchError::from_error)?;
        Ok(crate::u256_to_word(value))
    }

    fn nonce(&self, address: Address) -> Result<u64, FetchError> {
        trace!(%address, "fetching nonce");
        self.block_on(
            self.provider.get_transaction_count(address).block_id(self.block).into_future(),
        )?
        .map_err(FetchError::from_error)
    }

    fn block_hash(&self, number: u64) -> Result<B256, FetchError> {
        trace!(number, "fetching block hash");
        let block = self
            .block_on(
                self.provider.get_block_by_number(BlockNumberOrTag::Number(number)).into_future(),
            )?
            .map_err(FetchError::from_error)?;
        block
            .map(|block| block.header.hash)
            .ok_or_else(|| FetchError::new(format!("block {number} not found")))
    }
}

#[derive(Debug, Clone, Default)]
struct FixtureAccount {
    balance: U256,
    nonce: u64,
    code: Bytes,
}

/// Fetcher answering from in-memory fixtures.
///
/// Unknown accounts and slots read as zero. Addresses marked with
/// [`InMemoryFetcher::with_failing_address`] fail every request, which makes fetch
/// degradation observable without a network. Clones share the request counter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    accounts: HashMap<Address, FixtureAccount>,
    storage: HashMap<(Address, B256), B256>,
    block_hashes: HashMap<u64, B256>,
    failing: HashSet<Address>,
    requests: Arc<AtomicUsize>,
}

impl InMemoryFetcher {
    /// An empty fixture set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance of `address`
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.accounts.entry(address).or_default().balance = balance;
        self
    }

    /// Set the nonce of `address`
    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.accounts.entry(address).or_default().nonce = nonce;
        self
    }

    /// Set the runtime code of `address`
    pub fn with_code(mut self, address: Address, code: impl Into<Bytes>) -> Self {
        self.accounts.entry(address).or_default().code = code.into();
        self
    }

    /// Set one storage slot of `address`
    pub fn with_storage(mut self, address: Address, slot: B256, value: B256) -> Self {
        self.storage.insert((address, slot), value);
        self
    }

    /// Set the hash of block `number`
    pub fn with_block_hash(mut self, number: u64, hash: B256) -> Self {
        self.block_hashes.insert(number, hash);
        self
    }

    /// Make every request about `address` fail
    pub fn with_failing_address(mut self, address: Address) -> Self {
        self.failing.insert(address);
        self
    }

    /// Number of requests served so far, failures included
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn account(&self, address: Address) -> Result<FixtureAccount, FetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(&address) {
            return Err(FetchError::new(format!("fixture failure for {address}")));
        }
        Ok(self.accounts.get(&address).cloned().unwrap_or_default())
    }
}

impl StateFetcher for InMemoryFetcher {
    fn balance(&self, address: Address) -> Result<U256, FetchError> {
        Ok(self.account(address)?.balance)
    }

    fn code(&self, address: Address) -> Result<Bytes, FetchError> {
        Ok(self.account(address)?.code)
    }

    fn storage(&self, address: Address, slot: B256) -> Result<B256, FetchError> {
        self.account(address)?;
        Ok(self.storage.get(&(address, slot)).copied().unwrap_or_default())
    }

    fn nonce(&self, address: Address) -> Result<u64, FetchError> {
        Ok(self.account(address)?.nonce)
    }

    fn block_hash(&self, number: u64) -> Result<B256, FetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.block_hashes
            .get(&number)
            .copied()
            .ok_or_else(|| FetchError::new(format!("block {number} not found")))
    }
}
