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

//! statediff state - the state-diffing database behind every simulation
//!
//! The [`CachingStateStore`] sits between revm and a remote [`StateFetcher`]. Every read
//! is memoized in a typed cache, every committed write is reduced to a before/after
//! pair per address and slot, and the store keeps the storage overrides and hash
//! preimages needed to explain those slots later.

/// Typed cache of fetched account state
pub mod cache;
/// Per-address and per-slot diff model
pub mod diff;
/// Error types raised by the store and its fetchers
pub mod error;
/// Remote and in-memory state fetchers
pub mod fetcher;
/// Caller-supplied storage overrides
pub mod overrides;
/// Registry of hash preimages observed during execution
pub mod preimage;
/// The caching, diff-recording state store
pub mod store;

pub use cache::*;
pub use diff::*;
pub use error::*;
pub use fetcher::*;
pub use overrides::*;
pub use preimage::*;
pub use store::*;

use alloy_primitives::{B256, U256};

/// Interpret a storage word as an unsigned integer.
pub fn word_to_u256(word: B256) -> U256 {
    U256::from_be_bytes(word.0)
}

/// Encode an unsigned integer as a storage word.
pub fn u256_to_word(value: U256) -> B256 {
    B256::new(value.to_be_bytes::<32>())
}

/// Parse a hex word of at most 32 bytes, `0x` optional, left-padding short input.
pub fn parse_word(raw: &str) -> Option<B256> {
    let digits = raw.trim();
    let digits = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")).unwrap_or(digits);
    if digits.is_empty() || digits.len() > 64 {
        return None;
    }
    format!("{digits:0>64}").parse().ok()
}
