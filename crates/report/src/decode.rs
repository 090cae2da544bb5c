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

//! Decoding of raw storage words.
//!
//! A slot's configured `type` tag selects how its 32-byte values are shown. Tags without
//! a decoder still render, as an explicit placeholder.

use alloy_primitives::{Address, B256, U256};
use std::{convert::Infallible, fmt, str::FromStr};

/// Placeholder shown for values whose kind has no decoder
pub const UNDECODED_VALUE: &str = "<<DecodedValue>>";

/// How the value of a storage slot is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Big-endian unsigned integer, shown in decimal
    Uint256,
    /// Address in the low 20 bytes, shown checksummed
    Address,
    /// Any other tag, kept verbatim
    Unknown(String),
}

impl SlotKind {
    /// Render `word` according to this kind.
    pub fn decode(&self, word: B256) -> String {
        match self {
            Self::Uint256 => U256::from_be_bytes(word.0).to_string(),
            Self::Address => Address::from_word(word).to_checksum(None),
            Self::Unknown(_) => UNDECODED_VALUE.to_string(),
        }
    }

    /// The tag as written in configuration.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uint256 => "uint256",
            Self::Address => "address",
            Self::Unknown(tag) => tag,
        }
    }
}

impl FromStr for SlotKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "uint256" => Self::Uint256,
            "address" => Self::Address,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
