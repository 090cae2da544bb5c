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

//! statediff report - from raw state diffs to something a signer can check
//!
//! A [`ValidationConfig`] names contracts and explains their storage slots per chain.
//! [`ValidationReport::build`] combines it with the diffs and overrides of a simulation
//! into a sorted, de-noised model, which is then rendered once as Markdown
//! ([`render_markdown`]) or JSON ([`ToolReport`], [`FormattedReport`]).

/// Contract and slot configuration
pub mod config;
pub use config::*;

/// Decoding of raw storage words
pub mod decode;
pub use decode::*;

/// Error types of the report crate
pub mod error;
pub use error::*;

/// JSON report shapes
pub mod json;
pub use json::*;

/// Markdown rendering
pub mod markdown;
pub use markdown::*;

/// The structured report model
pub mod model;
pub use model::*;
