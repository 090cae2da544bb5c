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

//! Preimage recording inspector.
//!
//! Mapping and dynamic-array slots are hashes. Watching every `KECCAK256` reveals the
//! hashed input, which later lets a mapping slot be traced back to the slot of the
//! mapping itself.

use alloy_primitives::{keccak256, Bytes};
use revm::{
    bytecode::opcode,
    interpreter::{interpreter_types::Jumps, Interpreter},
    Inspector,
};
use statediff_state::PreimageRegistry;
use tracing::trace;

/// Inspector recording the input of every `KECCAK256` executed.
///
/// Offset and size are read from the stack before the opcode runs; the input is read
/// from memory after it ran, once the memory has been expanded to cover it.
#[derive(Debug, Default)]
pub struct PreimageRecorder {
    pending: Option<(usize, usize)>,
    registry: PreimageRegistry,
}

impl PreimageRecorder {
    /// Create a recorder with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded preimages, leaving the recorder empty.
    pub fn take_registry(&mut self) -> PreimageRegistry {
        std::mem::take(&mut self.registry)
    }
}

impl<CTX> Inspector<CTX> for PreimageRecorder {
    fn step(&mut self, interp: &mut Interpreter, _context: &mut CTX) {
        self.pending = None;
        if interp.bytecode.opcode() != opcode::KECCAK256 {
            return;
        }

        // Top of the stack is the offset, the size sits right below it.
        let [.., size, offset] = interp.stack.data().as_slice() else {
            return;
        };
        if let (Ok(offset), Ok(size)) = (usize::try_from(*offset), usize::try_from(*size)) {
            self.pending = Some((offset, size));
        }
    }

    fn step_end(&mut self, interp: &mut Interpreter, _context: &mut CTX) {
        let Some((offset, size)) = self.pending.take() else {
            return;
        };
        if size == 0 || offset.saturating_add(size) > interp.memory.len() {
            return;
        }

        let preimage = Bytes::copy_from_slice(&interp.memory.slice_len(offset, size));
        let hash = keccak256(&preimage);
        trace!(%hash, size, "recorded preimage");
        self.registry.record(hash, preimage);
    }
}
