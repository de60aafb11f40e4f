// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Call frame records.

use super::value::Value;

/// One activation: the callee's own frame plus the caller state restored
/// by its return.
///
/// Frame-relative addresses resolve against the frame pointer: parameters
/// sit at negative offsets below it, locals at non-negative offsets above.
/// `static_link` names the activation of the scope the callee was declared
/// in. Enclosing-frame accesses follow these links.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The callee's frame pointer
    pub frame_pointer: usize,
    /// Index of the lexically enclosing activation; `None` at top level
    pub static_link: Option<usize>,
    /// Instruction to resume at in the caller
    pub return_pc: usize,
    /// The caller's frame pointer
    pub saved_fp: usize,
    /// First slot owned by the callee (its first argument)
    pub slot_base: usize,
    /// Operand stack height when the callee was entered
    pub stack_base: usize,
    /// The caller's receiver
    pub saved_receiver: Option<Value>,
}
