// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - Fetch/decode/execute loop and the frame model
//!
//! The VM keeps four stores: the operand stack, frame slots (parameters
//! below the frame pointer, locals above it), the global table, and the
//! explicit call-frame stack. Methods see their instance through a
//! receiver register.

mod interpreter;

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use quill_macros::config_struct;

pub use interpreter::VM;

config_struct! {
    /// Limits and diagnostics for a VM.
    pub struct VmConfig {
        /// Maximum operand stack height.
        max_stack: usize = 4096,
        /// Maximum number of nested calls.
        max_call_depth: usize = 512,
        /// Log every executed instruction at trace level.
        trace: bool = false,
        /// Print faults to stderr in addition to logging them.
        report_faults: bool = true,
    }
}

/// A cloneable in-memory output sink.
///
/// Hand one clone to [`VM::with_io`] and read the program's output from
/// another.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
