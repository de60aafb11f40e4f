// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic analyzer and bytecode emitter.
//!
//! Checks an AST against the language's static rules and lowers it to
//! bytecode for the VM in a single pass.
//!
//! # Module Structure
//!
//! - `bytecode`: Bytecode definitions and instructions
//! - `codegen`: Analysis and lowering
//!   - `codegen::scope`: Scope tree and symbol resolution
//!   - `codegen::fold`: Constant folding
//!   - `codegen::desugar`: Accessor generation for annotated fields

pub mod bytecode;
pub mod codegen;

use quill_macros::config_struct;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand, PatchHandle};
pub use codegen::{Compiler, PARAM_OFFSET};

config_struct! {
    /// Options controlling a compilation.
    pub struct CompilerOptions {
        /// Name printed at the start of every diagnostic.
        source_name: String = "<script>".to_string(),
        /// Register the core intrinsics before the program.
        prelude: bool = true,
        /// Print diagnostics to stderr in addition to logging them.
        report_diagnostics: bool = true,
        /// Leave the value of the final top-level expression on the stack.
        keep_last_value: bool = true,
    }
}
