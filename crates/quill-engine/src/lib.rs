// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # quill-engine
//!
//! Semantic analyzer, bytecode emitter and stack virtual machine for Quill,
//! a small statically typed scripting language.
//!
//! ## Overview
//!
//! - `ast` - Syntax tree model and construction helpers
//! - `compiler` - Single-pass type checking and lowering to bytecode
//! - `vm` - Fetch/decode/execute loop over the emitted bytecode
//! - `builtins` - Host intrinsics reachable through `syscall`
//!
//! Programs arrive as trees; lexing and parsing live in front ends.
//!
//! ## Quick Start
//!
//! ```
//! use quill_engine::ast::{build::*, BinaryOp, Program};
//! use quill_engine::{Engine, Value};
//!
//! let mut program = Program::new(vec![
//!     let_decl("x", int(20)),
//!     binary(BinaryOp::Add, ident("x"), int(22)),
//! ]);
//! let mut engine = Engine::new();
//! assert_eq!(engine.run(&mut program).unwrap(), Some(Value::Int(42)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod error;
pub mod runtime;
pub mod vm;

pub use compiler::{Bytecode, Compiler, CompilerOptions};
pub use error::{Error, Fault, Result, RuntimeError, SemanticError, SemanticErrorKind};
pub use runtime::value::Value;
pub use vm::{VM, VmConfig};

use ast::Program;

/// A compiler and a VM wired together.
pub struct Engine {
    compiler: Compiler,
    vm: VM,
}

impl Engine {
    /// Creates an engine with default options, using stdin and stdout.
    pub fn new() -> Self {
        Self::with_vm(CompilerOptions::default(), VM::new())
    }

    /// Creates an engine with the given options.
    pub fn with_options(options: CompilerOptions, config: VmConfig) -> Self {
        Self::with_vm(options, VM::with_config(config))
    }

    /// Creates an engine around a prepared VM, e.g. one with injected I/O.
    pub fn with_vm(options: CompilerOptions, vm: VM) -> Self {
        Self {
            compiler: Compiler::with_options(options),
            vm,
        }
    }

    /// Checks and lowers a program without running it.
    pub fn compile(&mut self, program: &mut Program) -> Result<Bytecode> {
        Ok(self.compiler.compile(program)?)
    }

    /// Compiles and runs a program.
    ///
    /// Returns the value left on the operand stack at halt, which is the
    /// value of a trailing expression statement when
    /// [`CompilerOptions::keep_last_value`] is set.
    pub fn run(&mut self, program: &mut Program) -> Result<Option<Value>> {
        let bytecode = self.compile(program)?;
        Ok(self.vm.execute(&bytecode)?)
    }

    /// The engine's VM.
    pub fn vm(&self) -> &VM {
        &self.vm
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{BinaryOp, Datatype};

    fn quiet() -> Engine {
        Engine::with_options(
            CompilerOptions::default().report_diagnostics(false),
            VmConfig::default().report_faults(false),
        )
    }

    #[test]
    fn test_engine_runs_expression() {
        let mut program = Program::new(vec![binary(BinaryOp::Mul, int(6), int(7))]);
        assert_eq!(quiet().run(&mut program), Ok(Some(Value::Int(42))));
    }

    #[test]
    fn test_engine_semantic_error() {
        let mut program = Program::new(vec![ident("missing").at(2, 4)]);
        let err = quiet().run(&mut program).unwrap_err();
        assert!(matches!(err, Error::Semantic(_)));
        assert_eq!(
            err.to_string(),
            "<script>:2:4 (Semantic): Implicit declaration of field 'missing'"
        );
    }

    #[test]
    fn test_engine_runtime_error() {
        let mut program = Program::new(vec![
            func(
                "div",
                vec![param("a", Datatype::INT), param("b", Datatype::INT)],
                Datatype::INT,
                vec![return_value(binary(BinaryOp::Div, ident("a"), ident("b")))],
            ),
            call("div", vec![int(1), int(0)]),
        ]);
        let err = quiet().run(&mut program).unwrap_err();
        assert!(matches!(
            err,
            Error::Runtime(RuntimeError {
                fault: Fault::DivisionByZero,
                ..
            })
        ));
    }
}
