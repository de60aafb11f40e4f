// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic analysis and code generation from AST to bytecode.
//!
//! This module contains the `Compiler`, which walks a [`Program`] once,
//! checks every node against the static rules and emits the matching
//! instructions. Each lowering rule returns the static type of the node it
//! handled; statements produce [`Datatype::NULL`].
//!
//! Analysis is fail-fast: the first semantic error aborts the compilation,
//! the partial buffer is discarded and the error is returned.

mod calls;
mod classes;
mod desugar;
mod expressions;
mod fold;
mod scope;
mod statements;

#[cfg(test)]
mod tests;

pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolId, SymbolKind};

use quill_macros::bail;
use tracing::{debug, error, trace};

use crate::ast::*;
use crate::builtins;
use crate::compiler::CompilerOptions;
use crate::compiler::bytecode::{Bytecode, Instruction, OpCode, Operand};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::runtime::value::Value;

/// Distance of the first parameter below the frame pointer, on top of the
/// parameter count.
pub const PARAM_OFFSET: i64 = 0;

/// Result of analyzing one node: its static type.
type Typed = Result<Datatype, SemanticError>;

/// Compiles AST to bytecode.
pub struct Compiler {
    /// The bytecode being generated
    pub bytecode: Bytecode,
    /// Scope tree for symbol resolution
    pub scope: ScopeTree,
    options: CompilerOptions,
    classes: ClassRegistry,
}

impl Compiler {
    /// Creates a new compiler with default options.
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Creates a new compiler.
    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            bytecode: Bytecode::new(),
            scope: ScopeTree::new(),
            options,
            classes: ClassRegistry::new(),
        }
    }

    /// The options this compiler was created with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    // ========================================================================
    // Main Compilation Entry Point
    // ========================================================================

    /// Compiles a program AST to bytecode.
    ///
    /// Folded constant expressions are rewritten in place, and class names
    /// first seen during analysis are interned into `program.classes`.
    pub fn compile(&mut self, program: &mut Program) -> Result<Bytecode, SemanticError> {
        self.bytecode = Bytecode::new();
        self.scope.clear();
        self.classes = std::mem::take(&mut program.classes);
        debug!(
            source = %self.options.source_name,
            statements = program.body.len(),
            "compiling program"
        );

        let outcome = self.compile_program(&mut program.body);

        program.classes = std::mem::take(&mut self.classes);
        self.scope.clear();

        match outcome {
            Ok(()) => {
                self.emit_op(OpCode::Halt);
                debug_assert_eq!(self.bytecode.unpatched(), 0, "unpatched placeholders");
                debug!(instructions = self.bytecode.len(), "compiled program");
                Ok(std::mem::take(&mut self.bytecode))
            }
            Err(err) => {
                self.bytecode = Bytecode::new();
                error!(%err, "semantic analysis failed");
                if self.options.report_diagnostics {
                    eprintln!("{}", err);
                }
                Err(err)
            }
        }
    }

    fn compile_program(&mut self, body: &mut [Node]) -> Result<(), SemanticError> {
        if self.options.prelude {
            for mut decl in builtins::prelude() {
                self.eval(&mut decl)?;
            }
        }
        let keep_last = self.options.keep_last_value;
        self.eval_statements(body, keep_last)?;
        Ok(())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Analyzes a statement list, popping every unused expression value.
    ///
    /// With `keep_last`, the value of the final statement stays on the stack.
    fn eval_statements(&mut self, body: &mut [Node], keep_last: bool) -> Typed {
        let count = body.len();
        let mut last = Datatype::NULL;
        for (index, node) in body.iter_mut().enumerate() {
            let ty = self.eval(node)?;
            let keep = keep_last && index + 1 == count;
            if ty != Datatype::NULL && !keep {
                self.emit_op(OpCode::Pop);
            }
            last = ty;
        }
        Ok(last)
    }

    /// Analyzes one node and emits its code.
    fn eval(&mut self, node: &mut Node) -> Typed {
        if matches!(node.kind, NodeKind::Binary { .. }) && self.fold(node)? {
            return self.eval(node);
        }

        let location = node.location;
        trace!(kind = node.kind_name(), %location, "eval");

        match &mut node.kind {
            NodeKind::Ident { name } => self.eval_ident(name, location),
            NodeKind::Int { value } => {
                self.emit_push(Value::Int(*value));
                Ok(Datatype::INT)
            }
            NodeKind::Float { value } => {
                self.emit_push(Value::Float(*value));
                Ok(Datatype::FLOAT)
            }
            NodeKind::Bool { value } => {
                self.emit_push(Value::Bool(*value));
                Ok(Datatype::BOOL)
            }
            NodeKind::Char { value } => {
                self.emit_push(Value::Char(*value));
                Ok(Datatype::CHAR)
            }
            NodeKind::Str { value } => self.eval_string(value, location),
            NodeKind::Array { elements } => self.eval_array(elements, location),
            NodeKind::Binary { op, left, right } => self.eval_binary(*op, left, right, location),
            NodeKind::Assign { target, value } => self.eval_assign(target, value, location),
            NodeKind::Unary { op, expr } => self.eval_unary(*op, expr, location),
            NodeKind::Subscript { expr, key } => self.eval_subscript(expr, key, location),
            NodeKind::Member { .. } => bail!(self.error(location, SemanticErrorKind::ClassFieldAccess)),
            NodeKind::Call { callee, args } => self.eval_call(callee, args, location),
            NodeKind::Let { decl } => self.eval_var_decl(decl, location),
            NodeKind::Function { decl } => self.eval_function(decl, location),
            NodeKind::Class { decl } => self.eval_class(decl, location),
            NodeKind::If { clauses } => self.eval_if(clauses),
            NodeKind::While { cond, body } => self.eval_while(cond, body),
            NodeKind::Return { value } => self.eval_return(value.as_deref_mut(), location),
            NodeKind::Block { body } => self.eval_block(body),
            NodeKind::Annotation { flag } => self.eval_annotation(*flag, location),
        }
    }

    /// Analyzes a node whose runtime value is consumed.
    fn eval_operand(&mut self, node: &mut Node) -> Typed {
        let ty = self.eval(node)?;
        if ty == Datatype::LAMBDA {
            let name = match &node.kind {
                NodeKind::Ident { name } => name.clone(),
                other => other.kind().to_string(),
            };
            bail!(self.error(node.location, SemanticErrorKind::FunctionAsValue { name }));
        }
        Ok(ty)
    }

    fn fold(&self, node: &mut Node) -> Result<bool, SemanticError> {
        fold::fold_constants(node).map_err(|(location, kind)| self.error(location, kind))
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.bytecode.emit(instruction)
    }

    fn emit_op(&mut self, opcode: OpCode) -> usize {
        self.bytecode.emit_op(opcode)
    }

    fn emit_push(&mut self, value: Value) -> usize {
        self.bytecode.emit_push(value)
    }

    fn emit_with(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.emit(Instruction::with_operand(opcode, operand))
    }

    /// Pushes the value of a symbol `hops` real scopes away.
    fn emit_load(&mut self, symbol: SymbolId, hops: usize) {
        let (address, global) = {
            let symbol = self.scope.symbol(symbol);
            (symbol.address, symbol.global)
        };
        if global {
            self.emit_with(OpCode::GLoad, Operand::Address(address));
        } else if hops == 0 {
            self.emit_with(OpCode::Load, Operand::Address(address));
        } else {
            self.emit(Instruction::with_operands(
                OpCode::Upval,
                Operand::count(hops),
                Operand::Address(address),
            ));
        }
    }

    /// Pops the top of the stack into a symbol `hops` real scopes away.
    fn emit_store(&mut self, symbol: SymbolId, hops: usize) {
        let (address, global) = {
            let symbol = self.scope.symbol(symbol);
            (symbol.address, symbol.global)
        };
        if global {
            self.emit_with(OpCode::GStore, Operand::Address(address));
        } else if hops == 0 {
            self.emit_with(OpCode::Store, Operand::Address(address));
        } else {
            self.emit(Instruction::with_operands(
                OpCode::UpStore,
                Operand::count(hops),
                Operand::Address(address),
            ));
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn error(&self, location: Location, kind: SemanticErrorKind) -> SemanticError {
        SemanticError {
            source_name: self.options.source_name.clone(),
            location,
            kind,
        }
    }

    /// Renders a datatype with class names resolved.
    fn describe(&self, ty: Datatype) -> String {
        self.classes.describe(ty)
    }

    /// Declares `symbol` in the current scope, rejecting a redefinition.
    fn declare(&mut self, symbol: Symbol, location: Location) -> Result<SymbolId, SemanticError> {
        let name = symbol.name.clone();
        match self.scope.declare(symbol) {
            Ok(id) => {
                debug!(%name, depth = self.scope.depth(), "declared symbol");
                Ok(id)
            }
            Err(previous) => Err(self.error(
                location,
                SemanticErrorKind::Redefinition {
                    name,
                    line: previous.line,
                    column: previous.column,
                },
            )),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
