// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Statement lowering.
//!
//! Statements report [`Datatype::NULL`](crate::ast::Datatype::NULL) and
//! leave the operand stack as they found it.
//!
//! ## Statement Compilation Overview
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `let` | `Store`/`GStore` | Slot from the enclosing frame |
//! | `fn` | `Jmp` over body, `Reserve`, `Ret` | Body analyzed in a real scope |
//! | `return` | `Ret`/`RetVirtual` | Must end the function body |
//! | `if/else` | `Jmpf`, `Jmp` | Bodies analyzed in virtual scopes |
//! | `while` | `Jmpf`, `Jmp` (back) | Body analyzed in a virtual scope |
//! | `@Annotation` | none | Flags the next declaration |
//!
//! ## Function Layout
//!
//! ```text
//! fn add(a: int, b: int) -> int { return a + b }
//!
//! Bytecode:
//!   jmp end            ; declarations do not run their body
//! entry:
//!   reserve 0          ; frame size, patched when the body closes
//!   load -2            ; a
//!   load -1            ; b
//!   iadd
//!   ret
//! end:
//! ```
//!
//! Parameters live below the frame pointer at
//! `-(count + PARAM_OFFSET) + index`; locals count up from zero.
//!
//! ## Control Flow Compilation
//!
//! ```text
//! if a { A } else if b { B } else { C }
//!
//! Bytecode:
//!   [a]
//!   jmpf next1
//!   [A]
//!   jmp end
//! next1:
//!   [b]
//!   jmpf next2
//!   [B]
//!   jmp end
//! next2:
//!   [C]
//! end:
//! ```
//!
//! ```text
//! while c { B }
//!
//! Bytecode:
//! start:
//!   [c]
//!   jmpf end
//!   [B]
//!   jmp start
//! end:
//! ```

use quill_macros::bail;
use tracing::debug;

use super::{Compiler, PARAM_OFFSET, ScopeKind, Symbol, SymbolId, SymbolKind, Typed};
use crate::ast::*;
use crate::compiler::bytecode::{OpCode, Operand};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::runtime::value::Value;

impl Compiler {
    // ========================================================================
    // Declarations
    // ========================================================================

    pub(super) fn eval_var_decl(&mut self, decl: &mut VarDecl, location: Location) -> Typed {
        self.declare_variable(decl, location)?;
        Ok(Datatype::NULL)
    }

    /// Declares a variable and stores its initializer.
    ///
    /// Returns `None` when a pending `@Unused` skipped the declaration.
    pub(super) fn declare_variable(
        &mut self,
        decl: &mut VarDecl,
        location: Location,
    ) -> Result<Option<SymbolId>, SemanticError> {
        if self.scope.flags().contains(Annotation::UNUSED) {
            self.scope.clear_flags();
            debug!(name = %decl.name, "skipped unused declaration");
            return Ok(None);
        }
        self.ensure_undeclared(&decl.name, location)?;

        let ty = self.eval(&mut decl.init)?;
        let invalid = if ty == Datatype::VOID {
            Some(SemanticErrorKind::VoidInitializer)
        } else if ty == Datatype::NULL {
            Some(SemanticErrorKind::NullInitializer)
        } else if ty == Datatype::LAMBDA {
            Some(SemanticErrorKind::FunctionInitializer)
        } else {
            None
        };
        if let Some(kind) = invalid {
            bail!(self.error(decl.init.location, kind));
        }

        if let Some(class) = self.scope.current_class() {
            if let SymbolKind::Class { id, .. } = &self.scope.symbol(class).kind {
                if ty.class == Some(*id) {
                    bail!(self.error(
                        location,
                        SemanticErrorKind::CircularReference {
                            class: self.describe(Datatype::class(*id)),
                        },
                    ));
                }
            }
        }

        let array_size = if ty.is_sequence() {
            self.bytecode
                .last()
                .filter(|instruction| matches!(instruction.opcode(), Some(OpCode::Arr | OpCode::Str)))
                .and_then(|instruction| instruction.first.as_ref())
                .and_then(Operand::as_int)
                .map(|size| size as usize)
        } else {
            None
        };

        let mut symbol = Symbol::variable(&decl.name, location, ty, decl.mutable);
        symbol.address = self.scope.next_address();
        symbol.array_size = array_size;
        let id = self.declare(symbol, location)?;
        self.emit_store(id, 0);
        Ok(Some(id))
    }

    /// Rejects a name already declared in the current scope.
    pub(super) fn ensure_undeclared(&self, name: &str, location: Location) -> Result<(), SemanticError> {
        if let Some(existing) = self.scope.lookup_local(name) {
            let previous = self.scope.symbol(existing).location;
            bail!(self.error(
                location,
                SemanticErrorKind::Redefinition {
                    name: name.to_string(),
                    line: previous.line,
                    column: previous.column,
                },
            ));
        }
        Ok(())
    }

    pub(super) fn eval_function(&mut self, decl: &mut FuncDecl, location: Location) -> Typed {
        self.declare_function(decl, location)?;
        Ok(Datatype::NULL)
    }

    /// Declares a function and lowers its body in place.
    ///
    /// The symbol is registered before the body is analyzed, so the body
    /// can call itself. Inside a class body it also becomes a method.
    pub(super) fn declare_function(
        &mut self,
        decl: &mut FuncDecl,
        location: Location,
    ) -> Result<SymbolId, SemanticError> {
        self.ensure_undeclared(&decl.name, location)?;
        let params: Vec<Datatype> = decl.params.iter().map(|param| param.datatype).collect();

        if let Some(index) = decl.external {
            let symbol = Symbol::function(&decl.name, location, params, decl.returns, Some(index));
            return self.declare(symbol, location);
        }

        let class = self.scope.current_class();
        let method = class.is_some();
        let skip = self.bytecode.emit_placeholder(OpCode::Jmp);
        let entry = self.bytecode.len();

        let mut symbol = Symbol::function(&decl.name, location, params, decl.returns, None);
        symbol.address = entry as i64;
        let id = self.declare(symbol, location)?;
        if let Some(class) = class {
            self.scope.add_member(class, id);
        }

        self.scope.push(ScopeKind::Function {
            returns: decl.returns,
            method,
        });
        let reserve = self.bytecode.emit_placeholder(OpCode::Reserve);
        self.declare_params(&decl.params, false)?;
        self.eval_body(&decl.name, decl.returns, &mut decl.body, location)?;
        let frame = self.scope.pop();
        self.bytecode.patch_count(reserve, frame);

        if decl.returns == Datatype::VOID {
            self.emit_push(Value::Int(0));
            self.emit_op(if method { OpCode::RetVirtual } else { OpCode::Ret });
        }

        let end = self.bytecode.len();
        self.bytecode.patch(skip, end);
        debug!(name = %decl.name, entry, frame, "lowered function");
        Ok(id)
    }

    /// Declares parameters below the frame pointer of the current scope.
    pub(super) fn declare_params(&mut self, params: &[Param], class_param: bool) -> Result<(), SemanticError> {
        let count = params.len() as i64;
        for (index, param) in params.iter().enumerate() {
            let mut symbol = Symbol::variable(&param.name, param.location, param.datatype, param.mutable);
            symbol.address = -(count + PARAM_OFFSET) + index as i64;
            symbol.class_param = class_param;
            self.declare(symbol, param.location)?;
        }
        Ok(())
    }

    /// Lowers a function body, enforcing the return rules.
    fn eval_body(
        &mut self,
        name: &str,
        returns: Datatype,
        body: &mut [Node],
        location: Location,
    ) -> Result<(), SemanticError> {
        let count = body.len();
        let mut returned = false;

        for (index, statement) in body.iter_mut().enumerate() {
            if let NodeKind::Return { value } = &statement.kind {
                let problem = if index + 1 != count {
                    Some(SemanticErrorKind::ReturnBeforeEnd)
                } else if value.is_some() && returns == Datatype::VOID {
                    Some(SemanticErrorKind::VoidReturnsValue)
                } else if value.is_none() && returns != Datatype::VOID {
                    Some(SemanticErrorKind::ReturnWithoutValue)
                } else {
                    None
                };
                if let Some(kind) = problem {
                    bail!(self.error(statement.location, kind));
                }
                returned = true;
            }

            let ty = self.eval(statement)?;
            if ty != Datatype::NULL {
                self.emit_op(OpCode::Pop);
            }
        }

        if !returned && returns != Datatype::VOID {
            bail!(self.error(
                location,
                SemanticErrorKind::MissingReturn {
                    name: name.to_string(),
                },
            ));
        }
        Ok(())
    }

    pub(super) fn eval_return(&mut self, value: Option<&mut Node>, location: Location) -> Typed {
        let Some((returns, method)) = self.scope.enclosing_function() else {
            bail!(self.error(location, SemanticErrorKind::ReturnOutsideFunction));
        };

        let found = match value {
            Some(value) => self.eval_operand(value)?,
            None => {
                self.emit_push(Value::Int(0));
                Datatype::VOID
            }
        };
        if found != returns {
            bail!(self.error(
                location,
                SemanticErrorKind::ReturnTypeMismatch {
                    expected: self.describe(returns),
                    found: self.describe(found),
                },
            ));
        }

        self.emit_op(if method { OpCode::RetVirtual } else { OpCode::Ret });
        Ok(Datatype::NULL)
    }

    pub(super) fn eval_annotation(&mut self, flag: Annotation, location: Location) -> Typed {
        if self.scope.flags().contains(flag) {
            bail!(self.error(
                location,
                SemanticErrorKind::AnnotationAlreadySet {
                    annotation: flag.name(),
                },
            ));
        }
        if flag != Annotation::UNUSED && self.scope.current_class().is_none() {
            bail!(self.error(
                location,
                SemanticErrorKind::AnnotationOutsideClass {
                    annotation: flag.name(),
                },
            ));
        }
        self.scope.set_flag(flag);
        Ok(Datatype::NULL)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn eval_condition(&mut self, cond: &mut Node) -> Result<(), SemanticError> {
        let ty = self.eval_operand(cond)?;
        if ty != Datatype::BOOL {
            bail!(self.error(
                cond.location,
                SemanticErrorKind::ConditionNotBool {
                    found: self.describe(ty),
                },
            ));
        }
        Ok(())
    }

    pub(super) fn eval_if(&mut self, clauses: &mut [IfClause]) -> Typed {
        let count = clauses.len();
        let mut exits = Vec::new();

        for (index, clause) in clauses.iter_mut().enumerate() {
            let next = match clause.cond.as_mut() {
                Some(cond) => {
                    self.eval_condition(cond)?;
                    Some(self.bytecode.emit_placeholder(OpCode::Jmpf))
                }
                None => None,
            };

            self.scope.push_virtual(ScopeKind::Block);
            self.eval_statements(&mut clause.body, false)?;
            self.scope.pop();

            if let Some(next) = next {
                if index + 1 < count {
                    exits.push(self.bytecode.emit_placeholder(OpCode::Jmp));
                }
                let target = self.bytecode.len();
                self.bytecode.patch(next, target);
            }
        }

        let end = self.bytecode.len();
        for exit in exits {
            self.bytecode.patch(exit, end);
        }
        Ok(Datatype::NULL)
    }

    pub(super) fn eval_while(&mut self, cond: &mut Node, body: &mut [Node]) -> Typed {
        let start = self.bytecode.len();
        self.eval_condition(cond)?;
        let exit = self.bytecode.emit_placeholder(OpCode::Jmpf);

        self.scope.push_virtual(ScopeKind::Block);
        self.eval_statements(body, false)?;
        self.scope.pop();

        self.emit_with(OpCode::Jmp, Operand::Address(start as i64));
        let end = self.bytecode.len();
        self.bytecode.patch(exit, end);
        Ok(Datatype::NULL)
    }

    pub(super) fn eval_block(&mut self, body: &mut [Node]) -> Typed {
        self.scope.push_virtual(ScopeKind::Block);
        self.eval_statements(body, false)?;
        self.scope.pop();
        Ok(Datatype::NULL)
    }
}
