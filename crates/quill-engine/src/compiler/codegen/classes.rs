// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Class lowering.
//!
//! A class body is its constructor. Calling the class runs the body, which
//! builds an instance, fills its fields in declaration order and returns it.
//!
//! ```text
//! class Point(x0: int) { @Getter let mut x = x0 }
//!
//! Bytecode:
//!   jmp end
//! entry:
//!   reserve 1          ; one slot per field
//!   class 1            ; push a fresh instance with one field
//!   load -1            ; x0
//!   store 0            ; x
//!   load 0
//!   setfield @0        ; instance stays on the stack
//!   jmp after_getX     ; methods are declared like functions
//!   ...
//!   ret                ; returns the instance
//! end:
//! ```
//!
//! Fields and methods share the class's member namespace. Methods reach
//! fields through the receiver register (`LdArg0`/`GetField`).

use quill_macros::bail;
use tracing::debug;

use super::{Compiler, ScopeKind, Symbol, SymbolId, Typed, desugar};
use crate::ast::*;
use crate::compiler::bytecode::{OpCode, Operand};
use crate::error::{SemanticError, SemanticErrorKind};

impl Compiler {
    pub(super) fn eval_class(&mut self, decl: &mut ClassDecl, location: Location) -> Typed {
        let id = self.classes.intern(&decl.name);
        if self.scope.has_local_class(id) {
            bail!(self.error(
                location,
                SemanticErrorKind::ClassAlreadyExists {
                    name: decl.name.clone(),
                },
            ));
        }
        self.ensure_undeclared(&decl.name, location)?;

        let skip = self.bytecode.emit_placeholder(OpCode::Jmp);
        let entry = self.bytecode.len();

        let params: Vec<Datatype> = decl.params.iter().map(|param| param.datatype).collect();
        let mut symbol = Symbol::class(&decl.name, location, id, params);
        symbol.address = entry as i64;
        let class = self.declare(symbol, location)?;
        self.scope.register_class(id, class);

        self.scope.push(ScopeKind::Class { class });
        let reserve = self.bytecode.emit_placeholder(OpCode::Reserve);
        let instance = self.bytecode.emit_placeholder(OpCode::Class);
        self.declare_params(&decl.params, true)?;

        for item in decl.body.iter_mut() {
            let item_location = item.location;
            match &mut item.kind {
                NodeKind::Annotation { flag } => {
                    self.eval_annotation(*flag, item_location)?;
                }
                NodeKind::Let { decl } => self.lower_field(class, decl, item_location)?,
                NodeKind::Function { decl } => {
                    self.scope.clear_flags();
                    self.declare_function(decl, item_location)?;
                }
                _ => bail!(self.error(item_location, SemanticErrorKind::StatementInClassBody)),
            }
        }

        let fields = self.scope.pop();
        self.bytecode.patch_count(reserve, fields);
        self.bytecode.patch_count(instance, fields);
        self.emit_op(OpCode::Ret);

        let end = self.bytecode.len();
        self.bytecode.patch(skip, end);
        debug!(name = %decl.name, entry, fields, "lowered class");
        Ok(Datatype::NULL)
    }

    /// Declares a field, copies it into the instance and adds its accessors.
    fn lower_field(&mut self, class: SymbolId, decl: &mut VarDecl, location: Location) -> Result<(), SemanticError> {
        let flags = self.scope.flags();
        let Some(field) = self.declare_variable(decl, location)? else {
            return Ok(());
        };

        let (address, datatype) = {
            let symbol = self.scope.symbol(field);
            (symbol.address, symbol.datatype)
        };
        self.emit_with(OpCode::Load, Operand::Address(address));
        self.emit_with(OpCode::SetField, Operand::Address(address));
        self.scope.add_member(class, field);

        let methods =
            desugar::accessors(decl, datatype, flags, location).map_err(|kind| self.error(location, kind))?;
        self.scope.clear_flags();
        for mut method in methods {
            self.declare_function(&mut method, location)?;
        }
        Ok(())
    }
}
