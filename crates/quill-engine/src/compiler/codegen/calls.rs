// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Call lowering: functions, constructors, intrinsics and methods.
//!
//! Arguments are pushed left to right after arity and type checks:
//!
//! | Callee | Emitted |
//! |--------|---------|
//! | function | `Invoke entry, argc, link` |
//! | constructor | `Invoke entry, argc, link` |
//! | intrinsic | `Syscall index - 1, argc` |
//! | sibling method | `LdArg0`, args, `InvokeVirtual entry, argc, link`, `SetArg0` |
//! | method on a value | receiver, args, `InvokeVirtual entry, argc, link`, store back |
//! | built-in value method | receiver, args, conversion or sequence opcode |
//!
//! `link` is the number of lexical frames from the caller out to the scope
//! that declares the callee. Methods link to the scope declaring their class.

use quill_macros::{bail, ensure};

use super::{Compiler, SymbolId, SymbolKind, Typed};
use crate::ast::*;
use crate::compiler::bytecode::{Instruction, OpCode, Operand};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::runtime::value::Value;

/// How a checked call is dispatched.
#[derive(Debug, Clone, Copy)]
enum CallTarget {
    /// Host intrinsic by its declared index
    Intrinsic(u32),
    /// Function or constructor entry and static link depth
    Direct(i64, usize),
    /// Method entry and static link depth, with the receiver below the arguments
    Virtual(i64, usize),
}

impl Compiler {
    pub(super) fn eval_call(&mut self, callee: &mut Node, args: &mut [Node], location: Location) -> Typed {
        match &mut callee.kind {
            NodeKind::Ident { name } => {
                let name = name.clone();
                self.call_named(&name, args, location)
            }
            NodeKind::Member { expr, name } => {
                let name = name.clone();
                self.call_method(expr, &name, args, location)
            }
            _ => bail!(self.error(location, SemanticErrorKind::InvalidCallee)),
        }
    }

    fn call_named(&mut self, name: &str, args: &mut [Node], location: Location) -> Typed {
        let Some((id, hops)) = self.scope.lookup_ext(name) else {
            bail!(self.error(
                location,
                SemanticErrorKind::ImplicitFunction {
                    name: name.to_string(),
                },
            ));
        };
        let symbol = self.scope.symbol(id);
        let (address, owner) = (symbol.address, symbol.owner);

        match symbol.kind.clone() {
            SymbolKind::Variable { .. } => bail!(self.error(
                location,
                SemanticErrorKind::NotAFunction {
                    name: name.to_string(),
                },
            )),
            SymbolKind::Function {
                params,
                returns,
                external: Some(index),
            } => {
                self.call_signature(name, &params, args, location, CallTarget::Intrinsic(index))?;
                Ok(returns)
            }
            SymbolKind::Function { params, returns, .. } if owner.is_some() => {
                if self.scope.current_class().is_some() {
                    bail!(self.error(
                        location,
                        SemanticErrorKind::FieldAccessInConstructor {
                            name: name.to_string(),
                        },
                    ));
                }
                let link = self.class_link(owner, location)?;
                self.emit_op(OpCode::LdArg0);
                self.call_signature(name, &params, args, location, CallTarget::Virtual(address, link))?;
                self.emit_op(OpCode::SetArg0);
                Ok(returns)
            }
            SymbolKind::Function { params, returns, .. } => {
                self.call_signature(name, &params, args, location, CallTarget::Direct(address, hops))?;
                Ok(returns)
            }
            SymbolKind::Class { id, params, .. } => {
                self.call_signature(name, &params, args, location, CallTarget::Direct(address, hops))?;
                Ok(Datatype::class(id))
            }
        }
    }

    /// Checks arity and argument types, pushes the arguments and emits the call.
    fn call_signature(
        &mut self,
        name: &str,
        params: &[Datatype],
        args: &mut [Node],
        location: Location,
        target: CallTarget,
    ) -> Result<(), SemanticError> {
        let expected = params.len();
        ensure!(
            args.len() <= expected,
            self.error(
                location,
                SemanticErrorKind::TooManyArguments {
                    name: name.to_string(),
                    expected,
                },
            )
        );
        ensure!(
            args.len() >= expected,
            self.error(
                location,
                SemanticErrorKind::TooFewArguments {
                    name: name.to_string(),
                    expected,
                },
            )
        );

        for (index, (param, arg)) in params.iter().zip(args.iter_mut()).enumerate() {
            let found = self.eval_operand(arg)?;
            if !param.accepts(&found) {
                bail!(self.error(
                    arg.location,
                    SemanticErrorKind::ParameterMismatch {
                        index: index + 1,
                        found: self.describe(found),
                        expected: self.describe(*param),
                    },
                ));
            }
        }

        let argc = args.len();
        let instruction = match target {
            CallTarget::Intrinsic(index) => Instruction::with_operands(
                OpCode::Syscall,
                Operand::Value(Value::Int(i64::from(index) - 1)),
                Operand::count(argc),
            ),
            CallTarget::Direct(entry, link) => Instruction::call(OpCode::Invoke, entry, argc, link),
            CallTarget::Virtual(entry, link) => Instruction::call(OpCode::InvokeVirtual, entry, argc, link),
        };
        self.emit(instruction);
        Ok(())
    }

    // ========================================================================
    // Methods
    // ========================================================================

    fn call_method(&mut self, receiver: &mut Node, name: &str, args: &mut [Node], location: Location) -> Typed {
        let ty = self.eval_operand(receiver)?;
        if ty.is_instance() {
            self.call_class_method(receiver, ty, name, args, location)
        } else if ty.is_sequence() {
            self.call_sequence_method(ty, name, args, location)
        } else {
            self.call_scalar_method(ty, name, args, location)
        }
    }

    fn call_class_method(
        &mut self,
        receiver: &Node,
        ty: Datatype,
        name: &str,
        args: &mut [Node],
        location: Location,
    ) -> Typed {
        let class_name = self.describe(ty);
        let Some(class) = ty.class.and_then(|id| self.scope.find_class(id)) else {
            bail!(self.error(location, SemanticErrorKind::UnknownClass { name: class_name }));
        };
        let Some(member) = self.scope.member(class, name) else {
            bail!(self.error(
                location,
                SemanticErrorKind::NoSuchMember {
                    member: name.to_string(),
                    class: class_name,
                },
            ));
        };

        let member = self.scope.symbol(member);
        let address = member.address;
        let SymbolKind::Function { params, returns, .. } = member.kind.clone() else {
            bail!(self.error(
                location,
                SemanticErrorKind::NotAFunction {
                    name: name.to_string(),
                },
            ));
        };

        let link = self.class_link(Some(class), location)?;
        self.call_signature(name, &params, args, location, CallTarget::Virtual(address, link))?;
        self.store_receiver(receiver);
        Ok(returns)
    }

    /// Static link depth of a method call: the frames out to the scope
    /// declaring the method's class.
    fn class_link(&self, class: Option<SymbolId>, location: Location) -> Result<usize, SemanticError> {
        match class.and_then(|class| self.scope.link_to(class)) {
            Some(link) => Ok(link),
            None => bail!(self.error(
                location,
                SemanticErrorKind::UnknownClass {
                    name: class.map(|class| self.scope.symbol(class).name.clone()).unwrap_or_default(),
                },
            )),
        }
    }

    /// Consumes the receiver handed back by `RetVirtual`.
    ///
    /// Plain variables get it stored back; anything else is popped.
    fn store_receiver(&mut self, receiver: &Node) {
        if let NodeKind::Ident { name } = &receiver.kind {
            if let Some((id, hops)) = self.scope.lookup_ext(name) {
                let symbol = self.scope.symbol(id);
                if symbol.is_variable() && symbol.owner.is_none() {
                    self.emit_store(id, hops);
                    return;
                }
            }
        }
        self.emit_op(OpCode::Pop);
    }

    fn call_sequence_method(&mut self, ty: Datatype, name: &str, args: &mut [Node], location: Location) -> Typed {
        let Some(element) = ty.element() else {
            bail!(self.error(location, self.no_such_method(name, ty)));
        };

        match name {
            "length" => {
                self.expect_no_arguments(name, args, location)?;
                self.emit_op(OpCode::Len);
                Ok(Datatype::INT)
            }
            "empty" => {
                self.expect_no_arguments(name, args, location)?;
                self.emit_op(OpCode::Len);
                self.emit_push(Value::Int(0));
                self.emit_op(OpCode::Le);
                Ok(Datatype::BOOL)
            }
            "append" => {
                self.expect_argument(name, args, ty, location)?;
                self.emit_op(OpCode::Append);
                Ok(ty)
            }
            "cons" => {
                self.expect_argument(name, args, element, location)?;
                self.emit_op(OpCode::Cons);
                Ok(ty)
            }
            "at" => {
                self.expect_argument(name, args, Datatype::INT, location)?;
                self.emit_op(OpCode::GetSub);
                Ok(element)
            }
            _ => bail!(self.error(location, self.no_such_method(name, ty))),
        }
    }

    fn call_scalar_method(&mut self, ty: Datatype, name: &str, args: &mut [Node], location: Location) -> Typed {
        let (opcodes, result): (&[OpCode], Datatype) = match (ty, name) {
            (Datatype::INT, "to_f") => (&[OpCode::I2F], Datatype::FLOAT),
            (Datatype::INT, "to_c") => (&[OpCode::I2C], Datatype::CHAR),
            (Datatype::CHAR, "to_i") => (&[OpCode::C2I], Datatype::INT),
            (Datatype::CHAR, "to_f") => (&[OpCode::C2I, OpCode::I2F], Datatype::FLOAT),
            (Datatype::FLOAT, "to_i") => (&[OpCode::F2I], Datatype::INT),
            (Datatype::FLOAT, "to_c") => (&[OpCode::F2I, OpCode::I2C], Datatype::CHAR),
            (Datatype::BOOL, "to_i") => (&[OpCode::B2I], Datatype::INT),
            (Datatype::INT | Datatype::CHAR | Datatype::FLOAT | Datatype::BOOL, "to_str") => {
                (&[OpCode::ToStr], Datatype::STRING)
            }
            _ => bail!(self.error(location, self.no_such_method(name, ty))),
        };

        self.expect_no_arguments(name, args, location)?;
        for opcode in opcodes {
            self.emit_op(*opcode);
        }
        Ok(result)
    }

    fn no_such_method(&self, name: &str, ty: Datatype) -> SemanticErrorKind {
        SemanticErrorKind::NoSuchMethod {
            method: name.to_string(),
            ty: self.describe(ty),
        }
    }

    fn expect_no_arguments(&self, name: &str, args: &[Node], location: Location) -> Result<(), SemanticError> {
        ensure!(
            args.is_empty(),
            self.error(
                location,
                SemanticErrorKind::ExpectedNoArguments {
                    method: name.to_string(),
                },
            )
        );
        Ok(())
    }

    /// Pushes the single argument of a value method, checking its type.
    fn expect_argument(
        &mut self,
        name: &str,
        args: &mut [Node],
        expected: Datatype,
        location: Location,
    ) -> Result<(), SemanticError> {
        let [arg] = args else {
            bail!(self.error(
                location,
                SemanticErrorKind::ExpectedOneArgument {
                    method: name.to_string(),
                },
            ));
        };
        let found = self.eval_operand(arg)?;
        if found != expected {
            bail!(self.error(
                arg.location,
                SemanticErrorKind::ArgumentMismatch {
                    method: name.to_string(),
                    expected: self.describe(expected),
                    found: self.describe(found),
                },
            ));
        }
        Ok(())
    }
}
