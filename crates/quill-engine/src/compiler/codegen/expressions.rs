// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expression lowering.
//!
//! Expressions leave exactly one value on the operand stack and report
//! their static type.
//!
//! | Expression | Key Operations | Stack Effect |
//! |------------|----------------|--------------|
//! | Literal | `Push` | Push value |
//! | Identifier | `Load`/`GLoad`/`Upval`, `LdArg0 GetField` for fields | Push value |
//! | Interpolated string | `Push`, `Append`/`Cons`/`ToStr` | Push string |
//! | Array literal | `Arr n` / `Str n` | Pop n, push 1 |
//! | Binary | typed opcode, see below | Pop 2, push 1 |
//! | Unary | `IMinus`/`FMinus`/`BitNot`/`Not` | Pop 1, push 1 |
//! | Subscript | `GetSub` | Pop 2, push 1 |
//! | Assignment | `Store`/`SetSub`/`SetField` | None |
//!
//! ## Binary Operators
//!
//! Both operands must have the same type; the opcode is chosen by it:
//!
//! | Type | Operators |
//! |------|-----------|
//! | `int` | `+ - * / % << >> & \| ^`, `== !=`, `< > <= >=` |
//! | `float` | `+ - * /`, `== !=`, `< > <= >=` |
//! | `char` | `== !=`, `< > <= >=` |
//! | `bool` | `== !=`, `&& \|\|` |
//! | `string`, arrays | `+` (`Append`), `==` (`ArrEq`), `!=` (`ArrEq Not`) |

use quill_macros::bail;

use super::{Compiler, SymbolId, Typed};
use crate::ast::*;
use crate::compiler::bytecode::{OpCode, Operand};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::runtime::value::Value;

/// A piece of a string literal.
#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Text(String),
    Name(&'a str),
}

/// Splits `$name` spans out of a string literal.
///
/// A `$` not followed by an identifier start stays literal text. When any
/// name is present, the first segment is always text (possibly empty).
fn split_interpolation(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c == '$' {
            if let Some(&(start, next)) = chars.peek() {
                if next.is_alphabetic() || next == '_' {
                    let mut end = start;
                    while let Some(&(index, ch)) = chars.peek() {
                        if !(ch.is_alphanumeric() || ch == '_') {
                            break;
                        }
                        end = index + ch.len_utf8();
                        chars.next();
                    }
                    segments.push(Segment::Text(std::mem::take(&mut literal)));
                    segments.push(Segment::Name(&text[start..end]));
                    continue;
                }
            }
        }
        literal.push(c);
    }

    if !literal.is_empty() || segments.is_empty() {
        segments.push(Segment::Text(literal));
    }
    segments
}

/// Opcodes implementing `op` on two operands of type `ty`.
fn binary_opcodes(op: BinaryOp, ty: Datatype) -> Option<&'static [OpCode]> {
    use BinaryOp as B;

    let comparison: Option<&'static [OpCode]> = match op {
        B::Lt => Some(&[OpCode::Lt]),
        B::Gt => Some(&[OpCode::Gt]),
        B::Le => Some(&[OpCode::Le]),
        B::Ge => Some(&[OpCode::Ge]),
        _ => None,
    };

    if ty == Datatype::INT {
        let ops: &'static [OpCode] = match op {
            B::Add => &[OpCode::IAdd],
            B::Sub => &[OpCode::ISub],
            B::Mul => &[OpCode::IMul],
            B::Div => &[OpCode::IDiv],
            B::Mod => &[OpCode::Mod],
            B::Shl => &[OpCode::BitL],
            B::Shr => &[OpCode::BitR],
            B::BitAnd => &[OpCode::BitAnd],
            B::BitOr => &[OpCode::BitOr],
            B::BitXor => &[OpCode::BitXor],
            B::Eq => &[OpCode::IEq],
            B::Ne => &[OpCode::INe],
            B::And | B::Or => return None,
            _ => return comparison,
        };
        Some(ops)
    } else if ty == Datatype::FLOAT {
        match op {
            B::Add => Some(&[OpCode::FAdd]),
            B::Sub => Some(&[OpCode::FSub]),
            B::Mul => Some(&[OpCode::FMul]),
            B::Div => Some(&[OpCode::FDiv]),
            B::Eq => Some(&[OpCode::FEq]),
            B::Ne => Some(&[OpCode::FNe]),
            _ => comparison,
        }
    } else if ty == Datatype::CHAR {
        match op {
            B::Eq => Some(&[OpCode::CEq]),
            B::Ne => Some(&[OpCode::CNe]),
            _ => comparison,
        }
    } else if ty == Datatype::BOOL {
        match op {
            B::Eq => Some(&[OpCode::BEq]),
            B::Ne => Some(&[OpCode::BNe]),
            B::And => Some(&[OpCode::BAnd]),
            B::Or => Some(&[OpCode::BOr]),
            _ => None,
        }
    } else if ty.is_sequence() {
        match op {
            B::Add => Some(&[OpCode::Append]),
            B::Eq => Some(&[OpCode::ArrEq]),
            B::Ne => Some(&[OpCode::ArrEq, OpCode::Not]),
            _ => None,
        }
    } else {
        None
    }
}

impl Compiler {
    // ========================================================================
    // Names
    // ========================================================================

    pub(super) fn eval_ident(&mut self, name: &str, location: Location) -> Typed {
        let Some((id, hops)) = self.scope.lookup_ext(name) else {
            bail!(self.error(
                location,
                SemanticErrorKind::ImplicitDeclaration {
                    name: name.to_string(),
                },
            ));
        };
        let symbol = self.scope.symbol(id);
        if !symbol.is_variable() {
            // Functions and classes carry no runtime value; consumers reject it.
            return Ok(Datatype::LAMBDA);
        }
        let (datatype, address, owner, class_param) =
            (symbol.datatype, symbol.address, symbol.owner, symbol.class_param);

        if owner.is_some() {
            if self.scope.current_class().is_some() {
                bail!(self.error(
                    location,
                    SemanticErrorKind::FieldAccessInConstructor {
                        name: name.to_string(),
                    },
                ));
            }
            self.emit_op(OpCode::LdArg0);
            self.emit_with(OpCode::GetField, Operand::Address(address));
            return Ok(datatype);
        }

        if class_param && hops != 0 {
            bail!(self.error(
                location,
                SemanticErrorKind::ConstructorParameterAccess {
                    name: name.to_string(),
                },
            ));
        }

        self.emit_load(id, hops);
        Ok(datatype)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    pub(super) fn eval_string(&mut self, text: &str, location: Location) -> Typed {
        let segments = split_interpolation(text);
        if let [Segment::Text(literal)] = segments.as_slice() {
            self.emit_push(Value::Str(literal.clone()));
            return Ok(Datatype::STRING);
        }

        let mut segments = segments.into_iter();
        if let Some(Segment::Text(base)) = segments.next() {
            self.emit_push(Value::Str(base));
        }
        for segment in segments {
            match segment {
                Segment::Text(literal) => {
                    self.emit_push(Value::Str(literal));
                    self.emit_op(OpCode::Append);
                }
                Segment::Name(name) => {
                    let ty = self.eval_ident(name, location)?;
                    if ty == Datatype::STRING {
                        self.emit_op(OpCode::Append);
                    } else if ty == Datatype::CHAR {
                        self.emit_op(OpCode::Cons);
                    } else if ty == Datatype::LAMBDA {
                        bail!(self.error(
                            location,
                            SemanticErrorKind::FunctionAsValue {
                                name: name.to_string(),
                            },
                        ));
                    } else {
                        self.emit_op(OpCode::ToStr);
                        self.emit_op(OpCode::Append);
                    }
                }
            }
        }
        Ok(Datatype::STRING)
    }

    pub(super) fn eval_array(&mut self, elements: &mut [Node], location: Location) -> Typed {
        let count = elements.len();
        let Some((first, rest)) = elements.split_first_mut() else {
            bail!(self.error(location, SemanticErrorKind::NullArray));
        };

        let ty = self.eval_operand(first)?;
        if ty == Datatype::NULL || ty == Datatype::VOID {
            bail!(self.error(location, SemanticErrorKind::NullArray));
        }
        if ty.is_array() {
            bail!(self.error(location, SemanticErrorKind::MultidimensionalArray));
        }

        for (index, element) in rest.iter_mut().enumerate() {
            let found = self.eval_operand(element)?;
            if found != ty {
                bail!(self.error(
                    element.location,
                    SemanticErrorKind::MixedArray { element: index + 2 },
                ));
            }
        }

        if ty == Datatype::CHAR {
            self.emit_with(OpCode::Str, Operand::count(count));
            Ok(Datatype::STRING)
        } else {
            self.emit_with(OpCode::Arr, Operand::count(count));
            Ok(ty.array())
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub(super) fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &mut Node,
        right: &mut Node,
        location: Location,
    ) -> Typed {
        let lhs = self.eval_operand(left)?;
        let rhs = self.eval_operand(right)?;

        let opcodes = if lhs == rhs { binary_opcodes(op, lhs) } else { None };
        let Some(opcodes) = opcodes else {
            bail!(self.error(
                location,
                SemanticErrorKind::OperandMismatch {
                    op: op.to_string(),
                    left: self.describe(lhs),
                    right: self.describe(rhs),
                },
            ));
        };

        for opcode in opcodes {
            self.emit_op(*opcode);
        }
        Ok(if op.yields_bool() { Datatype::BOOL } else { lhs })
    }

    pub(super) fn eval_unary(&mut self, op: UnaryOp, expr: &mut Node, location: Location) -> Typed {
        let ty = self.eval_operand(expr)?;
        let opcode = match (op, ty) {
            (UnaryOp::Plus, Datatype::INT | Datatype::FLOAT) => return Ok(ty),
            (UnaryOp::Neg, Datatype::INT) => OpCode::IMinus,
            (UnaryOp::Neg, Datatype::FLOAT) => OpCode::FMinus,
            (UnaryOp::BitNot, Datatype::INT) => OpCode::BitNot,
            (UnaryOp::Not, Datatype::BOOL) => OpCode::Not,
            _ => bail!(self.error(
                location,
                SemanticErrorKind::InvalidUnary {
                    op: op.to_string(),
                    ty: self.describe(ty),
                },
            )),
        };
        self.emit_op(opcode);
        Ok(ty)
    }

    // ========================================================================
    // Subscripts
    // ========================================================================

    pub(super) fn eval_subscript(&mut self, expr: &mut Node, key: &mut Node, location: Location) -> Typed {
        let ty = self.eval_operand(expr)?;
        if ty.is_instance() {
            bail!(self.error(location, SemanticErrorKind::ClassFieldAccess));
        }

        let key_ty = self.eval_operand(key)?;
        if key_ty != Datatype::INT {
            bail!(self.error(key.location, SemanticErrorKind::KeyNotInteger));
        }

        let Some(element) = ty.element() else {
            bail!(self.error(
                location,
                SemanticErrorKind::InvalidSubscript {
                    ty: self.describe(ty),
                },
            ));
        };

        if let NodeKind::Int { value: index } = key.kind {
            if let Some(size) = self.static_size(expr) {
                if index < 0 || index as usize >= size {
                    bail!(self.error(location, SemanticErrorKind::IndexOutOfBounds { index, size }));
                }
            }
        }

        self.emit_op(OpCode::GetSub);
        Ok(element)
    }

    /// Statically known length of an indexed expression.
    ///
    /// Known for immutable variables initialized from a sequence literal and
    /// for array literals themselves.
    fn static_size(&self, expr: &Node) -> Option<usize> {
        match &expr.kind {
            NodeKind::Ident { name } => {
                let symbol = self.scope.symbol(self.scope.lookup(name)?);
                if symbol.is_variable() && !symbol.is_mutable() {
                    symbol.array_size
                } else {
                    None
                }
            }
            NodeKind::Array { elements } => Some(elements.len()),
            _ => None,
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    pub(super) fn eval_assign(&mut self, target: &mut Node, value: &mut Node, location: Location) -> Typed {
        match &mut target.kind {
            NodeKind::Ident { name } => {
                let name = name.clone();
                self.assign_variable(&name, value, location)?;
            }
            NodeKind::Subscript { expr, key } => self.assign_subscript(expr, key, value, location)?,
            _ => bail!(self.error(location, SemanticErrorKind::UnknownAssignment)),
        }
        Ok(Datatype::NULL)
    }

    /// Resolves an assignment target, checking it is a mutable variable.
    fn assignable(
        &self,
        name: &str,
        location: Location,
        subscript: bool,
    ) -> Result<(SymbolId, usize), SemanticError> {
        let Some((id, hops)) = self.scope.lookup_ext(name) else {
            bail!(self.error(
                location,
                SemanticErrorKind::ImplicitDeclaration {
                    name: name.to_string(),
                },
            ));
        };
        let symbol = self.scope.symbol(id);
        let name = name.to_string();

        let kind = if !symbol.is_variable() {
            if subscript {
                SemanticErrorKind::SubscriptNotVariable { name }
            } else {
                SemanticErrorKind::NotAssignable { name }
            }
        } else if !symbol.is_mutable() {
            if subscript {
                SemanticErrorKind::ImmutableField { name }
            } else {
                SemanticErrorKind::ImmutableAssignment { name }
            }
        } else if symbol.owner.is_some() && self.scope.current_class().is_some() {
            SemanticErrorKind::FieldAccessInConstructor { name }
        } else if symbol.class_param && hops != 0 {
            SemanticErrorKind::ConstructorParameterAccess { name }
        } else {
            return Ok((id, hops));
        };
        bail!(self.error(location, kind))
    }

    fn assign_variable(
        &mut self,
        name: &str,
        value: &mut Node,
        location: Location,
    ) -> Result<(), SemanticError> {
        let (id, hops) = self.assignable(name, location, false)?;
        let (expected, address, owned) = {
            let symbol = self.scope.symbol(id);
            (symbol.datatype, symbol.address, symbol.owner.is_some())
        };

        if owned {
            self.emit_op(OpCode::LdArg0);
        }
        let found = self.eval_operand(value)?;
        if found != expected {
            bail!(self.error(
                value.location,
                SemanticErrorKind::TypeChange {
                    expected: self.describe(expected),
                    found: self.describe(found),
                },
            ));
        }

        if owned {
            self.emit_with(OpCode::SetField, Operand::Address(address));
            self.emit_op(OpCode::SetArg0);
        } else {
            self.emit_store(id, hops);
        }
        Ok(())
    }

    fn assign_subscript(
        &mut self,
        expr: &mut Node,
        key: &mut Node,
        value: &mut Node,
        location: Location,
    ) -> Result<(), SemanticError> {
        let NodeKind::Ident { name } = &expr.kind else {
            bail!(self.error(location, SemanticErrorKind::IndexTargetNotIdentifier));
        };
        let name = name.clone();
        let (id, hops) = self.assignable(&name, location, true)?;
        let (address, owned) = {
            let symbol = self.scope.symbol(id);
            (symbol.address, symbol.owner.is_some())
        };

        if owned {
            self.emit_op(OpCode::LdArg0);
        }
        let found = self.eval_operand(value)?;
        let sequence = self.eval_operand(expr)?;
        let Some(element) = sequence.element() else {
            bail!(self.error(
                location,
                SemanticErrorKind::InvalidSubscript {
                    ty: self.describe(sequence),
                },
            ));
        };
        if found != element {
            bail!(self.error(
                value.location,
                SemanticErrorKind::AssignmentValueMismatch {
                    expected: self.describe(element),
                    found: self.describe(found),
                },
            ));
        }
        let key_ty = self.eval_operand(key)?;
        if key_ty != Datatype::INT {
            bail!(self.error(key.location, SemanticErrorKind::KeyNotInteger));
        }

        self.emit_op(OpCode::SetSub);
        if owned {
            self.emit_with(OpCode::SetField, Operand::Address(address));
            self.emit_op(OpCode::SetArg0);
        } else {
            self.emit_store(id, hops);
        }
        Ok(())
    }
}
