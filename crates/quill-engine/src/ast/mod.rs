// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract syntax tree consumed by the compiler.
//!
//! The tree is produced by an external front end. Every node carries the
//! source [`Location`] it was parsed from; diagnostics point there.
//! Dropping a tree releases nodes iteratively, so deeply nested input
//! cannot exhaust the native stack during teardown.

pub mod build;
pub mod datatype;

use std::fmt;

use quill_macros::{ast_node, bitflags};

pub use datatype::{ClassId, ClassRegistry, Datatype, Kind, TypeFlags};

/// A complete program: top-level statements plus the classes they name.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// The top-level statements
    pub body: Vec<Node>,
    /// Class names interned by the front end
    pub classes: ClassRegistry,
}

impl Program {
    /// Creates a program from its statements.
    pub fn new(body: Vec<Node>) -> Self {
        Self {
            body,
            classes: ClassRegistry::new(),
        }
    }

    /// Creates a program whose class types were interned into `classes`.
    pub fn with_classes(body: Vec<Node>, classes: ClassRegistry) -> Self {
        Self { body, classes }
    }
}

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl Location {
    /// Creates a location.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// <<
    Shl,
    /// >>
    Shr,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// &&
    And,
    /// ||
    Or,
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Le,
    /// >=
    Ge,
}

impl BinaryOp {
    /// The operator as written in source.
    pub const fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }

    /// Returns true if the operator always produces a bool.
    pub const fn yields_bool(&self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// +
    Plus,
    /// -
    Neg,
    /// ~
    BitNot,
    /// !
    Not,
}

impl UnaryOp {
    /// The operator as written in source.
    pub const fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

bitflags! {
    /// Annotations that adjust how the next declaration is compiled.
    pub struct Annotation: u8 {
        /// Generate a getter for the next class field
        GETTER = 1 << 1,
        /// Generate a setter for the next class field
        SETTER = 1 << 2,
        /// Skip the next variable declaration
        UNUSED = 1 << 3,
    }
}

impl Annotation {
    /// The annotation as written in source.
    pub fn name(&self) -> &'static str {
        if *self == Annotation::GETTER {
            "@Getter"
        } else if *self == Annotation::SETTER {
            "@Setter"
        } else if *self == Annotation::UNUSED {
            "@Unused"
        } else {
            "@<combined>"
        }
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub datatype: Datatype,
    /// Whether the body may assign to it
    pub mutable: bool,
    /// Where the parameter was declared
    pub location: Location,
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// `let mut` instead of `let`
    pub mutable: bool,
    /// Initializer; the variable takes its type
    pub init: Box<Node>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    /// Function name
    pub name: String,
    /// Formal parameters
    pub params: Vec<Param>,
    /// Declared return type
    pub returns: Datatype,
    /// Body statements
    pub body: Vec<Node>,
    /// Intrinsic index for host-provided functions without a body
    pub external: Option<u32>,
}

/// A class declaration. Its body doubles as the constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Constructor parameters
    pub params: Vec<Param>,
    /// Fields, methods and annotations
    pub body: Vec<Node>,
}

/// One branch of an if chain. `cond` is absent for a trailing else.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    /// Branch condition
    pub cond: Option<Node>,
    /// Branch body
    pub body: Vec<Node>,
}

ast_node! {
    /// The payload of a syntax tree node.
    #[derive(Debug, Clone, PartialEq)]
    pub enum NodeKind {
        /// Identifier reference
        Ident { name: String },
        /// Integer literal
        Int { value: i64 },
        /// Float literal
        Float { value: f64 },
        /// Boolean literal
        Bool { value: bool },
        /// String literal, possibly with `$name` interpolation
        Str { value: String },
        /// Character literal
        Char { value: char },
        /// Array literal
        Array { elements: Vec<Node> },
        /// Binary operation
        Binary { op: BinaryOp, left: Box<Node>, right: Box<Node> },
        /// Assignment to a variable or subscript
        Assign { target: Box<Node>, value: Box<Node> },
        /// Unary operation
        Unary { op: UnaryOp, expr: Box<Node> },
        /// Index access `expr[key]`
        Subscript { expr: Box<Node>, key: Box<Node> },
        /// Member access `expr.name`; only valid as a callee
        Member { expr: Box<Node>, name: String },
        /// Call of a function, constructor or method
        Call { callee: Box<Node>, args: Vec<Node> },
        /// Variable declaration
        Let { decl: VarDecl },
        /// Function declaration
        Function { decl: FuncDecl },
        /// Class declaration
        Class { decl: ClassDecl },
        /// If / else-if / else chain
        If { clauses: Vec<IfClause> },
        /// While loop
        While { cond: Box<Node>, body: Vec<Node> },
        /// Return from the enclosing function
        Return { value: Option<Box<Node>> },
        /// Nested statement block
        Block { body: Vec<Node> },
        /// Annotation applying to the next declaration
        Annotation { flag: Annotation },
    }
}

impl NodeKind {
    /// Returns true for literal nodes.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::Int { .. }
                | NodeKind::Float { .. }
                | NodeKind::Bool { .. }
                | NodeKind::Str { .. }
                | NodeKind::Char { .. }
        )
    }

    /// Moves every child node into `out`, leaving childless placeholders.
    fn drain_children(&mut self, out: &mut Vec<Node>) {
        fn take(node: &mut Node) -> Node {
            std::mem::replace(node, Node::placeholder())
        }

        match self {
            NodeKind::Ident { .. }
            | NodeKind::Int { .. }
            | NodeKind::Float { .. }
            | NodeKind::Bool { .. }
            | NodeKind::Str { .. }
            | NodeKind::Char { .. }
            | NodeKind::Annotation { .. } => {}
            NodeKind::Array { elements } => out.append(elements),
            NodeKind::Binary { left, right, .. } => {
                out.push(take(left));
                out.push(take(right));
            }
            NodeKind::Assign { target, value } => {
                out.push(take(target));
                out.push(take(value));
            }
            NodeKind::Unary { expr, .. } | NodeKind::Member { expr, .. } => out.push(take(expr)),
            NodeKind::Subscript { expr, key } => {
                out.push(take(expr));
                out.push(take(key));
            }
            NodeKind::Call { callee, args } => {
                out.push(take(callee));
                out.append(args);
            }
            NodeKind::Let { decl } => out.push(take(&mut decl.init)),
            NodeKind::Function { decl } => out.append(&mut decl.body),
            NodeKind::Class { decl } => out.append(&mut decl.body),
            NodeKind::If { clauses } => {
                for clause in clauses.iter_mut() {
                    if let Some(cond) = clause.cond.take() {
                        out.push(cond);
                    }
                    out.append(&mut clause.body);
                }
            }
            NodeKind::While { cond, body } => {
                out.push(take(cond));
                out.append(body);
            }
            NodeKind::Return { value } => {
                if let Some(value) = value.as_mut() {
                    out.push(take(value));
                }
            }
            NodeKind::Block { body } => out.append(body),
        }
    }
}

/// A syntax tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What the node is
    pub kind: NodeKind,
    /// Where it was parsed from
    pub location: Location,
}

impl Node {
    /// Creates a node.
    pub fn new(kind: NodeKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Returns the node moved to `line:column`.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Location::new(line, column);
        self
    }

    /// The name of this node's kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind.kind()
    }

    fn placeholder() -> Self {
        Self {
            kind: NodeKind::Int { value: 0 },
            location: Location::default(),
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.kind.drain_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            // `node` drops childless at the end of this iteration.
            node.kind.drain_children(&mut pending);
        }
    }
}
