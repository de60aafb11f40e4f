// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constructors for syntax tree nodes.
//!
//! Front ends and the compiler's own desugaring step build trees through
//! these helpers. Nodes start at the default location; chain
//! [`Node::at`] to position them.

use super::{
    Annotation, BinaryOp, ClassDecl, Datatype, FuncDecl, IfClause, Location, Node, NodeKind,
    Param, UnaryOp, VarDecl,
};

fn node(kind: NodeKind) -> Node {
    Node::new(kind, Location::default())
}

/// Integer literal.
pub fn int(value: i64) -> Node {
    node(NodeKind::Int { value })
}

/// Float literal.
pub fn float(value: f64) -> Node {
    node(NodeKind::Float { value })
}

/// Boolean literal.
pub fn boolean(value: bool) -> Node {
    node(NodeKind::Bool { value })
}

/// String literal.
pub fn string(value: &str) -> Node {
    node(NodeKind::Str {
        value: value.to_string(),
    })
}

/// Character literal.
pub fn character(value: char) -> Node {
    node(NodeKind::Char { value })
}

/// Identifier reference.
pub fn ident(name: &str) -> Node {
    node(NodeKind::Ident {
        name: name.to_string(),
    })
}

/// Array literal.
pub fn array(elements: Vec<Node>) -> Node {
    node(NodeKind::Array { elements })
}

/// Binary operation.
pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    node(NodeKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Unary operation.
pub fn unary(op: UnaryOp, expr: Node) -> Node {
    node(NodeKind::Unary {
        op,
        expr: Box::new(expr),
    })
}

/// Assignment `target = value`.
pub fn assign(target: Node, value: Node) -> Node {
    node(NodeKind::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

/// Index access `expr[key]`.
pub fn subscript(expr: Node, key: Node) -> Node {
    node(NodeKind::Subscript {
        expr: Box::new(expr),
        key: Box::new(key),
    })
}

/// Call of a named function or constructor.
pub fn call(name: &str, args: Vec<Node>) -> Node {
    node(NodeKind::Call {
        callee: Box::new(ident(name)),
        args,
    })
}

/// Method call `receiver.name(args)`.
pub fn method(receiver: Node, name: &str, args: Vec<Node>) -> Node {
    let callee = node(NodeKind::Member {
        expr: Box::new(receiver),
        name: name.to_string(),
    });
    node(NodeKind::Call {
        callee: Box::new(callee),
        args,
    })
}

/// Immutable variable declaration.
pub fn let_decl(name: &str, init: Node) -> Node {
    node(NodeKind::Let {
        decl: VarDecl {
            name: name.to_string(),
            mutable: false,
            init: Box::new(init),
        },
    })
}

/// Mutable variable declaration.
pub fn var_decl(name: &str, init: Node) -> Node {
    node(NodeKind::Let {
        decl: VarDecl {
            name: name.to_string(),
            mutable: true,
            init: Box::new(init),
        },
    })
}

/// Immutable parameter.
pub fn param(name: &str, datatype: Datatype) -> Param {
    Param {
        name: name.to_string(),
        datatype,
        mutable: false,
        location: Location::default(),
    }
}

/// Mutable parameter.
pub fn param_mut(name: &str, datatype: Datatype) -> Param {
    Param {
        mutable: true,
        ..param(name, datatype)
    }
}

/// Function with a body.
pub fn func(name: &str, params: Vec<Param>, returns: Datatype, body: Vec<Node>) -> Node {
    node(NodeKind::Function {
        decl: FuncDecl {
            name: name.to_string(),
            params,
            returns,
            body,
            external: None,
        },
    })
}

/// Host-provided function bound to intrinsic `index`.
pub fn external(name: &str, params: Vec<Param>, returns: Datatype, index: u32) -> Node {
    node(NodeKind::Function {
        decl: FuncDecl {
            name: name.to_string(),
            params,
            returns,
            body: Vec::new(),
            external: Some(index),
        },
    })
}

/// Class declaration.
pub fn class(name: &str, params: Vec<Param>, body: Vec<Node>) -> Node {
    node(NodeKind::Class {
        decl: ClassDecl {
            name: name.to_string(),
            params,
            body,
        },
    })
}

/// Conditional branch of an if chain.
pub fn clause(cond: Node, body: Vec<Node>) -> IfClause {
    IfClause {
        cond: Some(cond),
        body,
    }
}

/// Trailing else branch.
pub fn otherwise(body: Vec<Node>) -> IfClause {
    IfClause { cond: None, body }
}

/// If chain.
pub fn if_chain(clauses: Vec<IfClause>) -> Node {
    node(NodeKind::If { clauses })
}

/// While loop.
pub fn while_loop(cond: Node, body: Vec<Node>) -> Node {
    node(NodeKind::While {
        cond: Box::new(cond),
        body,
    })
}

/// `return value`.
pub fn return_value(value: Node) -> Node {
    node(NodeKind::Return {
        value: Some(Box::new(value)),
    })
}

/// Bare `return`.
pub fn return_void() -> Node {
    node(NodeKind::Return { value: None })
}

/// Nested block.
pub fn block(body: Vec<Node>) -> Node {
    node(NodeKind::Block { body })
}

/// Annotation.
pub fn annotation(flag: Annotation) -> Node {
    node(NodeKind::Annotation { flag })
}
