// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constant folding of literal arithmetic.

use tracing::trace;

use crate::ast::{BinaryOp, Location, Node, NodeKind};
use crate::error::SemanticErrorKind;

/// Folds literal sub-expressions of `node` bottom-up.
///
/// Returns true if `node` itself was rewritten into a literal.
pub(super) fn fold_constants(node: &mut Node) -> Result<bool, (Location, SemanticErrorKind)> {
    let NodeKind::Binary { op, left, right } = &mut node.kind else {
        return Ok(false);
    };
    let op = *op;
    fold_constants(left)?;
    fold_constants(right)?;

    let folded = match (&left.kind, &right.kind) {
        (NodeKind::Int { value: a }, NodeKind::Int { value: b }) => fold_int(op, *a, *b),
        (NodeKind::Float { value: a }, NodeKind::Float { value: b }) => fold_float(op, *a, *b),
        _ => return Ok(false),
    };

    let location = node.location;
    let kind = folded.map_err(|kind| (location, kind))?;
    trace!(%op, %location, "folded constant expression");
    node.kind = kind;
    Ok(true)
}

fn fold_int(op: BinaryOp, a: i64, b: i64) -> Result<NodeKind, SemanticErrorKind> {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => {
            return Err(SemanticErrorKind::ConstantDivisionByZero);
        }
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Mod => a.wrapping_rem(b),
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a.wrapping_shr(b as u32),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Eq => return Ok(NodeKind::Bool { value: a == b }),
        BinaryOp::Ne => return Ok(NodeKind::Bool { value: a != b }),
        BinaryOp::Lt => return Ok(NodeKind::Bool { value: a < b }),
        BinaryOp::Gt => return Ok(NodeKind::Bool { value: a > b }),
        BinaryOp::Le => return Ok(NodeKind::Bool { value: a <= b }),
        BinaryOp::Ge => return Ok(NodeKind::Bool { value: a >= b }),
        BinaryOp::And | BinaryOp::Or => {
            return Err(SemanticErrorKind::InvalidIntOperator { op: op.to_string() });
        }
    };
    Ok(NodeKind::Int { value })
}

fn fold_float(op: BinaryOp, a: f64, b: f64) -> Result<NodeKind, SemanticErrorKind> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Eq => return Ok(NodeKind::Bool { value: a == b }),
        BinaryOp::Ne => return Ok(NodeKind::Bool { value: a != b }),
        BinaryOp::Lt => return Ok(NodeKind::Bool { value: a < b }),
        BinaryOp::Gt => return Ok(NodeKind::Bool { value: a > b }),
        BinaryOp::Le => return Ok(NodeKind::Bool { value: a <= b }),
        BinaryOp::Ge => return Ok(NodeKind::Bool { value: a >= b }),
        _ => return Err(SemanticErrorKind::InvalidFloatOperator { op: op.to_string() }),
    };
    Ok(NodeKind::Float { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    #[test]
    fn test_fold_nested_ints() {
        let mut node = binary(
            BinaryOp::Mul,
            binary(BinaryOp::Add, int(1), int(2)),
            binary(BinaryOp::Shl, int(1), int(3)),
        );
        assert_eq!(fold_constants(&mut node), Ok(true));
        assert_eq!(node.kind, NodeKind::Int { value: 24 });
    }

    #[test]
    fn test_fold_partial() {
        let mut node = binary(BinaryOp::Add, ident("x"), binary(BinaryOp::Sub, int(5), int(2)));
        assert_eq!(fold_constants(&mut node), Ok(false));
        let NodeKind::Binary { right, .. } = &node.kind else {
            panic!("expected binary");
        };
        assert_eq!(right.kind, NodeKind::Int { value: 3 });
    }

    #[test]
    fn test_fold_bitand_is_bitwise() {
        let mut node = binary(BinaryOp::BitAnd, int(6), int(3));
        fold_constants(&mut node).unwrap();
        assert_eq!(node.kind, NodeKind::Int { value: 2 });
    }

    #[test]
    fn test_fold_division_by_zero() {
        let mut node = binary(BinaryOp::Div, int(1), int(0)).at(2, 4);
        let (location, kind) = fold_constants(&mut node).unwrap_err();
        assert_eq!(location, Location::new(2, 4));
        assert_eq!(kind, SemanticErrorKind::ConstantDivisionByZero);
    }

    #[test]
    fn test_fold_overflow_wraps() {
        let mut node = binary(BinaryOp::Add, int(i64::MAX), int(1));
        fold_constants(&mut node).unwrap();
        assert_eq!(node.kind, NodeKind::Int { value: i64::MIN });
    }

    #[test]
    fn test_fold_floats() {
        let mut node = binary(BinaryOp::Div, float(1.0), float(4.0));
        fold_constants(&mut node).unwrap();
        assert_eq!(node.kind, NodeKind::Float { value: 0.25 });

        let mut node = binary(BinaryOp::Lt, float(1.0), float(4.0));
        fold_constants(&mut node).unwrap();
        assert_eq!(node.kind, NodeKind::Bool { value: true });
    }

    #[test]
    fn test_fold_invalid_operators() {
        let mut node = binary(BinaryOp::And, int(1), int(0));
        let (_, kind) = fold_constants(&mut node).unwrap_err();
        assert!(matches!(kind, SemanticErrorKind::InvalidIntOperator { .. }));

        let mut node = binary(BinaryOp::Mod, float(1.0), float(2.0));
        let (_, kind) = fold_constants(&mut node).unwrap_err();
        assert!(matches!(kind, SemanticErrorKind::InvalidFloatOperator { .. }));
    }

    #[test]
    fn test_fold_is_idempotent() {
        let mut node = binary(BinaryOp::Add, int(2), int(3));
        fold_constants(&mut node).unwrap();
        let once = node.clone();
        assert_eq!(fold_constants(&mut node), Ok(false));
        assert_eq!(node, once);
    }
}
