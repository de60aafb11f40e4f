// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syntax tree macros.

/// Define an AST node enum whose variants can report their own name.
///
/// # Example
///
/// ```
/// use quill_macros::ast_node;
///
/// ast_node! {
///     #[derive(Debug, Clone)]
///     pub enum Expr {
///         Int { value: i64 },
///         Ident { name: String },
///         Neg { expr: Box<Expr> },
///     }
/// }
///
/// let e = Expr::Neg { expr: Box::new(Expr::Int { value: 1 }) };
/// assert_eq!(e.kind(), "Neg");
/// ```
///
/// Every variant field gets a generated doc line ahead of its own
/// attributes, so public node enums pass `missing_docs`:
///
/// ```
/// #![deny(missing_docs)]
/// #![doc = "Node definitions."]
/// use quill_macros::ast_node;
///
/// ast_node! {
///     /// A tiny expression tree.
///     pub enum Expr {
///         /// Literal
///         Int { value: i64 },
///         /// Negation
///         Neg {
///             /// Operand
///             expr: Box<Expr>,
///         },
///     }
/// }
///
/// fn main() {
///     assert_eq!(Expr::Int { value: 2 }.kind(), "Int");
/// }
/// ```
#[macro_export]
macro_rules! ast_node {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant {
                    $(
                        #[doc = concat!("`", stringify!($field), "` of a `", stringify!($variant), "` node")]
                        $(#[$fmeta])*
                        $field: $ty
                    ),*
                }
            ),+
        }

        impl $name {
            /// The name of this node kind.
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant),)+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_ast_node_kind() {
        ast_node! {
            #[derive(Debug)]
            enum Stmt {
                While { cond: bool, body: Vec<Stmt> },
                Return { value: Option<i64> },
            }
        }

        let stmt = Stmt::While { cond: true, body: vec![Stmt::Return { value: None }] };
        assert_eq!(stmt.kind(), "While");
        if let Stmt::While { body, .. } = &stmt {
            assert_eq!(body[0].kind(), "Return");
        }
    }
}
