// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessor methods generated for annotated class fields.
//!
//! `@Getter let x = 0` adds `getX() -> int { return x }` and `@Setter`
//! on a mutable field adds `setX(p0: int) -> void { x = p0 }`. The
//! generated methods are lowered like hand-written ones.

use crate::ast::build;
use crate::ast::*;
use crate::error::SemanticErrorKind;

/// Builds the accessors requested by `flags` for a declared field.
pub(super) fn accessors(
    field: &VarDecl,
    datatype: Datatype,
    flags: Annotation,
    location: Location,
) -> Result<Vec<FuncDecl>, SemanticErrorKind> {
    let mut methods = Vec::new();
    let suffix = capitalize(&field.name);

    if flags.contains(Annotation::GETTER) {
        methods.push(FuncDecl {
            name: format!("get{suffix}"),
            params: Vec::new(),
            returns: datatype,
            body: vec![located(build::return_value(located(build::ident(&field.name), location)), location)],
            external: None,
        });
    }

    if flags.contains(Annotation::SETTER) {
        if !field.mutable {
            return Err(SemanticErrorKind::SetterOnImmutable {
                name: field.name.clone(),
            });
        }
        let mut param = build::param("p0", datatype);
        param.location = location;
        let assign = build::assign(
            located(build::ident(&field.name), location),
            located(build::ident("p0"), location),
        );
        methods.push(FuncDecl {
            name: format!("set{suffix}"),
            params: vec![param],
            returns: Datatype::VOID,
            body: vec![located(assign, location)],
            external: None,
        });
    }

    Ok(methods)
}

fn located(mut node: Node, location: Location) -> Node {
    node.location = location;
    node
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
