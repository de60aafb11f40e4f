// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host intrinsics.
//!
//! Intrinsics are declared to programs as external functions with a fixed
//! index and invoked with `Syscall index - 1, argc`. Every intrinsic pushes
//! exactly one result; void intrinsics push null.

pub mod console;

use std::io::{BufRead, Write};

use crate::ast::{Datatype, Node, build};
use crate::error::Fault;
use crate::runtime::value::Value;

/// `print(value)`
pub const PRINT: u32 = 1;
/// `println(value)`
pub const PRINTLN: u32 = 2;
/// `getline() -> string`
pub const GETLINE: u32 = 3;
/// `parseFloat(text) -> float`
pub const PARSE_FLOAT: u32 = 4;
/// `break()`
pub const BREAK: u32 = 5;

/// Signature of a host intrinsic.
#[derive(Debug, Clone, Copy)]
pub struct Intrinsic {
    /// Name visible to programs
    pub name: &'static str,
    /// Parameter types
    pub params: &'static [Datatype],
    /// Return type
    pub returns: Datatype,
    /// Declared index
    pub index: u32,
}

/// The core intrinsics registered by the prelude.
pub const INTRINSICS: &[Intrinsic] = &[
    Intrinsic {
        name: "print",
        params: &[Datatype::ANY],
        returns: Datatype::VOID,
        index: PRINT,
    },
    Intrinsic {
        name: "println",
        params: &[Datatype::ANY],
        returns: Datatype::VOID,
        index: PRINTLN,
    },
    Intrinsic {
        name: "getline",
        params: &[],
        returns: Datatype::STRING,
        index: GETLINE,
    },
    Intrinsic {
        name: "parseFloat",
        params: &[Datatype::STRING],
        returns: Datatype::FLOAT,
        index: PARSE_FLOAT,
    },
    Intrinsic {
        name: "break",
        params: &[],
        returns: Datatype::VOID,
        index: BREAK,
    },
];

/// External declarations for every core intrinsic.
pub fn prelude() -> Vec<Node> {
    INTRINSICS
        .iter()
        .map(|intrinsic| {
            let params = intrinsic
                .params
                .iter()
                .enumerate()
                .map(|(i, ty)| build::param(&format!("p{i}"), *ty))
                .collect();
            build::external(intrinsic.name, params, intrinsic.returns, intrinsic.index)
        })
        .collect()
}

/// Runs the intrinsic behind syscall operand `call` (declared index - 1).
pub fn dispatch(
    call: i64,
    args: &[Value],
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<Value, Fault> {
    let index = u32::try_from(call + 1).map_err(|_| Fault::UnknownIntrinsic(call))?;
    match index {
        PRINT => console::print(args, output, false),
        PRINTLN => console::print(args, output, true),
        GETLINE => console::getline(input, output),
        PARSE_FLOAT => parse_float(args),
        BREAK => {
            console::getline(input, output)?;
            Ok(Value::Null)
        }
        _ => Err(Fault::UnknownIntrinsic(call)),
    }
}

fn parse_float(args: &[Value]) -> Result<Value, Fault> {
    let text = args
        .first()
        .and_then(Value::as_str)
        .ok_or(Fault::TypeMismatch {
            op: "parseFloat",
            expected: "string",
            found: args.first().map_or("nothing", Value::type_name),
        })?;
    Ok(Value::Float(text.trim().parse().unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn run(call: i64, args: &[Value], input: &str) -> (Result<Value, Fault>, String) {
        let mut input = input.as_bytes();
        let mut output = Vec::new();
        let result = dispatch(call, args, &mut input, &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_prelude_declares_every_intrinsic() {
        let prelude = prelude();
        assert_eq!(prelude.len(), INTRINSICS.len());
        match &prelude[0].kind {
            NodeKind::Function { decl } => {
                assert_eq!(decl.name, "print");
                assert_eq!(decl.external, Some(PRINT));
                assert_eq!(decl.params[0].datatype, Datatype::ANY);
            }
            other => panic!("unexpected node {}", other.kind()),
        }
    }

    #[test]
    fn test_print_and_println() {
        let (result, out) = run(PRINT as i64 - 1, &[Value::Int(4)], "");
        assert_eq!(result, Ok(Value::Null));
        assert_eq!(out, "4");

        let (_, out) = run(PRINTLN as i64 - 1, &[Value::from("hi")], "");
        assert_eq!(out, "hi\n");
    }

    #[test]
    fn test_getline_strips_terminator() {
        let (result, _) = run(GETLINE as i64 - 1, &[], "first line\r\nsecond\n");
        assert_eq!(result, Ok(Value::from("first line")));
    }

    #[test]
    fn test_parse_float() {
        let (result, _) = run(PARSE_FLOAT as i64 - 1, &[Value::from(" 2.5 ")], "");
        assert_eq!(result, Ok(Value::Float(2.5)));
        let (result, _) = run(PARSE_FLOAT as i64 - 1, &[Value::from("nope")], "");
        assert_eq!(result, Ok(Value::Float(0.0)));
    }

    #[test]
    fn test_unknown_intrinsic() {
        let (result, _) = run(41, &[], "");
        assert_eq!(result, Err(Fault::UnknownIntrinsic(41)));
        let (result, _) = run(-5, &[], "");
        assert_eq!(result, Err(Fault::UnknownIntrinsic(-5)));
    }
}
