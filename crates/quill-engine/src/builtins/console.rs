// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Console intrinsics.

use std::io::{BufRead, Write};

use crate::error::Fault;
use crate::runtime::value::Value;

fn io(err: std::io::Error) -> Fault {
    Fault::Io(err.to_string())
}

/// Writes the arguments, space separated.
pub fn print(args: &[Value], output: &mut dyn Write, newline: bool) -> Result<Value, Fault> {
    let text: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    write!(output, "{}", text.join(" ")).map_err(io)?;
    if newline {
        writeln!(output).map_err(io)?;
    }
    Ok(Value::Null)
}

/// Reads one line without its terminator.
///
/// Pending output is flushed first so prompts appear before the read.
pub fn getline(input: &mut dyn BufRead, output: &mut dyn Write) -> Result<Value, Fault> {
    output.flush().map_err(io)?;
    let mut line = String::new();
    input.read_line(&mut line).map_err(io)?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Value::Str(line))
}
