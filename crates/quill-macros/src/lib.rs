// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declarative macros shared by the Quill compiler and virtual machine.
//!
//! # Macros Overview
//!
//! ## Types
//! - [`bitflags!`] - Composable flag newtypes (datatype and annotation flags)
//! - [`opcodes!`] - Opcode catalogs convertible to/from their byte encoding
//! - [`ast_node!`] - Syntax tree enums that can name their own variants
//!
//! ## Configuration
//! - [`config_struct!`] - Option structs with defaults and chained setters
//!
//! ## Error Handling
//! - [`bail!`] - Early return with a typed error
//! - [`ensure!`] - Check a condition, returning a typed error when it fails
//!
//! ## Testing
//! - [`assert_matches!`], [`assert_ok!`], [`assert_err!`], [`assert_contains!`]
//!
//! # Examples
//!
//! ```
//! use quill_macros::*;
//!
//! #[derive(Debug, PartialEq)]
//! enum Fault { DivisionByZero }
//!
//! fn divide(a: i64, b: i64) -> Result<i64, Fault> {
//!     ensure!(b != 0, Fault::DivisionByZero);
//!     Ok(a / b)
//! }
//!
//! assert_eq!(divide(10, 2), Ok(5));
//! assert_eq!(divide(1, 0), Err(Fault::DivisionByZero));
//! ```

#![warn(missing_docs)]

mod builder;
mod error;
mod syntax;
mod testing;
mod types;
