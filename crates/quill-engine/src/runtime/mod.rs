// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime data structures shared by the compiler and the VM.

pub mod frame;
pub mod value;

pub use frame::CallFrame;
pub use value::{Instance, Value};
