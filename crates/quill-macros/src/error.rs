// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Early-return helpers for typed errors.
//!
//! Both macros convert their error argument with `Into`, so any error type
//! with a matching `From` impl can be returned from the enclosing function.

/// Returns `Err($err.into())` from the enclosing function.
///
/// # Example
///
/// ```
/// use quill_macros::bail;
///
/// #[derive(Debug)]
/// struct Negative(i64);
///
/// fn check(x: i64) -> Result<i64, Negative> {
///     if x < 0 {
///         bail!(Negative(x));
///     }
///     Ok(x)
/// }
///
/// assert!(check(-1).is_err());
/// assert_eq!(check(3).unwrap(), 3);
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr $(,)?) => {
        return Err($err.into())
    };
}

/// Returns `Err($err.into())` unless `$cond` holds.
///
/// # Example
///
/// ```
/// use quill_macros::ensure;
///
/// fn index(len: usize, at: usize) -> Result<usize, String> {
///     ensure!(at < len, format!("index {} out of bounds", at));
///     Ok(at)
/// }
///
/// assert!(index(2, 5).is_err());
/// assert_eq!(index(2, 1).unwrap(), 1);
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}
