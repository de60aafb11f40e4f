// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assertions used by the engine's unit and integration tests.

/// Fails unless `$value` matches the pattern (and the optional guard).
///
/// The value is matched in place, so `ref` bindings leave it usable.
///
/// ```
/// use quill_macros::assert_matches;
///
/// #[derive(Debug)]
/// enum Slot { Int(i64), Null }
///
/// let slot = Slot::Int(42);
/// assert_matches!(slot, Slot::Int(n) if n > 0);
/// assert_matches!(Slot::Null, Slot::Null);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($value:expr, $pat:pat $(if $guard:expr)? $(,)?) => {
        match $value {
            $pat $(if $guard)? => {}
            ref other => panic!(
                "{} = {:?} does not match {}",
                stringify!($value),
                other,
                stringify!($pat $(if $guard)?)
            ),
        }
    };
}

/// Unwraps an `Ok`, panicking with the error's `Debug` form otherwise.
///
/// An optional trailing message names what was being attempted.
///
/// ```
/// use quill_macros::assert_ok;
///
/// let value = assert_ok!("42".parse::<i64>(), "parsing an int");
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($result:expr $(,)?) => {
        $crate::assert_ok!($result, stringify!($result))
    };
    ($result:expr, $context:expr $(,)?) => {
        match $result {
            Ok(value) => value,
            Err(err) => panic!("{}: expected success, got {:?}", $context, err),
        }
    };
}

/// Unwraps an `Err`, panicking with the value's `Debug` form otherwise.
///
/// ```
/// use quill_macros::assert_err;
///
/// let err = assert_err!("x".parse::<i64>());
/// assert!(!err.to_string().is_empty());
/// ```
#[macro_export]
macro_rules! assert_err {
    ($result:expr $(,)?) => {
        $crate::assert_err!($result, stringify!($result))
    };
    ($result:expr, $context:expr $(,)?) => {
        match $result {
            Err(err) => err,
            Ok(value) => panic!("{}: expected failure, got {:?}", $context, value),
        }
    };
}

/// Fails unless the displayed text contains `$needle`.
///
/// ```
/// use quill_macros::assert_contains;
///
/// let message = "main.ql:1:5 (Semantic): Too few arguments";
/// assert_contains!(message, "(Semantic)");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($text:expr, $needle:expr $(,)?) => {{
        let text = $text.to_string();
        let needle: &str = $needle;
        assert!(text.contains(needle), "{:?} does not contain {:?}", text, needle);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_ok_and_err() {
        let parsed: Result<i64, String> = Ok(7);
        assert_eq!(assert_ok!(parsed), 7);

        let failed: Result<i64, String> = Err("boom".to_string());
        assert_eq!(assert_err!(failed, "division"), "boom");
    }

    #[test]
    fn test_assert_matches_guard() {
        let value = Some(3);
        assert_matches!(value, Some(n) if n == 3);
        assert_matches!(None::<i64>, None);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_assert_matches_failure() {
        assert_matches!(Some(1), Some(n) if n > 1);
    }

    #[test]
    fn test_assert_contains() {
        let text = String::from("Redefinition of symbol 'x'");
        assert_contains!(text, "symbol 'x'");
    }
}
