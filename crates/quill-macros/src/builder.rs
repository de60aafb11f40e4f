// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration struct macros.

/// Define an option struct with defaults and chained setters.
///
/// Each field gets a `Default` value and a by-value setter of the same name.
///
/// # Example
///
/// ```
/// use quill_macros::config_struct;
///
/// config_struct! {
///     /// Limits for a machine.
///     pub struct Limits {
///         /// Maximum operand stack depth.
///         max_stack: usize = 256,
///         trace: bool = false,
///     }
/// }
///
/// let limits = Limits::default().max_stack(16);
/// assert_eq!(limits.max_stack, 16);
/// assert!(!limits.trace);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $field:ident : $type:ty = $default:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $($(#[$fmeta])* pub $field: $type,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)+
                }
            }
        }

        #[allow(dead_code)]
        impl $name {
            $(
                #[doc = concat!("Sets `", stringify!($field), "`.")]
                pub fn $field(mut self, value: $type) -> Self {
                    self.$field = value;
                    self
                }
            )+
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_config_struct_defaults() {
        config_struct! {
            struct Options {
                name: String = String::from("<script>"),
                prelude: bool = true,
            }
        }

        let options = Options::default();
        assert_eq!(options.name, "<script>");
        assert!(options.prelude);

        let options = options.prelude(false).name("main.ql".to_string());
        assert!(!options.prelude);
        assert_eq!(options.name, "main.ql");
    }
}
