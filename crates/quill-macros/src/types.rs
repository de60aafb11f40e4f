// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type definition macros.

/// Define a bitflags-style newtype.
///
/// # Example
///
/// ```
/// use quill_macros::bitflags;
///
/// bitflags! {
///     /// Flags carried by a datatype.
///     pub struct Shape: u8 {
///         ARRAY = 0b01,
///         GENERIC = 0b10,
///     }
/// }
///
/// let shape = Shape::ARRAY | Shape::GENERIC;
/// assert!(shape.contains(Shape::ARRAY));
/// assert_eq!(shape.without(Shape::GENERIC), Shape::ARRAY);
/// ```
#[macro_export]
macro_rules! bitflags {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $repr:ty {
            $($(#[$fmeta:meta])* $flag:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        #[allow(dead_code)]
        impl $name {
            $($(#[$fmeta])* pub const $flag: Self = Self($value);)+

            /// No flags set.
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Every declared flag set.
            pub const fn all() -> Self {
                Self($($value)|+)
            }

            /// Raw bit representation.
            pub const fn bits(&self) -> $repr {
                self.0
            }

            /// Returns true if every bit of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Returns true if any bit of `other` is set in `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// Returns a copy of `self` with the bits of `other` added.
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Returns a copy of `self` with the bits of `other` cleared.
            pub const fn without(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Sets the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Returns true if no bit is set.
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

/// Define an opcode catalog.
///
/// Every opcode gets a fixed byte value and a lowercase mnemonic used in
/// disassembly. Decoding an unknown byte hands the byte back as the error.
///
/// # Example
///
/// ```
/// use quill_macros::opcodes;
///
/// opcodes! {
///     pub enum Op: u8 {
///         Push = 0x00 => "push",
///         Pop = 0x01 => "pop",
///         Add = 0x10 => "iadd",
///     }
/// }
///
/// assert_eq!(Op::Push as u8, 0x00);
/// assert_eq!(Op::try_from(0x10), Ok(Op::Add));
/// assert_eq!(Op::try_from(0xff), Err(0xff));
/// assert_eq!(Op::Add.mnemonic(), "iadd");
/// ```
#[macro_export]
macro_rules! opcodes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $($(#[$vmeta:meta])* $opcode:ident = $value:literal => $mnemonic:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $($(#[$vmeta])* $opcode = $value),+
        }

        impl TryFrom<$repr> for $name {
            type Error = $repr;

            fn try_from(value: $repr) -> Result<Self, $repr> {
                match value {
                    $($value => Ok(Self::$opcode),)+
                    other => Err(other),
                }
            }
        }

        #[allow(dead_code)]
        impl $name {
            /// The lowercase assembly mnemonic.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $(Self::$opcode => $mnemonic,)+
                }
            }

            /// Every opcode in catalog order.
            pub const fn all() -> &'static [Self] {
                &[$(Self::$opcode),+]
            }
        }
    };
}
