// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static datatypes shared by the syntax tree and the compiler.
//!
//! A [`Datatype`] is a base [`Kind`] plus composable [`TypeFlags`]. Class
//! datatypes additionally carry a [`ClassId`] handed out by a
//! [`ClassRegistry`], so two class types are equal only when they name the
//! same interned class.

use std::fmt;

use quill_macros::bitflags;
use rustc_hash::FxHashMap;

/// The primitive kind of a datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No value; also the result of statements
    Null,
    /// Return type of functions without a value
    Void,
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Single character
    Char,
    /// Immutable text
    String,
    /// Instance of a user class
    Class,
    /// Function
    Lambda,
}

impl Kind {
    /// The source-level spelling of this kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Void => "void",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Char => "char",
            Kind::String => "string",
            Kind::Class => "class",
            Kind::Lambda => "lambda",
        }
    }
}

bitflags! {
    /// Flags composable onto any base kind.
    pub struct TypeFlags: u8 {
        /// Array of the base kind
        ARRAY = 1 << 0,
        /// Formal parameter wildcard; matches any argument carrying the
        /// remaining flags
        GENERIC = 1 << 1,
    }
}

/// Identity of an interned class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// The registry index of this class.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A static datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Datatype {
    /// The base kind
    pub kind: Kind,
    /// Composed flags
    pub flags: TypeFlags,
    /// The class, for class kinds
    pub class: Option<ClassId>,
}

impl Datatype {
    /// Result of statements.
    pub const NULL: Datatype = Datatype::new(Kind::Null);
    /// Return type of procedures.
    pub const VOID: Datatype = Datatype::new(Kind::Void);
    /// Boolean.
    pub const BOOL: Datatype = Datatype::new(Kind::Bool);
    /// Integer.
    pub const INT: Datatype = Datatype::new(Kind::Int);
    /// Float.
    pub const FLOAT: Datatype = Datatype::new(Kind::Float);
    /// Character.
    pub const CHAR: Datatype = Datatype::new(Kind::Char);
    /// String.
    pub const STRING: Datatype = Datatype::new(Kind::String);
    /// Function.
    pub const LAMBDA: Datatype = Datatype::new(Kind::Lambda);
    /// Formal parameter type accepting any argument.
    pub const ANY: Datatype = Datatype {
        kind: Kind::Null,
        flags: TypeFlags::GENERIC,
        class: None,
    };

    /// Creates a plain datatype of the given kind.
    pub const fn new(kind: Kind) -> Self {
        Self {
            kind,
            flags: TypeFlags::empty(),
            class: None,
        }
    }

    /// Creates the datatype of instances of `class`.
    pub const fn class(class: ClassId) -> Self {
        Self {
            kind: Kind::Class,
            flags: TypeFlags::empty(),
            class: Some(class),
        }
    }

    /// Returns the array type whose elements are `self`.
    pub const fn array(self) -> Self {
        Self {
            kind: self.kind,
            flags: self.flags.union(TypeFlags::ARRAY),
            class: self.class,
        }
    }

    /// Returns `self` marked as a generic formal parameter.
    pub const fn generic(self) -> Self {
        Self {
            kind: self.kind,
            flags: self.flags.union(TypeFlags::GENERIC),
            class: self.class,
        }
    }

    /// Returns true if the array flag is set.
    pub const fn is_array(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAY)
    }

    /// Returns true for instances of a class (not arrays of them).
    pub fn is_instance(&self) -> bool {
        self.kind == Kind::Class && !self.is_array()
    }

    /// Returns true for arrays and strings.
    pub fn is_sequence(&self) -> bool {
        self.is_array() || *self == Datatype::STRING
    }

    /// The type produced by indexing into `self`, if it can be indexed.
    ///
    /// Arrays yield their element type and strings yield characters.
    pub fn element(&self) -> Option<Datatype> {
        if self.is_array() {
            Some(Datatype {
                kind: self.kind,
                flags: self.flags.without(TypeFlags::ARRAY),
                class: self.class,
            })
        } else if *self == Datatype::STRING {
            Some(Datatype::CHAR)
        } else {
            None
        }
    }

    /// Returns true if an argument of type `arg` can be passed to a formal
    /// parameter of type `self`.
    ///
    /// A generic formal accepts any argument carrying its remaining flags;
    /// a generic formal with a concrete kind additionally requires that kind.
    pub fn accepts(&self, arg: &Datatype) -> bool {
        if self.flags.contains(TypeFlags::GENERIC) {
            let required = self.flags.without(TypeFlags::GENERIC);
            let kind_matches = self.kind == Kind::Null
                || (self.kind == arg.kind && self.class == arg.class);
            if arg.flags.contains(required) && kind_matches {
                return true;
            }
        }
        self == arg
    }
}

impl Default for Datatype {
    fn default() -> Self {
        Datatype::NULL
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags.contains(TypeFlags::GENERIC) && self.kind == Kind::Null {
            write!(f, "any")?;
        } else {
            match self.class {
                Some(id) => write!(f, "class#{}", id.0)?,
                None => write!(f, "{}", self.kind.name())?,
            }
        }
        if self.is_array() {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Interned class names.
///
/// Replaces name hashing as class identity: every distinct class name maps
/// to exactly one small integer id.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    names: Vec<String>,
    ids: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, interning it on first use.
    pub fn intern(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = ClassId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Looks up an already interned name.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.ids.get(name).copied()
    }

    /// The name behind `id`.
    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Number of interned classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no class has been interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Renders `ty` using class names instead of raw ids.
    pub fn describe(&self, ty: Datatype) -> String {
        match ty.class.and_then(|id| self.name(id)) {
            Some(name) if ty.is_array() => format!("{}[]", name),
            Some(name) => name.to_string(),
            None => ty.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_element_roundtrip() {
        let ints = Datatype::INT.array();
        assert!(ints.is_array());
        assert_eq!(ints.element(), Some(Datatype::INT));
        assert_eq!(Datatype::STRING.element(), Some(Datatype::CHAR));
        assert_eq!(Datatype::INT.element(), None);
    }

    #[test]
    fn test_generic_accepts_any_kind() {
        assert!(Datatype::ANY.accepts(&Datatype::INT));
        assert!(Datatype::ANY.accepts(&Datatype::STRING.array()));
        assert!(!Datatype::INT.accepts(&Datatype::FLOAT));
    }

    #[test]
    fn test_generic_requires_remaining_flags() {
        let any_array = Datatype::ANY.array();
        assert!(any_array.accepts(&Datatype::FLOAT.array()));
        assert!(!any_array.accepts(&Datatype::FLOAT));

        let int_generic = Datatype::INT.generic();
        assert!(int_generic.accepts(&Datatype::INT));
        assert!(!int_generic.accepts(&Datatype::CHAR));
    }

    #[test]
    fn test_class_identity_by_registry() {
        let mut classes = ClassRegistry::new();
        let point = classes.intern("Point");
        let line = classes.intern("Line");
        assert_eq!(classes.intern("Point"), point);
        assert_ne!(Datatype::class(point), Datatype::class(line));
        assert_eq!(classes.describe(Datatype::class(line)), "Line");
        assert_eq!(classes.describe(Datatype::class(point).array()), "Point[]");
        assert_eq!(classes.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Datatype::INT.array().to_string(), "int[]");
        assert_eq!(Datatype::ANY.to_string(), "any");
        assert_eq!(Datatype::VOID.to_string(), "void");
    }
}
