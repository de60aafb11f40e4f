// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scope management for symbol resolution during compilation.
//!
//! Scopes form a tree stored in an arena: each scope owns its children
//! through the arena and refers to its parent by index. Functions and
//! classes open *real* scopes, which start a new frame. Control-flow bodies
//! open *virtual* scopes, which continue the enclosing frame's addresses.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ast::{Annotation, ClassId, Datatype, Location};

/// Index of a scope in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Index of a symbol in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// The construct that opened a scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScopeKind {
    /// Top level
    Root,
    /// Function body; `method` is set when declared directly in a class
    Function {
        /// Declared return type
        returns: Datatype,
        /// Declared directly inside a class body
        method: bool,
    },
    /// Class body, which is also the constructor
    Class {
        /// The class symbol
        class: SymbolId,
    },
    /// If, else or while body
    Block,
}

/// What a symbol names.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// Variable, parameter or class field
    Variable {
        /// Whether it may be assigned
        mutable: bool,
    },
    /// Function or method
    Function {
        /// Parameter types
        params: Vec<Datatype>,
        /// Return type
        returns: Datatype,
        /// Intrinsic index for host-provided functions
        external: Option<u32>,
    },
    /// Class
    Class {
        /// Interned class identity
        id: ClassId,
        /// Constructor parameter types
        params: Vec<Datatype>,
        /// Fields and methods by name
        members: FxHashMap<String, SymbolId>,
    },
}

/// A declared name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Declared name
    pub name: String,
    /// Declaration site
    pub location: Location,
    /// Frame-relative slot, global slot, or entry instruction
    pub address: i64,
    /// Static type
    pub datatype: Datatype,
    /// Declared at depth zero
    pub global: bool,
    /// Constructor parameter
    pub class_param: bool,
    /// Class that owns this field or method
    pub owner: Option<SymbolId>,
    /// Length of the array or string it was initialized with, if known
    pub array_size: Option<usize>,
    /// What the name refers to
    pub kind: SymbolKind,
}

impl Symbol {
    /// Creates a variable symbol.
    pub fn variable(name: &str, location: Location, datatype: Datatype, mutable: bool) -> Self {
        Self {
            name: name.to_string(),
            location,
            address: 0,
            datatype,
            global: false,
            class_param: false,
            owner: None,
            array_size: None,
            kind: SymbolKind::Variable { mutable },
        }
    }

    /// Creates a function symbol.
    pub fn function(
        name: &str,
        location: Location,
        params: Vec<Datatype>,
        returns: Datatype,
        external: Option<u32>,
    ) -> Self {
        Self {
            kind: SymbolKind::Function {
                params,
                returns,
                external,
            },
            ..Self::variable(name, location, Datatype::LAMBDA, false)
        }
    }

    /// Creates a class symbol.
    pub fn class(name: &str, location: Location, id: ClassId, params: Vec<Datatype>) -> Self {
        Self {
            kind: SymbolKind::Class {
                id,
                params,
                members: FxHashMap::default(),
            },
            ..Self::variable(name, location, Datatype::class(id), false)
        }
    }

    /// Returns true for variables, parameters and fields.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable { .. })
    }

    /// Returns true for assignable variables.
    pub fn is_mutable(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable { mutable: true })
    }
}

/// A single scope.
#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    symbols: FxHashMap<String, SymbolId>,
    classes: FxHashMap<ClassId, SymbolId>,
    address: i64,
    high_water: i64,
    is_virtual: bool,
    kind: ScopeKind,
    flags: Annotation,
}

impl Scope {
    fn new(parent: Option<ScopeId>, kind: ScopeKind, is_virtual: bool, address: i64) -> Self {
        Self {
            parent,
            children: Vec::new(),
            symbols: FxHashMap::default(),
            classes: FxHashMap::default(),
            address,
            high_water: address,
            is_virtual,
            kind,
            flags: Annotation::empty(),
        }
    }
}

/// The scope tree plus every symbol declared in it.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    current: ScopeId,
    depth: usize,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Creates a tree holding only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, ScopeKind::Root, false, 0)],
            symbols: Vec::new(),
            current: ScopeId(0),
            depth: 0,
        }
    }

    /// Releases every scope and symbol and starts over from a fresh root.
    pub fn clear(&mut self) {
        // The arena is flat, so teardown never recurses.
        *self = Self::new();
    }

    /// Number of real scopes between the current scope and the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The current scope.
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// The construct that opened the current scope.
    pub fn kind(&self) -> ScopeKind {
        self.scope(self.current).kind
    }

    /// Total number of scopes created, including the root.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    // ========================================================================
    // Scope lifetime
    // ========================================================================

    /// Opens a real scope: a new frame with addresses starting at zero.
    pub fn push(&mut self, kind: ScopeKind) -> ScopeId {
        self.depth += 1;
        self.open(kind, false, 0)
    }

    /// Opens a virtual scope continuing the current frame's addresses.
    pub fn push_virtual(&mut self, kind: ScopeKind) -> ScopeId {
        let address = self.scope(self.current).address;
        self.open(kind, true, address)
    }

    fn open(&mut self, kind: ScopeKind, is_virtual: bool, address: i64) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes
            .push(Scope::new(Some(self.current), kind, is_virtual, address));
        self.scope_mut(self.current).children.push(id);
        trace!(scope = id.0, depth = self.depth, is_virtual, "open scope");
        self.current = id;
        id
    }

    /// Closes the current scope and returns the frame size it reached.
    ///
    /// A virtual scope hands its high-water mark up to the enclosing scope,
    /// so the owning frame is sized for every slot its blocks used.
    pub fn pop(&mut self) -> usize {
        let closed = self.current;
        let (parent, is_virtual, high_water) = {
            let scope = self.scope(closed);
            (scope.parent, scope.is_virtual, scope.high_water)
        };
        let Some(parent) = parent else {
            return high_water as usize;
        };
        if is_virtual {
            let enclosing = self.scope_mut(parent);
            enclosing.high_water = enclosing.high_water.max(high_water);
        } else {
            self.depth -= 1;
        }
        trace!(scope = closed.0, high_water, "close scope");
        self.current = parent;
        high_water.max(0) as usize
    }

    // ========================================================================
    // Addresses
    // ========================================================================

    /// Hands out the next slot of the current frame.
    pub fn next_address(&mut self) -> i64 {
        let scope = self.scope_mut(self.current);
        let address = scope.address;
        scope.address += 1;
        scope.high_water = scope.high_water.max(scope.address);
        address
    }

    /// The slot the next declaration will receive.
    pub fn peek_address(&self) -> i64 {
        self.scope(self.current).address
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// The symbol behind `id`.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Mutable access to the symbol behind `id`.
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    /// Adds `symbol` to the current scope.
    ///
    /// Fails with the earlier declaration site when the name is already
    /// declared in this scope. Shadowing a name from an enclosing scope is
    /// allowed.
    pub fn declare(&mut self, mut symbol: Symbol) -> Result<SymbolId, Location> {
        if let Some(existing) = self.lookup_local(&symbol.name) {
            return Err(self.symbol(existing).location);
        }
        symbol.global = self.depth == 0;
        let id = SymbolId(self.symbols.len());
        let name = symbol.name.clone();
        self.symbols.push(symbol);
        self.scope_mut(self.current).symbols.insert(name, id);
        Ok(id)
    }

    /// Finds `name` in the current scope only.
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.scope(self.current).symbols.get(name).copied()
    }

    /// Finds `name` in the current scope or any enclosing one.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.lookup_ext(name).map(|(id, _)| id)
    }

    /// Finds `name` and counts the lexical frames crossed to reach it.
    pub fn lookup_ext(&self, name: &str) -> Option<(SymbolId, usize)> {
        self.walk(|scope| scope.symbols.get(name).copied())
    }

    /// Lexical frames between the current scope and the scope declaring
    /// `symbol`: the static link depth of a call to something it declares.
    pub fn link_to(&self, symbol: SymbolId) -> Option<usize> {
        let name = &self.symbol(symbol).name;
        self.walk(|scope| scope.symbols.get(name).filter(|id| **id == symbol).copied())
            .map(|(_, hops)| hops)
    }

    /// Walks outwards from the current scope until `find` succeeds, counting
    /// the frames left behind.
    ///
    /// Virtual scopes share their frame with the enclosing scope and are not
    /// counted. A class scope is a frame only for its constructor body:
    /// methods run after the constructor returned, so a walk that started
    /// inside a method steps from the class scope straight to its parent.
    fn walk<T>(&self, mut find: impl FnMut(&Scope) -> Option<T>) -> Option<(T, usize)> {
        let mut hops = 0;
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let scope = self.scope(id);
            if let Some(found) = find(scope) {
                return Some((found, hops));
            }
            let is_frame = match scope.kind {
                ScopeKind::Class { .. } => hops == 0,
                _ => !scope.is_virtual,
            };
            if is_frame && scope.parent.is_some() {
                hops += 1;
            }
            cursor = scope.parent;
        }
        None
    }

    /// Adds a class to the current scope's class registry.
    pub fn register_class(&mut self, id: ClassId, symbol: SymbolId) {
        self.scope_mut(self.current).classes.insert(id, symbol);
    }

    /// Returns true if the current scope already registered `id`.
    pub fn has_local_class(&self, id: ClassId) -> bool {
        self.scope(self.current).classes.contains_key(&id)
    }

    /// Finds the declaration of class `id` in scope.
    pub fn find_class(&self, id: ClassId) -> Option<SymbolId> {
        let mut cursor = Some(self.current);
        while let Some(scope_id) = cursor {
            let scope = self.scope(scope_id);
            if let Some(symbol) = scope.classes.get(&id) {
                return Some(*symbol);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Adds `member` to the field namespace of `class`.
    pub fn add_member(&mut self, class: SymbolId, member: SymbolId) {
        let name = self.symbol(member).name.clone();
        self.symbol_mut(member).owner = Some(class);
        if let SymbolKind::Class { members, .. } = &mut self.symbol_mut(class).kind {
            members.insert(name, member);
        }
    }

    /// Finds a field or method of `class`.
    pub fn member(&self, class: SymbolId, name: &str) -> Option<SymbolId> {
        match &self.symbol(class).kind {
            SymbolKind::Class { members, .. } => members.get(name).copied(),
            _ => None,
        }
    }

    // ========================================================================
    // Enclosing constructs
    // ========================================================================

    /// The innermost enclosing function's return type and method flag.
    pub fn enclosing_function(&self) -> Option<(Datatype, bool)> {
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let scope = self.scope(id);
            match scope.kind {
                ScopeKind::Function { returns, method } => return Some((returns, method)),
                ScopeKind::Class { .. } | ScopeKind::Root => return None,
                ScopeKind::Block => cursor = scope.parent,
            }
        }
        None
    }

    /// The class whose body is the current scope.
    pub fn current_class(&self) -> Option<SymbolId> {
        match self.kind() {
            ScopeKind::Class { class } => Some(class),
            _ => None,
        }
    }

    // ========================================================================
    // Annotation flags
    // ========================================================================

    /// Annotation flags pending on the current scope.
    pub fn flags(&self) -> Annotation {
        self.scope(self.current).flags
    }

    /// Marks `flag` pending on the current scope.
    pub fn set_flag(&mut self, flag: Annotation) {
        self.scope_mut(self.current).flags.insert(flag);
    }

    /// Clears every pending flag on the current scope.
    pub fn clear_flags(&mut self) {
        self.scope_mut(self.current).flags = Annotation::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Symbol {
        Symbol::variable(name, Location::new(1, 1), Datatype::INT, false)
    }

    #[test]
    fn test_root_symbols_are_global() {
        let mut tree = ScopeTree::new();
        let id = tree.declare(var("x")).unwrap();
        assert!(tree.symbol(id).global);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut tree = ScopeTree::new();
        tree.declare(var("x")).unwrap();
        let existing = tree.declare(var("x")).unwrap_err();
        assert_eq!(existing, Location::new(1, 1));
    }

    #[test]
    fn test_shadowing_in_nested_scope() {
        let mut tree = ScopeTree::new();
        let outer = tree.declare(var("x")).unwrap();
        tree.push(ScopeKind::Function {
            returns: Datatype::VOID,
            method: false,
        });
        let inner = tree.declare(var("x")).unwrap();
        assert_ne!(outer, inner);
        assert!(!tree.symbol(inner).global);
        assert_eq!(tree.lookup("x"), Some(inner));
        tree.pop();
        assert_eq!(tree.lookup("x"), Some(outer));
    }

    #[test]
    fn test_virtual_scope_continues_addresses() {
        let mut tree = ScopeTree::new();
        tree.push(ScopeKind::Function {
            returns: Datatype::VOID,
            method: false,
        });
        assert_eq!(tree.next_address(), 0);
        tree.push_virtual(ScopeKind::Block);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.next_address(), 1);
        assert_eq!(tree.next_address(), 2);
        tree.pop();
        assert_eq!(tree.peek_address(), 1);
        assert_eq!(tree.pop(), 3);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_lookup_ext_counts_real_boundaries() {
        let mut tree = ScopeTree::new();
        tree.push(ScopeKind::Function {
            returns: Datatype::VOID,
            method: false,
        });
        let a = tree.declare(var("a")).unwrap();
        tree.push_virtual(ScopeKind::Block);
        assert_eq!(tree.lookup_ext("a"), Some((a, 0)));
        tree.push(ScopeKind::Function {
            returns: Datatype::INT,
            method: false,
        });
        assert_eq!(tree.lookup_ext("a"), Some((a, 1)));
        assert_eq!(tree.lookup_ext("missing"), None);
    }

    #[test]
    fn test_methods_skip_the_class_frame() {
        let mut tree = ScopeTree::new();
        tree.push(ScopeKind::Function {
            returns: Datatype::VOID,
            method: false,
        });
        let v = tree.declare(var("v")).unwrap();
        let class = tree.declare(var("C")).unwrap();
        tree.push(ScopeKind::Class { class });
        let field = tree.declare(var("x")).unwrap();
        // Constructor body: the class scope is its own frame.
        assert_eq!(tree.lookup_ext("v"), Some((v, 1)));
        assert_eq!(tree.link_to(class), Some(1));

        tree.push(ScopeKind::Function {
            returns: Datatype::INT,
            method: true,
        });
        assert_eq!(tree.lookup_ext("x"), Some((field, 1)));
        assert_eq!(tree.lookup_ext("v"), Some((v, 1)));
        assert_eq!(tree.link_to(class), Some(1));

        tree.push(ScopeKind::Function {
            returns: Datatype::INT,
            method: false,
        });
        assert_eq!(tree.lookup_ext("v"), Some((v, 2)));
        assert_eq!(tree.link_to(field), Some(2));
    }

    #[test]
    fn test_enclosing_function_through_blocks() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.enclosing_function(), None);
        tree.push(ScopeKind::Function {
            returns: Datatype::INT,
            method: true,
        });
        tree.push_virtual(ScopeKind::Block);
        assert_eq!(tree.enclosing_function(), Some((Datatype::INT, true)));
    }

    #[test]
    fn test_flags() {
        let mut tree = ScopeTree::new();
        tree.set_flag(Annotation::GETTER);
        assert!(tree.flags().contains(Annotation::GETTER));
        tree.clear_flags();
        assert!(tree.flags().is_empty());
    }

    #[test]
    fn test_clear_resets_tree() {
        let mut tree = ScopeTree::new();
        tree.push(ScopeKind::Block);
        tree.declare(var("x")).unwrap();
        tree.clear();
        assert_eq!(tree.scope_count(), 1);
        assert_eq!(tree.lookup("x"), None);
    }
}
