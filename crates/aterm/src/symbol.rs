#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use merc_collections::SetIndex;

use crate::ATermIndex;
use crate::Markable;
use crate::TermPool;
use crate::storage::Marker;

/// The public interface for a function symbol. Can be used to write generic
/// functions that accept both [Symbol] and [SymbolRef].
///
/// See [crate::Term] for more information on how to use this trait with two lifetimes.
pub trait Symb<'a, 'b> {
    /// Obtain the symbol's name.
    fn name(&'b self) -> Rc<str>;

    /// Obtain the symbol's arity.
    fn arity(&self) -> usize;

    /// Create a copy of the symbol reference.
    fn copy(&'b self) -> SymbolRef<'a>;

    /// Returns a unique index for the symbol.
    fn index(&self) -> usize;

    /// Returns the index of the symbol in the symbol pool.
    fn shared(&self) -> &SymbolIndex;
}

/// The index of a function symbol in the symbol pool of a [TermPool].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolIndex(SetIndex);

impl SymbolIndex {
    pub(crate) fn new(index: SetIndex) -> Self {
        Self(index)
    }

    pub(crate) fn set_index(&self) -> SetIndex {
        self.0
    }

    /// Returns the position of the symbol in the symbol pool.
    pub fn value(&self) -> usize {
        *self.0
    }
}

impl fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolIndex({})", self.0)
    }
}

impl fmt::Display for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Markable for SymbolIndex {
    fn mark(&self, marker: &mut Marker) {
        marker.mark_symbol(self);
    }

    fn contains_term(&self, _term: &ATermIndex) -> bool {
        false
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self == symbol
    }

    fn len(&self) -> usize {
        1
    }
}

/// A reference to a function symbol in the symbol pool.
#[derive(Clone, Copy)]
pub struct SymbolRef<'a> {
    pool: &'a TermPool,
    index: SymbolIndex,
}

impl<'a> SymbolRef<'a> {
    /// Protects the symbol from garbage collection, yielding a `Symbol`.
    pub fn protect(&self) -> Symbol {
        self.pool.protect_symbol(&self.index)
    }

    /// Internal constructor to create a `SymbolRef` from a `SymbolIndex`.
    pub(crate) fn from_index(pool: &'a TermPool, index: SymbolIndex) -> SymbolRef<'a> {
        SymbolRef { pool, index }
    }
}

impl<'a> Symb<'a, '_> for SymbolRef<'a> {
    fn name(&self) -> Rc<str> {
        self.pool.symbol_name(&self.index)
    }

    fn arity(&self) -> usize {
        self.pool.symbol_arity(&self.index)
    }

    fn copy(&self) -> SymbolRef<'a> {
        *self
    }

    fn index(&self) -> usize {
        self.index.value()
    }

    fn shared(&self) -> &SymbolIndex {
        &self.index
    }
}

impl PartialEq for SymbolRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for SymbolRef<'_> {}

impl Hash for SymbolRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialOrd for SymbolRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())
    }
}

/// A protected function symbol, with the same interface as [SymbolRef].
pub struct Symbol {
    pool: TermPool,
    index: SymbolIndex,
}

impl Symbol {
    /// Internal constructor for a symbol whose reference count has already been incremented.
    pub(crate) fn from_index(pool: TermPool, index: SymbolIndex) -> Symbol {
        Self { pool, index }
    }

    /// Create a copy of the symbol reference.
    pub fn copy(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(&self.pool, self.index)
    }
}

impl<'a, 'b> Symb<'a, 'b> for Symbol
where
    'b: 'a,
{
    fn name(&self) -> Rc<str> {
        self.pool.symbol_name(&self.index)
    }

    fn arity(&self) -> usize {
        self.pool.symbol_arity(&self.index)
    }

    fn copy(&'b self) -> SymbolRef<'a> {
        SymbolRef::from_index(&self.pool, self.index)
    }

    fn index(&self) -> usize {
        self.index.value()
    }

    fn shared(&self) -> &SymbolIndex {
        &self.index
    }
}

impl<'a> Symb<'a, '_> for &'a Symbol {
    fn name(&self) -> Rc<str> {
        self.pool.symbol_name(&self.index)
    }

    fn arity(&self) -> usize {
        self.pool.symbol_arity(&self.index)
    }

    fn copy(&self) -> SymbolRef<'a> {
        Symbol::copy(*self)
    }

    fn index(&self) -> usize {
        self.index.value()
    }

    fn shared(&self) -> &SymbolIndex {
        &self.index
    }
}

impl Markable for Symbol {
    fn mark(&self, marker: &mut Marker) {
        marker.mark_symbol(&self.index);
    }

    fn contains_term(&self, _term: &ATermIndex) -> bool {
        false
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.index == *symbol
    }

    fn len(&self) -> usize {
        1
    }
}

impl Drop for Symbol {
    fn drop(&mut self) {
        self.pool.release_symbol(&self.index);
    }
}

impl From<&SymbolRef<'_>> for Symbol {
    fn from(value: &SymbolRef) -> Self {
        value.protect()
    }
}

impl Clone for Symbol {
    fn clone(&self) -> Self {
        self.pool.protect_symbol(&self.index)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.copy())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.copy())
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl PartialEq<SymbolRef<'_>> for Symbol {
    fn eq(&self, other: &SymbolRef<'_>) -> bool {
        self.index == other.index
    }
}

impl PartialEq<Symbol> for SymbolRef<'_> {
    fn eq(&self, other: &Symbol) -> bool {
        self.index == other.index
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl Eq for Symbol {}
