use std::cell::Cell;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use merc_collections::Equivalent;
use merc_collections::IndexedSet;

use crate::SymbolIndex;

/// The storage of a function symbol in the symbol pool. Symbols are uniquely
/// identified by their name and arity.
#[derive(Debug)]
pub struct SharedSymbol {
    name: Rc<str>,
    arity: usize,

    /// The number of [crate::Symbol] handles and terms that refer to this symbol.
    reference_count: Cell<usize>,
}

impl SharedSymbol {
    /// Returns the name of the symbol.
    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    /// Returns the arity of the symbol.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the number of references to this symbol.
    pub fn reference_count(&self) -> usize {
        self.reference_count.get()
    }

    pub(crate) fn increment(&self) {
        self.reference_count.set(self.reference_count.get() + 1);
    }

    pub(crate) fn decrement(&self) {
        let count = self.reference_count.get();
        debug_assert!(count > 0, "Released a symbol that has no references");
        self.reference_count.set(count - 1);
    }
}

impl PartialEq for SharedSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && self.name == other.name
    }
}

impl Eq for SharedSymbol {}

impl Hash for SharedSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.as_ref().hash(state);
        self.arity.hash(state);
    }
}

/// A lookup key for symbols that avoids allocating the name.
struct SharedSymbolLookup<'a> {
    name: &'a str,
    arity: usize,
}

impl Hash for SharedSymbolLookup<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.arity.hash(state);
    }
}

impl Equivalent<SharedSymbol> for SharedSymbolLookup<'_> {
    fn equivalent(&self, other: &SharedSymbol) -> bool {
        self.arity == other.arity && self.name == other.name.as_ref()
    }
}

impl From<&SharedSymbolLookup<'_>> for SharedSymbol {
    fn from(lookup: &SharedSymbolLookup<'_>) -> Self {
        SharedSymbol {
            name: Rc::from(lookup.name),
            arity: lookup.arity,
            reference_count: Cell::new(0),
        }
    }
}

/// The set of all function symbols that are in use.
#[derive(Default)]
pub struct SymbolPool {
    symbols: IndexedSet<SharedSymbol>,
}

impl SymbolPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the symbol with the given name and arity, creating it when it does not exist yet.
    pub fn create(&mut self, name: &str, arity: usize) -> SymbolIndex {
        let (index, _) = self.symbols.insert_equiv(&SharedSymbolLookup { name, arity });
        SymbolIndex::new(index)
    }

    /// Returns the symbol with the given index.
    pub fn get(&self, index: &SymbolIndex) -> &SharedSymbol {
        &self.symbols[index.set_index()]
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true iff there are no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns an upper bound on the indices of the symbols.
    pub fn slots(&self) -> usize {
        self.symbols.slots()
    }

    /// Removes all symbols without references for which `keep` returns false. Returns the number of removed symbols.
    pub fn retain_unreferenced<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&SymbolIndex) -> bool,
    {
        self.symbols
            .retain_mut(|index, symbol| symbol.reference_count() > 0 || keep(&SymbolIndex::new(index)))
    }
}
