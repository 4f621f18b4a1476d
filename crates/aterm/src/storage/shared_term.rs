use std::cell::Cell;
use std::hash::Hash;
use std::hash::Hasher;

use smallvec::SmallVec;

use merc_collections::Equivalent;

use crate::ATermIndex;
use crate::SymbolIndex;

/// The storage of a single term in the term pool.
///
/// Equality and hashing only consider the content of the term, i.e., its
/// head symbol, arguments and annotation, such that the pool can find
/// existing terms by their content.
#[derive(Debug)]
pub struct SharedTerm {
    symbol: SymbolIndex,
    arguments: SmallVec<[ATermIndex; 2]>,
    annotation: Option<u64>,

    /// The number of [crate::ATerm] handles that refer to this term.
    reference_count: Cell<usize>,
}

impl SharedTerm {
    /// Returns the head symbol of the term.
    pub fn symbol(&self) -> &SymbolIndex {
        &self.symbol
    }

    /// Returns the arguments of the term.
    pub fn arguments(&self) -> &[ATermIndex] {
        &self.arguments
    }

    /// Returns the annotation of the term, which is only used by integer terms.
    pub fn annotation(&self) -> Option<u64> {
        self.annotation
    }

    /// Returns the number of handles that keep this term alive.
    pub fn reference_count(&self) -> usize {
        self.reference_count.get()
    }

    pub(crate) fn increment(&self) {
        self.reference_count.set(self.reference_count.get() + 1);
    }

    pub(crate) fn decrement(&self) {
        let count = self.reference_count.get();
        debug_assert!(count > 0, "Released a term that has no references");
        self.reference_count.set(count - 1);
    }
}

impl PartialEq for SharedTerm {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.arguments == other.arguments && self.annotation == other.annotation
    }
}

impl Eq for SharedTerm {}

impl Hash for SharedTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.arguments.as_slice().hash(state);
        self.annotation.hash(state);
    }
}

/// A borrowed description of a term that is used to look up terms in the pool
/// without allocating.
pub struct SharedTermLookup<'a> {
    pub symbol: SymbolIndex,
    pub arguments: &'a [ATermIndex],
    pub annotation: Option<u64>,
}

impl Hash for SharedTermLookup<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.arguments.hash(state);
        self.annotation.hash(state);
    }
}

impl Equivalent<SharedTerm> for SharedTermLookup<'_> {
    fn equivalent(&self, other: &SharedTerm) -> bool {
        self.symbol == other.symbol && self.arguments == other.arguments.as_slice() && self.annotation == other.annotation
    }
}

impl From<&SharedTermLookup<'_>> for SharedTerm {
    fn from(lookup: &SharedTermLookup<'_>) -> Self {
        SharedTerm {
            symbol: lookup.symbol,
            arguments: SmallVec::from_slice(lookup.arguments),
            annotation: lookup.annotation,
            reference_count: Cell::new(0),
        }
    }
}
