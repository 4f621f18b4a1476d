#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::ATermIndex;
use crate::SymbolIndex;
use crate::storage::Marker;

/// This trait should be used on all objects and containers related to storing unprotected terms, or unprotected symbols.
///
/// The implementation should mark all contained terms and symbols that must be kept alive using the provided `Marker`.
pub trait Markable {
    /// Marks all the contained terms to prevent them from being garbage collected.
    fn mark(&self, marker: &mut Marker);

    /// Should return true iff the given term is contained in the object. Used for runtime checks.
    fn contains_term(&self, term: &ATermIndex) -> bool;

    /// Should return true iff the given symbol is contained in the object. Used for runtime checks.
    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool;

    /// Returns the number of terms in the instance.
    fn len(&self) -> usize;

    /// Returns true iff the container is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Markable> Markable for Vec<T> {
    fn mark(&self, marker: &mut Marker) {
        for value in self {
            value.mark(marker);
        }
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.iter().any(|v| v.contains_term(term))
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.iter().any(|v| v.contains_symbol(symbol))
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl<T: Markable> Markable for VecDeque<T> {
    fn mark(&self, marker: &mut Marker) {
        for value in self {
            value.mark(marker);
        }
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.iter().any(|v| v.contains_term(term))
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.iter().any(|v| v.contains_symbol(symbol))
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Protected containers are stored in a [RefCell], which is never mutably
/// borrowed while the terms are being marked.
impl<T: Markable> Markable for RefCell<T> {
    fn mark(&self, marker: &mut Marker) {
        self.borrow().mark(marker);
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.borrow().contains_term(term)
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.borrow().contains_symbol(symbol)
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }
}

impl<T: Markable> Markable for Option<T> {
    fn mark(&self, marker: &mut Marker) {
        if let Some(value) = self {
            value.mark(marker);
        }
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        if let Some(value) = self {
            value.contains_term(term)
        } else {
            false
        }
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        if let Some(value) = self {
            value.contains_symbol(symbol)
        } else {
            false
        }
    }

    fn len(&self) -> usize {
        if let Some(value) = self { value.len() } else { 0 }
    }
}

// In Rust Its not yet possible to implement it for any tuples, so we implement it for some common sizes.
impl<T1: Markable, T2: Markable> Markable for (T1, T2) {
    fn mark(&self, marker: &mut Marker) {
        self.0.mark(marker);
        self.1.mark(marker);
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.0.contains_term(term) || self.1.contains_term(term)
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.0.contains_symbol(symbol) || self.1.contains_symbol(symbol)
    }

    fn len(&self) -> usize {
        self.0.len() + self.1.len()
    }
}

impl Markable for bool {
    fn mark(&self, _marker: &mut Marker) {
        // Nothing to mark
    }

    fn contains_term(&self, _term: &ATermIndex) -> bool {
        false
    }

    fn contains_symbol(&self, _symbol: &SymbolIndex) -> bool {
        false
    }

    fn len(&self) -> usize {
        0
    }
}

impl Markable for usize {
    fn mark(&self, _marker: &mut Marker) {
        // Nothing to mark
    }

    fn contains_term(&self, _term: &ATermIndex) -> bool {
        false
    }

    fn contains_symbol(&self, _symbol: &SymbolIndex) -> bool {
        false
    }

    fn len(&self) -> usize {
        0
    }
}
