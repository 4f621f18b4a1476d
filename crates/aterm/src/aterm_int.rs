#![forbid(unsafe_code)]

use std::fmt;

use delegate::delegate;

use crate::ATerm;
use crate::ATermArgs;
use crate::ATermIndex;
use crate::ATermRef;
use crate::Markable;
use crate::Symb;
use crate::SymbolIndex;
use crate::SymbolRef;
use crate::Term;
use crate::TermIterator;
use crate::TermPool;
use crate::storage::Marker;

/// Returns true if the term is an [ATermInt] term.
pub fn is_int_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    let pool = t.pool();
    *pool.reserved_int_symbol() == *t.get_head_symbol().shared()
}

/// Returns true if the symbol is an integer.
pub fn is_int_symbol<'a, 'b>(pool: &TermPool, f: &'b impl Symb<'a, 'b>) -> bool {
    *pool.reserved_int_symbol() == *f.shared()
}

/// This is a wrapper around the [ATerm] type that stores a single `u64` using an annotation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ATermInt {
    term: ATerm,
}

impl ATermInt {
    pub fn new(pool: &TermPool, value: u64) -> ATermInt {
        ATermInt {
            term: pool.create_int(value),
        }
    }

    /// Returns the value of the integer term.
    pub fn value(&self) -> u64 {
        self.term.annotation().unwrap_or_default()
    }
}

impl<'a, 'b> Term<'a, 'b> for ATermInt
where
    'b: 'a,
{
    delegate! {
        to self.term {
            fn protect(&self) -> ATerm;
            fn arg(&'b self, index: usize) -> ATermRef<'a>;
            fn arguments(&'b self) -> ATermArgs<'a>;
            fn copy(&'b self) -> ATermRef<'a>;
            fn get_head_symbol(&'b self) -> SymbolRef<'a>;
            fn iter(&'b self) -> TermIterator<'a>;
            fn index(&self) -> usize;
            fn shared(&self) -> &ATermIndex;
            fn annotation(&self) -> Option<u64>;
            fn pool(&'b self) -> &'a TermPool;
        }
    }
}

impl Markable for ATermInt {
    fn mark(&self, marker: &mut Marker) {
        self.term.mark(marker);
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.term.contains_term(term)
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.term.contains_symbol(symbol)
    }

    fn len(&self) -> usize {
        1
    }
}

impl From<ATerm> for ATermInt {
    fn from(term: ATerm) -> Self {
        debug_assert!(is_int_term(&term), "Term {term:?} is not an integer term");
        ATermInt { term }
    }
}

impl From<ATermInt> for ATerm {
    fn from(value: ATermInt) -> Self {
        value.term
    }
}

impl fmt::Display for ATermInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl fmt::Debug for ATermInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A reference to an [ATermInt].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ATermIntRef<'a> {
    term: ATermRef<'a>,
}

impl<'a> ATermIntRef<'a> {
    /// Returns the value of the integer term.
    pub fn value(&self) -> u64 {
        self.term.annotation().unwrap_or_default()
    }

    /// Protects the integer term.
    pub fn protect(&self) -> ATermInt {
        ATermInt {
            term: self.term.protect(),
        }
    }
}

impl<'a> From<ATermRef<'a>> for ATermIntRef<'a> {
    fn from(term: ATermRef<'a>) -> Self {
        debug_assert!(is_int_term(&term), "Term {term:?} is not an integer term");
        ATermIntRef { term }
    }
}

impl fmt::Display for ATermIntRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
