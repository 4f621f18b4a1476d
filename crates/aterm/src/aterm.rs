#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use itertools::Itertools;

use merc_collections::Equivalent;
use merc_collections::SetIndex;

use crate::Markable;
use crate::Symb;
use crate::SymbolIndex;
use crate::SymbolRef;
use crate::TermPool;
use crate::is_empty_list_term;
use crate::is_int_term;
use crate::is_list_term;
use crate::storage::Marker;

/// The ATerm trait represents a first-order term in the ATerm library.
/// It provides methods to manipulate and access the term's properties.
///
/// # Details
///
/// This trait is rather complicated with two lifetimes, but this is used
/// to support both the [ATerm], which has no lifetimes, and [ATermRef<'a>]
/// whose lifetime is bound by `'a`. Because now we can be require that `'b: 'a`
/// for the implementation of [Term<'a, 'b>] for [ATerm], we can safely return
/// [ATermRef<'a>] from methods of [Term<'a, 'b>].
pub trait Term<'a, 'b> {
    /// Protects the term from garbage collection
    fn protect(&self) -> ATerm;

    /// Returns the indexed argument of the term
    fn arg(&'b self, index: usize) -> ATermRef<'a>;

    /// Returns the list of arguments as a collection
    fn arguments(&'b self) -> ATermArgs<'a>;

    /// Makes a copy of the term with the same lifetime as itself.
    fn copy(&'b self) -> ATermRef<'a>;

    /// Returns the function of an ATermRef
    fn get_head_symbol(&'b self) -> SymbolRef<'a>;

    /// Returns an iterator over all arguments of the term that runs in pre order traversal of the term trees.
    fn iter(&'b self) -> TermIterator<'a>;

    /// Returns a unique index of the term in the term pool
    fn index(&self) -> usize;

    /// Returns the index of the term in the term pool
    fn shared(&self) -> &ATermIndex;

    /// Returns the annotation of the term, only integer terms have one.
    fn annotation(&self) -> Option<u64>;

    /// Returns the pool in which the term is stored.
    fn pool(&'b self) -> &'a TermPool;
}

/// The index of a term in the [TermPool]. Indices of terms that have been
/// garbage collected are detected in debug builds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ATermIndex(SetIndex);

impl ATermIndex {
    pub(crate) fn new(index: SetIndex) -> Self {
        Self(index)
    }

    pub(crate) fn set_index(&self) -> SetIndex {
        self.0
    }

    /// Returns the position of the term in the pool.
    pub fn value(&self) -> usize {
        *self.0
    }
}

impl fmt::Debug for ATermIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ATermIndex({})", self.0)
    }
}

impl fmt::Display for ATermIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Markable for ATermIndex {
    fn mark(&self, marker: &mut Marker) {
        marker.mark(self);
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self == term
    }

    fn contains_symbol(&self, _symbol: &SymbolIndex) -> bool {
        false
    }

    fn len(&self) -> usize {
        1
    }
}

/// This represents a lifetime bound reference to an existing [ATerm].
#[derive(Clone, Copy)]
pub struct ATermRef<'a> {
    pool: &'a TermPool,
    index: ATermIndex,
}

impl<'a> ATermRef<'a> {
    /// Creates a new term reference from the given index.
    pub(crate) fn from_index(pool: &'a TermPool, index: ATermIndex) -> Self {
        ATermRef { pool, index }
    }
}

impl<'a, 'b> Term<'a, 'b> for ATermRef<'a> {
    fn protect(&self) -> ATerm {
        self.pool.protect(&self.index)
    }

    fn arg(&self, index: usize) -> ATermRef<'a> {
        debug_assert!(
            index < self.get_head_symbol().arity(),
            "arg({index}) is not defined for term {self:?}"
        );

        ATermRef::from_index(self.pool, self.pool.argument(&self.index, index))
    }

    fn arguments(&self) -> ATermArgs<'a> {
        ATermArgs::new(*self)
    }

    fn copy(&self) -> ATermRef<'a> {
        *self
    }

    fn get_head_symbol(&self) -> SymbolRef<'a> {
        SymbolRef::from_index(self.pool, self.pool.head_symbol(&self.index))
    }

    fn iter(&self) -> TermIterator<'a> {
        TermIterator::new(*self)
    }

    fn index(&self) -> usize {
        self.index.value()
    }

    fn shared(&self) -> &ATermIndex {
        &self.index
    }

    fn annotation(&self) -> Option<u64> {
        self.pool.annotation(&self.index)
    }

    fn pool(&self) -> &'a TermPool {
        self.pool
    }
}

impl PartialEq for ATermRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        debug_assert!(self.pool.ptr_eq(other.pool), "Compared terms of different pools");
        self.index == other.index
    }
}

impl Eq for ATermRef<'_> {}

impl Hash for ATermRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialOrd for ATermRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ATermRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl Equivalent<ATerm> for ATermRef<'_> {
    fn equivalent(&self, key: &ATerm) -> bool {
        self.index == key.index
    }
}

impl fmt::Display for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_int_term(self) {
            write!(f, "{}", self.annotation().unwrap_or_default())
        } else if is_list_term(self) || is_empty_list_term(self) {
            let mut elements = Vec::new();
            let mut current = *self;
            while is_list_term(&current) {
                elements.push(current.arg(0));
                current = current.arg(1);
            }

            write!(f, "[{}]", elements.iter().format(","))
        } else if self.arguments().is_empty() {
            write!(f, "{}", self.get_head_symbol().name())
        } else {
            write!(
                f,
                "{}({})",
                self.get_head_symbol().name(),
                self.arguments().format(", ")
            )
        }
    }
}

impl fmt::Debug for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// The protected version of [ATermRef], mostly derived from it.
///
/// # Details
///
/// Every [ATerm] keeps the term it refers to, and all its subterms, alive
/// until it is dropped. The handle carries the pool that it was created in,
/// so it can be used without access to the pool.
pub struct ATerm {
    pool: TermPool,
    index: ATermIndex,
}

impl ATerm {
    /// Creates a handle for a term whose reference count has already been incremented.
    pub(crate) fn from_index(pool: TermPool, index: ATermIndex) -> ATerm {
        ATerm { pool, index }
    }

    /// Returns a borrow from the term
    pub fn get(&self) -> ATermRef<'_> {
        ATermRef::from_index(&self.pool, self.index)
    }
}

impl<'a, 'b> Term<'a, 'b> for ATerm
where
    'b: 'a,
{
    fn protect(&self) -> ATerm {
        self.clone()
    }

    fn arg(&'b self, index: usize) -> ATermRef<'a> {
        self.copy().arg(index)
    }

    fn arguments(&'b self) -> ATermArgs<'a> {
        self.copy().arguments()
    }

    fn copy(&'b self) -> ATermRef<'a> {
        ATermRef::from_index(&self.pool, self.index)
    }

    fn get_head_symbol(&'b self) -> SymbolRef<'a> {
        self.copy().get_head_symbol()
    }

    fn iter(&'b self) -> TermIterator<'a> {
        TermIterator::new(self.copy())
    }

    fn index(&self) -> usize {
        self.index.value()
    }

    fn shared(&self) -> &ATermIndex {
        &self.index
    }

    fn annotation(&self) -> Option<u64> {
        self.pool.annotation(&self.index)
    }

    fn pool(&'b self) -> &'a TermPool {
        &self.pool
    }
}

impl Markable for ATerm {
    fn mark(&self, marker: &mut Marker) {
        marker.mark(&self.index);
    }

    fn contains_term(&self, term: &ATermIndex) -> bool {
        self.index == *term
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        self.pool.head_symbol(&self.index) == *symbol
    }

    fn len(&self) -> usize {
        1
    }
}

impl Drop for ATerm {
    fn drop(&mut self) {
        self.pool.release(&self.index);
    }
}

impl Clone for ATerm {
    fn clone(&self) -> Self {
        self.pool.protect(&self.index)
    }
}

impl fmt::Display for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.copy())
    }
}

impl fmt::Debug for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.copy())
    }
}

impl Hash for ATerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialEq for ATerm {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl PartialEq<ATermRef<'_>> for ATerm {
    fn eq(&self, other: &ATermRef<'_>) -> bool {
        self.index == other.index
    }
}

impl PartialOrd for ATerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ATerm {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl Eq for ATerm {}

impl From<ATermRef<'_>> for ATerm {
    fn from(value: ATermRef<'_>) -> Self {
        value.protect()
    }
}

/// An iterator over the arguments of a term.
pub struct ATermArgs<'a> {
    term: ATermRef<'a>,
    arity: usize,
    index: usize,
}

impl<'a> ATermArgs<'a> {
    fn new(term: ATermRef<'a>) -> ATermArgs<'a> {
        let arity = term.get_head_symbol().arity();
        ATermArgs { term, arity, index: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.arity == 0
    }
}

impl<'a> Iterator for ATermArgs<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.arity {
            let result = self.term.arg(self.index);
            self.index += 1;
            Some(result)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl DoubleEndedIterator for ATermArgs<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.index < self.arity {
            let result = self.term.arg(self.arity - 1);
            self.arity -= 1;
            Some(result)
        } else {
            None
        }
    }
}

impl ExactSizeIterator for ATermArgs<'_> {
    fn len(&self) -> usize {
        self.arity - self.index
    }
}

/// An iterator over all subterms of the given [ATerm] in preorder traversal, i.e.,
/// for f(g(a), b) we visit f(g(a), b), g(a), a, b.
pub struct TermIterator<'a> {
    queue: VecDeque<ATermRef<'a>>,
}

impl<'a> TermIterator<'a> {
    pub fn new(t: ATermRef<'a>) -> TermIterator<'a> {
        TermIterator {
            queue: VecDeque::from([t]),
        }
    }
}

impl<'a> Iterator for TermIterator<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let term = self.queue.pop_back()?;

        // Put subterms in the queue
        for argument in term.arguments().rev() {
            self.queue.push_back(argument);
        }

        Some(term)
    }
}

/// Blanket implementation allowing passing borrowed terms as references.
impl<'a, 'b, T: Term<'a, 'b>> Term<'a, 'b> for &'b T {
    fn protect(&self) -> ATerm {
        (*self).protect()
    }

    fn arg(&self, index: usize) -> ATermRef<'a> {
        (*self).arg(index)
    }

    fn arguments(&self) -> ATermArgs<'a> {
        (*self).arguments()
    }

    fn copy(&self) -> ATermRef<'a> {
        (*self).copy()
    }

    fn get_head_symbol(&self) -> SymbolRef<'a> {
        (*self).get_head_symbol()
    }

    fn iter(&self) -> TermIterator<'a> {
        (*self).iter()
    }

    fn index(&self) -> usize {
        (*self).index()
    }

    fn shared(&self) -> &ATermIndex {
        (*self).shared()
    }

    fn annotation(&self) -> Option<u64> {
        (*self).annotation()
    }

    fn pool(&self) -> &'a TermPool {
        (*self).pool()
    }
}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use super::*;

    #[test]
    fn test_term_iterator() {
        test_logger();
        let pool = TermPool::new();
        let t = pool.from_string("f(g(a),b)").unwrap();

        let result: Vec<String> = t.iter().map(|term| term.to_string()).collect();
        assert_eq!(result, ["f(g(a), b)", "g(a)", "a", "b"]);
    }

    #[test]
    fn test_arguments() {
        let pool = TermPool::new();
        let t = pool.from_string("f(a, g(b), c)").unwrap();

        assert_eq!(t.arguments().len(), 3);
        assert_eq!(t.arg(1).to_string(), "g(b)");
        assert_eq!(t.arg(1).arg(0), pool.from_string("b").unwrap().copy());
        assert_eq!(
            t.arguments().rev().map(|term| term.to_string()).collect::<Vec<_>>(),
            ["c", "g(b)", "a"]
        );
    }

    #[test]
    fn test_handles_keep_subterms_alive() {
        let pool = TermPool::new();

        let argument = {
            let t = pool.from_string("f(g(a))").unwrap();
            t.arg(0).protect()
        };

        pool.collect();
        assert_eq!(argument.to_string(), "g(a)");
        assert_eq!(argument.arg(0).get_head_symbol().name().as_ref(), "a");
    }
}
