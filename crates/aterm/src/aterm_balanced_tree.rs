//!
//! A fixed size sequence of terms that is stored as a balanced binary tree,
//! such that sequences that differ in few elements share most of their
//! structure in the term pool.
//!
#![forbid(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use delegate::delegate;
use itertools::Itertools;

use crate::ATerm;
use crate::ATermArgs;
use crate::ATermIndex;
use crate::ATermRef;
use crate::Symb;
use crate::SymbolRef;
use crate::Term;
use crate::TermIterator;
use crate::TermPool;

/// Returns true iff the term is an inner node of a balanced tree.
pub fn is_tree_node_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    let pool = t.pool();
    *pool.reserved_tree_node_symbol() == *t.get_head_symbol().shared()
}

/// Returns true iff the term is the empty balanced tree.
pub fn is_tree_empty_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    let pool = t.pool();
    *pool.reserved_tree_empty_symbol() == *t.get_head_symbol().shared()
}

/// A sequence of terms of type T represented by a balanced binary tree.
///
/// # Details
///
/// A sequence of length n is split into a left subtree with the first
/// `ceil(n/2)` elements and a right subtree with the remaining `floor(n/2)`
/// elements. A single element is stored as itself, and the empty sequence is
/// the reserved empty tree. Since this shape only depends on the sequence,
/// equal sequences are represented by the same term.
///
/// The number of elements is not part of the term, and it is only remembered
/// by this handle.
pub struct ATermBalancedTree<T> {
    term: ATerm,
    size: usize,
    _marker: PhantomData<T>,
}

impl<T> ATermBalancedTree<T> {
    /// Creates a balanced tree containing the given elements in order.
    pub fn new<I>(pool: &TermPool, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ATerm>,
    {
        let elements: Vec<ATerm> = elements.into_iter().map(Into::into).collect();
        debug_assert!(
            elements
                .iter()
                .all(|element| !is_tree_node_term(element) && !is_tree_empty_term(element)),
            "The elements of a balanced tree cannot be balanced trees themselves"
        );

        ATermBalancedTree {
            term: build_tree(pool, &elements),
            size: elements.len(),
            _marker: PhantomData,
        }
    }

    /// Creates the empty tree.
    pub fn empty(pool: &TermPool) -> Self {
        ATermBalancedTree {
            term: pool.tree_empty().protect(),
            size: 0,
            _marker: PhantomData,
        }
    }

    /// Interprets the given term as a balanced tree, computes its size in linear time.
    pub fn from_term(term: ATerm) -> Self {
        let size = tree_size(term.copy());
        ATermBalancedTree {
            term,
            size,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements by traversing the whole tree, which takes linear time.
    pub fn size(&self) -> usize {
        tree_size(self.term.copy())
    }

    /// Returns the number of elements that this tree was created with.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true iff the tree has no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the element at the given index in logarithmic time.
    ///
    /// # Panics
    ///
    /// When the given size is not the number of elements, or the index is out of bounds.
    pub fn element_at(&self, index: usize, size: usize) -> ATermRef<'_> {
        assert_eq!(size, self.size, "The size {size} does not match the tree of size {}", self.size);
        assert!(index < size, "Index {index} out of bounds for tree of size {size}");

        let mut term = self.term.copy();
        let mut index = index;
        let mut size = size;

        while size > 1 {
            let left_size = size.div_ceil(2);
            if index < left_size {
                term = term.arg(0);
                size = left_size;
            } else {
                term = term.arg(1);
                index -= left_size;
                size -= left_size;
            }
        }

        term
    }

    /// Returns the element at the given index, computes the size first and therefore takes linear time.
    pub fn get(&self, index: usize) -> ATermRef<'_> {
        let size = self.size();
        self.element_at(index, size)
    }

    /// Returns an iterator over the elements from left to right.
    pub fn iter(&self) -> ATermBalancedTreeIter<'_> {
        ATermBalancedTreeIter::new(self.term.copy())
    }
}

impl<T: From<ATerm>> ATermBalancedTree<T> {
    /// Returns the elements of the tree in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().map(|element| element.protect().into()).collect()
    }
}

/// Constructs the tree for the given elements, see [ATermBalancedTree].
fn build_tree(pool: &TermPool, elements: &[ATerm]) -> ATerm {
    match elements.len() {
        0 => pool.tree_empty().protect(),
        1 => elements[0].clone(),
        n => {
            let (left, right) = elements.split_at(n.div_ceil(2));
            let left = build_tree(pool, left);
            let right = build_tree(pool, right);

            pool.create_term_indices(pool.reserved_tree_node_symbol(), &[*left.shared(), *right.shared()])
        }
    }
}

/// Counts the number of elements in the tree by descending into every node.
fn tree_size(term: ATermRef<'_>) -> usize {
    let mut size = 0;
    let mut stack = vec![term];

    while let Some(term) = stack.pop() {
        if is_tree_node_term(&term) {
            stack.push(term.arg(0));
            stack.push(term.arg(1));
        } else if !is_tree_empty_term(&term) {
            size += 1;
        }
    }

    size
}

impl<'a, 'b, T> Term<'a, 'b> for ATermBalancedTree<T>
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

impl<T> Clone for ATermBalancedTree<T> {
    fn clone(&self) -> Self {
        ATermBalancedTree {
            term: self.term.clone(),
            size: self.size,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ATermBalancedTree<T> {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl<T> Eq for ATermBalancedTree<T> {}

impl<T> std::hash::Hash for ATermBalancedTree<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.term.hash(state)
    }
}

impl<T> From<ATermBalancedTree<T>> for ATerm {
    fn from(value: ATermBalancedTree<T>) -> Self {
        value.term
    }
}

impl<T> fmt::Display for ATermBalancedTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.iter().format(","))
    }
}

impl<T> fmt::Debug for ATermBalancedTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

/// Iterates over the elements of a balanced tree from left to right. Keeps a
/// stack of the right subtrees that still have to be visited.
pub struct ATermBalancedTreeIter<'a> {
    stack: Vec<ATermRef<'a>>,
}

impl<'a> ATermBalancedTreeIter<'a> {
    fn new(term: ATermRef<'a>) -> Self {
        let stack = if is_tree_empty_term(&term) { Vec::new() } else { vec![term] };
        ATermBalancedTreeIter { stack }
    }
}

impl<'a> Iterator for ATermBalancedTreeIter<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut term = self.stack.pop()?;

        // Descend to the leftmost element, remembering the right subtrees.
        while is_tree_node_term(&term) {
            self.stack.push(term.arg(1));
            term = term.arg(0);
        }

        Some(term)
    }
}

#[cfg(test)]
mod tests {
    use merc_utilities::random_test;
    use rand::Rng;
    use test_log::test;

    use crate::random_term;

    use super::*;

    fn constants(pool: &TermPool, names: &[&str]) -> Vec<ATerm> {
        names.iter().map(|name| pool.from_string(name).unwrap()).collect()
    }

    #[test]
    fn test_balanced_tree_five_elements() {
        let pool = TermPool::new();
        let elements = constants(&pool, &["a", "b", "c", "d", "e"]);
        let tree = ATermBalancedTree::new(&pool, elements.clone());

        assert_eq!(tree.size(), 5);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.element_at(2, 5), elements[2].copy());
        assert_eq!(tree.get(4), elements[4].copy());

        let iterated: Vec<String> = tree.iter().map(|t| t.to_string()).collect();
        assert_eq!(iterated, ["a", "b", "c", "d", "e"]);

        // The left subtree contains the first three elements.
        assert_eq!(tree.copy().to_string(), "@node@(@node@(@node@(a, b), c), @node@(d, e))");
    }

    #[test]
    fn test_balanced_tree_small() {
        let pool = TermPool::new();

        let empty = ATermBalancedTree::<ATerm>::new(&pool, Vec::new());
        assert_eq!(empty.size(), 0);
        assert!(empty.is_empty());
        assert_eq!(empty.iter().count(), 0);
        assert_eq!(empty, ATermBalancedTree::empty(&pool));

        let single = ATermBalancedTree::new(&pool, constants(&pool, &["a"]));
        assert_eq!(single.size(), 1);
        assert_eq!(single.copy(), pool.from_string("a").unwrap().copy(), "A single element is not wrapped");
        assert_eq!(single.element_at(0, 1).to_string(), "a");
    }

    #[test]
    #[should_panic]
    fn test_balanced_tree_wrong_size() {
        let pool = TermPool::new();
        let tree = ATermBalancedTree::new(&pool, constants(&pool, &["a", "b", "c"]));

        tree.element_at(0, 4);
    }

    #[test]
    fn test_random_balanced_tree() {
        random_test(100, |rng| {
            let pool = TermPool::new();
            let length = rng.random_range(0..50);

            let elements: Vec<ATerm> = (0..length)
                .map(|_| random_term(&pool, rng, &[("f".into(), 2)], &["a".into(), "b".into()], 3))
                .collect();

            let tree = ATermBalancedTree::new(&pool, elements.clone());
            assert_eq!(tree.size(), elements.len());

            for (index, element) in elements.iter().enumerate() {
                assert_eq!(tree.element_at(index, length), element.copy());
            }

            let iterated: Vec<ATerm> = tree.to_vec();
            assert_eq!(iterated, elements);

            // Equal sequences yield the same term.
            let other = ATermBalancedTree::new(&pool, elements.clone());
            assert_eq!(tree, other);
            assert_eq!(ATermBalancedTree::<ATerm>::from_term(other.into()).len(), length);
        });
    }
}
