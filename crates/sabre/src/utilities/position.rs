//! Module for storing positions of terms
#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::fmt;

use smallvec::SmallVec;
use smallvec::smallvec;

use merc_aterm::ATermRef;
use merc_aterm::Term;

/// An ExplicitPosition stores a list of position indices. The index starts at 1.
/// The subterm of term s(s(0)) at position 1.1 is 0.
/// The empty position, aka the root term, is represented by the symbol ε.
/// Indices are stored in a SmallVec, which is configured to store 4 elements.
/// If the position contains a maximum of 4 elements it is stored on the stack.
/// If the position is longer a heap allocation is made.
#[repr(transparent)]
#[derive(Hash, Clone, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct ExplicitPosition {
    indices: SmallVec<[usize; 4]>,
}

impl ExplicitPosition {
    /// Creates a new ExplicitPosition from a slice of indices.
    pub fn new(indices: &[usize]) -> Self {
        debug_assert!(indices.iter().all(|i| *i > 0), "Positions are 1 indexed");
        Self {
            indices: SmallVec::from(indices),
        }
    }

    /// Create the empty position.
    pub fn empty() -> Self {
        Self { indices: smallvec![] }
    }

    /// Returns the length of the position indices
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns the indices of the position.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns true iff the position is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.len() == 0
    }

    /// Add the index to the position.
    pub fn push(&mut self, index: usize) {
        debug_assert!(index > 0, "Positions are 1 indexed");
        self.indices.push(index);
    }
}

/// Returns the subterm at the given position.
pub trait PositionIndexed<'a> {
    /// Returns the subterm at the given position, panics when the position does not exist.
    fn get_position(&self, position: &ExplicitPosition) -> ATermRef<'a>;
}

impl<'a> PositionIndexed<'a> for ATermRef<'a> {
    fn get_position(&self, position: &ExplicitPosition) -> ATermRef<'a> {
        let mut result = *self;

        for index in &position.indices {
            result = result.arg(index - 1); // Note that positions are 1 indexed.
        }

        result
    }
}

impl fmt::Display for ExplicitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Debug for ExplicitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indices.is_empty() {
            write!(f, "ε")?;
        } else {
            let mut first = true;
            for p in &self.indices {
                if first {
                    write!(f, "{p}")?;
                    first = false;
                } else {
                    write!(f, ".{p}")?;
                }
            }
        }

        Ok(())
    }
}

/// An iterator over all (term, position) pairs of the given ATerm in breadth-first order.
pub struct PositionIterator<'a> {
    queue: VecDeque<(ATermRef<'a>, ExplicitPosition)>,
}

impl<'a> PositionIterator<'a> {
    pub fn new(t: ATermRef<'a>) -> PositionIterator<'a> {
        PositionIterator {
            queue: VecDeque::from([(t, ExplicitPosition::empty())]),
        }
    }
}

impl<'a> Iterator for PositionIterator<'a> {
    type Item = (ATermRef<'a>, ExplicitPosition);

    fn next(&mut self) -> Option<Self::Item> {
        // Get a subterm to inspect
        let (term, pos) = self.queue.pop_front()?;

        // Put subterms in the queue
        for (i, argument) in term.arguments().enumerate() {
            let mut new_position = pos.clone();
            new_position.push(i + 1);
            self.queue.push_back((argument, new_position));
        }

        Some((term, pos))
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use super::*;

    #[test]
    fn test_get_position() {
        let pool = TermPool::new();
        let t = pool.from_string("f(g(a),b)").unwrap();
        let expected = pool.from_string("a").unwrap();

        assert_eq!(t.copy().get_position(&ExplicitPosition::new(&[1, 1])), expected.copy());
    }

    #[test]
    fn test_position_iterator() {
        let pool = TermPool::new();
        let t = pool.from_string("f(g(a),b)").unwrap();

        for (term, pos) in PositionIterator::new(t.copy()) {
            assert_eq!(
                t.copy().get_position(&pos),
                term,
                "The resulting (subterm, position) pair doesn't match the get_position implementation"
            );
        }

        assert_eq!(
            PositionIterator::new(t.copy()).count(),
            4,
            "The number of subterms doesn't match the expected value"
        );
    }

    #[test]
    fn test_position_display() {
        assert_eq!(ExplicitPosition::empty().to_string(), "ε");
        assert_eq!(ExplicitPosition::new(&[1, 2]).to_string(), "1.2");
    }
}
