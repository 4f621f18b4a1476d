use std::fmt;
use std::hash::Hash;
use std::ops::Deref;

use merc_utilities::GenerationCounter;
use merc_utilities::GenerationalIndex;

/// A type-safe index for the ProtectionSet to prevent accidental use of wrong indices
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProtectionIndex(GenerationalIndex<usize>);

impl Deref for ProtectionIndex {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ProtectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtectionIndex({:?})", self.0)
    }
}

impl fmt::Display for ProtectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A collection that assigns a unique index to every object added to it, and allows
/// removing objects while reusing their indices later. The term pool keeps its
/// roots in a protection set, every root stays alive until it is unprotected.
/// It is similar to an [crate::IndexedSet], except that elements cannot be looked up by value.
#[derive(Debug, Default)]
pub struct ProtectionSet<T> {
    roots: Vec<Entry<T>>, // The set of root active nodes.
    free: Option<usize>,
    size: usize,
    maximum_size: usize,
    /// The number of generations
    generation_counter: GenerationCounter,
}

#[derive(Debug)]
enum Entry<T> {
    Filled(T),
    Free(usize),
}

impl<T> ProtectionSet<T> {
    /// Creates a new empty protection set.
    pub fn new() -> Self {
        ProtectionSet {
            roots: Vec::new(),
            free: None,
            size: 0,
            maximum_size: 0,
            generation_counter: GenerationCounter::new(),
        }
    }

    /// Returns the maximum number of roots that were protected at the same time.
    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    /// Returns the number of roots in the protection set
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns whether the protection set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all root indices in the protection set.
    pub fn iter(&self) -> ProtSetIter<'_, T> {
        ProtSetIter {
            current: 0,
            protection_set: self,
            generation_counter: &self.generation_counter,
        }
    }

    /// Adds the given object to the protection set and returns its index.
    pub fn protect(&mut self, object: T) -> ProtectionIndex {
        self.size += 1;
        self.maximum_size = self.maximum_size.max(self.size);

        let index = match self.free {
            Some(first) => {
                match &self.roots[first] {
                    Entry::Free(next) => {
                        if first == *next {
                            // The list is empty as its first element points to itself.
                            self.free = None;
                        } else {
                            // Update free to be the next element in the list.
                            self.free = Some(*next);
                        }
                    }
                    Entry::Filled(_) => {
                        panic!("The free list should not point a filled entry");
                    }
                }

                self.roots[first] = Entry::Filled(object);
                first
            }
            None => {
                // If free list is empty insert new entry into roots.
                self.roots.push(Entry::Filled(object));
                let index = self.roots.len() - 1;

                // Postcondition: verify the object was correctly added
                debug_assert!(
                    matches!(self.roots[index], Entry::Filled(_)),
                    "Failed to add object to protection set"
                );

                index
            }
        };

        ProtectionIndex(self.generation_counter.create_index(index))
    }

    /// Remove protection from the given object. Note that index must be the
    /// index returned by the [ProtectionSet::protect] call.
    pub fn unprotect(&mut self, index: ProtectionIndex) {
        let index = self.generation_counter.get_index(index.0);

        debug_assert!(
            matches!(self.roots[index], Entry::Filled(_)),
            "Index {index} is does not point to a filled entry"
        );

        self.size -= 1;

        match self.free {
            Some(next) => {
                self.roots[index] = Entry::Free(next);
            }
            None => {
                self.roots[index] = Entry::Free(index);
            }
        };

        self.free = Some(index);

        // Postcondition: verify the object was correctly removed from protection
        debug_assert!(
            matches!(self.roots[index], Entry::Free(_)),
            "Failed to unprotect object"
        );
    }
}

/// Iterates over the protected objects together with their indices.
pub struct ProtSetIter<'a, T> {
    current: usize,
    protection_set: &'a ProtectionSet<T>,
    generation_counter: &'a GenerationCounter,
}

impl<'a, T> Iterator for ProtSetIter<'a, T> {
    type Item = (ProtectionIndex, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        // Find the next valid entry, return it when found or None when end of roots is reached.
        while self.current < self.protection_set.roots.len() {
            let idx = self.current;
            self.current += 1;

            if let Entry::Filled(object) = &self.protection_set.roots[idx] {
                return Some((ProtectionIndex(self.generation_counter.recall_index(idx)), object));
            }
        }

        None
    }
}

impl<'a, T> IntoIterator for &'a ProtectionSet<T> {
    type Item = (ProtectionIndex, &'a T);
    type IntoIter = ProtSetIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;

    use merc_utilities::random_test;
    use merc_utilities::test_logger;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_protection_set() {
        random_test(100, |rng| {
            let mut protection_set = ProtectionSet::<usize>::new();

            // Protect a number of values and record their roots.
            let mut roots: Vec<(ProtectionIndex, usize)> = Vec::new();

            for _ in 0..5000 {
                let value = rng.random_range(0..1000);
                roots.push((protection_set.protect(value), value));
            }

            // Unprotect a number of roots.
            for (index, _) in roots.drain(..2500) {
                protection_set.unprotect(index);
            }

            // Protect more to test the freelist
            for _ in 0..1000 {
                let value = rng.random_range(0..1000);
                roots.push((protection_set.protect(value), value));
            }

            let mut expected: Vec<usize> = roots.iter().map(|(_, value)| *value).collect();
            let mut remaining: Vec<usize> = protection_set.iter().map(|(_, value)| *value).collect();
            expected.sort_unstable();
            remaining.sort_unstable();

            assert_eq!(remaining, expected, "Exactly the roots that were not unprotected remain");
            assert_eq!(protection_set.maximum_size(), 5000);
            assert_eq!(protection_set.len(), 3500);
            assert!(!protection_set.is_empty());
        });
    }

    #[test]
    fn test_protection_set_basic() {
        test_logger();

        let mut set = ProtectionSet::<String>::new();

        let first = set.protect(String::from("value1"));
        set.protect(String::from("value2"));
        assert_eq!(set.len(), 2);

        set.unprotect(first);
        let values: Vec<&str> = set.iter().map(|(_, value)| value.as_str()).collect();
        assert_eq!(values, ["value2"]);

        // The freed slot is reused.
        set.protect(String::from("value3"));
        let values: Vec<&str> = set.iter().map(|(_, value)| value.as_str()).collect();
        assert_eq!(values, ["value3", "value2"]);
        assert_eq!(set.maximum_size(), 2);
    }
}
