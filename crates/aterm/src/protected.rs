#![forbid(unsafe_code)]

use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;
use std::ops::DerefMut;
use std::rc::Rc;

use merc_collections::ProtectionIndex;

use crate::ATermIndex;
use crate::ATermRef;
use crate::Markable;
use crate::Symb;
use crate::SymbolIndex;
use crate::SymbolRef;
use crate::Term;
use crate::TermPool;

/// A container of objects, typically either term indices or objects
/// containing them, that are of trait Markable. The indices stored in the
/// container are kept alive during garbage collection by being in the
/// container itself.
///
/// # Details
///
/// Garbage collection is postponed while a [ProtectedWriteGuard] exists, so
/// terms that are being inserted cannot be removed before they are part of
/// the container.
pub struct Protected<C: Markable + 'static> {
    container: Rc<RefCell<C>>,
    pool: TermPool,
    root: ProtectionIndex,
}

impl<C: Markable + 'static> Protected<C> {
    /// Creates a new Protected container from a given container.
    pub fn new(pool: &TermPool, container: C) -> Protected<C> {
        let shared = Rc::new(RefCell::new(container));
        let root = pool.protect_container(shared.clone());

        Protected {
            container: shared,
            pool: pool.clone(),
            root,
        }
    }

    /// Provides mutable access to the underlying container.
    pub fn write(&mut self) -> ProtectedWriteGuard<'_, C> {
        ProtectedWriteGuard::new(self.container.borrow_mut(), &self.pool)
    }

    /// Provides immutable access to the underlying container.
    pub fn read(&self) -> ProtectedReadGuard<'_, C> {
        ProtectedReadGuard {
            reference: self.container.borrow(),
            pool: &self.pool,
        }
    }

    /// Returns the pool in which the contained terms are stored.
    pub fn pool(&self) -> &TermPool {
        &self.pool
    }
}

impl<C: Default + Markable + 'static> Protected<C> {
    /// Creates a protected container with the default value.
    pub fn with_default(pool: &TermPool) -> Protected<C> {
        Protected::new(pool, C::default())
    }
}

impl<C: Clone + Markable + 'static> Clone for Protected<C> {
    fn clone(&self) -> Self {
        Protected::new(&self.pool, self.container.borrow().clone())
    }
}

impl<C: Hash + Markable + 'static> Hash for Protected<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.container.borrow().hash(state)
    }
}

impl<C: PartialEq + Markable + 'static> PartialEq for Protected<C> {
    fn eq(&self, other: &Self) -> bool {
        self.container.borrow().eq(&other.container.borrow())
    }
}

impl<C: Eq + Markable + 'static> Eq for Protected<C> {}

impl<C: Debug + Markable + 'static> Debug for Protected<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c: &C = &self.container.borrow();
        write!(f, "{c:?}")
    }
}

impl<C: Markable + 'static> Drop for Protected<C> {
    fn drop(&mut self) {
        self.pool.unprotect_container(self.root);
    }
}

/// Mutable access to a [Protected] container.
pub struct ProtectedWriteGuard<'a, C: Markable> {
    reference: RefMut<'a, C>,
    pool: &'a TermPool,

    /// Terms that have been protected during the lifetime of this guard.
    #[cfg(debug_assertions)]
    protected: RefCell<Vec<ATermIndex>>,

    /// Symbols that have been protected during the lifetime of this guard.
    #[cfg(debug_assertions)]
    protected_symbols: RefCell<Vec<SymbolIndex>>,
}

impl<'a, C: Markable> ProtectedWriteGuard<'a, C> {
    fn new(reference: RefMut<'a, C>, pool: &'a TermPool) -> Self {
        pool.lock();

        ProtectedWriteGuard {
            reference,
            pool,
            #[cfg(debug_assertions)]
            protected: RefCell::new(Vec::new()),
            #[cfg(debug_assertions)]
            protected_symbols: RefCell::new(Vec::new()),
        }
    }

    /// Yields the index of a term to insert into the container.
    ///
    /// The resulting index MUST be inserted into the container before the
    /// guard is dropped, this is checked in debug builds.
    pub fn protect<'b, 'c>(&self, term: &'c impl Term<'b, 'c>) -> ATermIndex {
        debug_assert!(term.pool().ptr_eq(self.pool), "The term belongs to a different pool");

        #[cfg(debug_assertions)]
        self.protected.borrow_mut().push(*term.shared());

        *term.shared()
    }

    /// Yields the index of a symbol to insert into the container.
    ///
    /// The resulting index MUST be inserted into the container before the guard is dropped.
    pub fn protect_symbol<'b, 'c>(&self, symbol: &'c impl Symb<'b, 'c>) -> SymbolIndex {
        #[cfg(debug_assertions)]
        self.protected_symbols.borrow_mut().push(*symbol.shared());

        *symbol.shared()
    }

    /// Returns a reference to the term with the given index, which must be contained in the container.
    pub fn term(&self, index: &ATermIndex) -> ATermRef<'_> {
        self.pool.get_term(index)
    }

    /// Returns a reference to the symbol with the given index.
    pub fn symbol(&self, index: &SymbolIndex) -> SymbolRef<'_> {
        self.pool.get_symbol(index)
    }
}

impl<C: Markable> Drop for ProtectedWriteGuard<'_, C> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            for term in self.protected.borrow().iter() {
                debug_assert!(
                    self.reference.contains_term(term),
                    "Term was protected but not actually inserted"
                );
            }

            for symbol in self.protected_symbols.borrow().iter() {
                debug_assert!(
                    self.reference.contains_symbol(symbol),
                    "Symbol was protected but not actually inserted"
                );
            }
        }

        self.pool.unlock();
    }
}

impl<C: Markable> Deref for ProtectedWriteGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.reference
    }
}

impl<C: Markable> DerefMut for ProtectedWriteGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.reference
    }
}

/// Immutable access to a [Protected] container.
pub struct ProtectedReadGuard<'a, C> {
    reference: Ref<'a, C>,
    pool: &'a TermPool,
}

impl<C> ProtectedReadGuard<'_, C> {
    /// Returns a reference to the term with the given index, which must be contained in the container.
    pub fn term(&self, index: &ATermIndex) -> ATermRef<'_> {
        self.pool.get_term(index)
    }

    /// Returns a reference to the symbol with the given index.
    pub fn symbol(&self, index: &SymbolIndex) -> SymbolRef<'_> {
        self.pool.get_symbol(index)
    }
}

impl<C> Deref for ProtectedReadGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use super::*;

    #[test]
    fn test_aterm_container() {
        test_logger();
        let pool = TermPool::new();

        let t = pool.from_string("f(g(a),b)").unwrap();

        // First test the trait for a standard container.
        let mut container = Protected::<Vec<ATermIndex>>::new(&pool, vec![]);

        for _ in 0..1000 {
            let mut write = container.write();
            let index = write.protect(&t);
            write.push(index);
        }

        drop(t);
        pool.collect();

        let read = container.read();
        assert_eq!(read.len(), 1000);
        assert_eq!(read.term(&read[999]).to_string(), "f(g(a), b)");
    }

    #[test]
    fn test_symbol_container() {
        let pool = TermPool::new();
        let mut container = Protected::<Vec<SymbolIndex>>::with_default(&pool);

        {
            let f = pool.create_symbol("container_symbol", 1).unwrap();
            let mut write = container.write();
            let index = write.protect_symbol(&f);
            write.push(index);
        }

        pool.collect();
        let read = container.read();
        assert_eq!(read.symbol(&read[0]).name().as_ref(), "container_symbol");
    }
}
