use std::cell::Cell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use bitvec::vec::BitVec;
use log::debug;
use log::info;
use smallvec::SmallVec;
use thiserror::Error;

use merc_collections::IndexedSet;
use merc_collections::ProtectionIndex;
use merc_collections::ProtectionSet;
use merc_io::LargeFormatter;
use merc_utilities::MercError;
use merc_utilities::debug_trace;

use crate::ATerm;
use crate::ATermIndex;
use crate::ATermRef;
use crate::Markable;
use crate::Symb;
use crate::Symbol;
use crate::SymbolIndex;
use crate::SymbolRef;
use crate::Term;
use crate::parse_term;
use crate::storage::SharedTerm;
use crate::storage::SharedTermLookup;
use crate::storage::SymbolPool;

/// The name of the symbol used for integer terms.
pub const INT_SYMBOL_NAME: &str = "<aterm_int>";

/// The name of the symbol used for list cells.
pub const LIST_SYMBOL_NAME: &str = "<list_constructor>";

/// The name of the symbol used for the empty list.
pub const EMPTY_LIST_SYMBOL_NAME: &str = "<empty_list>";

/// The name of the symbol used for the nodes of balanced trees.
pub const TREE_NODE_SYMBOL_NAME: &str = "@node@";

/// The name of the symbol used for the empty balanced tree.
pub const TREE_EMPTY_SYMBOL_NAME: &str = "@empty@";

/// Errors that can occur when creating symbols.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TermPoolError {
    #[error("Symbol {name} has arity {arity}, which exceeds the maximum arity {maximum}")]
    ArityTooLarge { name: String, arity: usize, maximum: usize },
}

/// The configuration of a [TermPool].
#[derive(Clone, Debug)]
pub struct TermPoolConfig {
    /// The largest arity that a function symbol can have.
    pub max_arity: usize,

    /// The number of newly created terms after which the first garbage collection is performed.
    pub gc_initial_threshold: usize,

    /// Enables garbage collection when the number of created terms crosses the threshold.
    pub automatic_gc: bool,
}

impl Default for TermPoolConfig {
    fn default() -> Self {
        Self {
            max_arity: u16::MAX as usize,
            gc_initial_threshold: 1000,
            automatic_gc: true,
        }
    }
}

/// The term pool stores all terms and function symbols, and ensures that
/// terms are maximally shared: constructing a term that already exists
/// returns the existing term.
///
/// # Details
///
/// The pool is a context value that is cheap to clone, all clones refer to
/// the same storage. It is confined to the thread that created it, since
/// terms and symbols carry reference counts without synchronisation.
///
/// Terms are kept alive by [ATerm] handles, by being the argument of a live
/// term, or by being stored in a [crate::Protected] container. All other
/// terms are removed by [TermPool::collect], which is also called
/// automatically when sufficiently many terms have been created.
#[derive(Clone)]
pub struct TermPool {
    inner: Rc<TermPoolInner>,
}

struct TermPoolInner {
    storage: RefCell<TermStorage>,

    /// The number of active write guards of protected containers. Garbage
    /// collection is postponed while it is positive.
    locks: Cell<usize>,

    /// The symbols that have a special meaning in the pool.
    reserved: ReservedSymbols,
}

/// The indices of the reserved symbols and terms, these are never collected.
#[derive(Clone, Copy)]
struct ReservedSymbols {
    int_symbol: SymbolIndex,
    list_symbol: SymbolIndex,
    empty_list_symbol: SymbolIndex,
    tree_node_symbol: SymbolIndex,
    tree_empty_symbol: SymbolIndex,
    empty_list: ATermIndex,
    tree_empty: ATermIndex,
}

struct TermStorage {
    terms: IndexedSet<SharedTerm>,
    symbols: SymbolPool,

    /// The protected containers, these are marked during garbage collection.
    containers: ProtectionSet<Rc<dyn Markable>>,

    /// Data structures used for marking, kept to avoid reallocations.
    marked_terms: BitVec,
    marked_symbols: BitVec,
    stack: Vec<ATermIndex>,

    /// The number of terms that can be created before the next garbage collection.
    countdown: usize,
    number_of_collections: usize,
    config: TermPoolConfig,
}

impl TermPool {
    /// Creates a new term pool with the default configuration.
    pub fn new() -> TermPool {
        Self::with_config(TermPoolConfig::default())
    }

    /// Creates a new term pool with the given configuration.
    pub fn with_config(config: TermPoolConfig) -> TermPool {
        let mut storage = TermStorage {
            terms: IndexedSet::new(),
            symbols: SymbolPool::new(),
            containers: ProtectionSet::new(),
            marked_terms: BitVec::new(),
            marked_symbols: BitVec::new(),
            stack: Vec::new(),
            countdown: config.gc_initial_threshold,
            number_of_collections: 0,
            config,
        };

        // The reserved symbols and terms receive an additional reference that is never released.
        let mut reserve_symbol = |name: &str, arity: usize| {
            let index = storage.symbols.create(name, arity);
            storage.symbols.get(&index).increment();
            index
        };

        let int_symbol = reserve_symbol(INT_SYMBOL_NAME, 0);
        let list_symbol = reserve_symbol(LIST_SYMBOL_NAME, 2);
        let empty_list_symbol = reserve_symbol(EMPTY_LIST_SYMBOL_NAME, 0);
        let tree_node_symbol = reserve_symbol(TREE_NODE_SYMBOL_NAME, 2);
        let tree_empty_symbol = reserve_symbol(TREE_EMPTY_SYMBOL_NAME, 0);

        let (empty_list, _) = storage.insert(empty_list_symbol, &[], None);
        storage.terms[empty_list.set_index()].increment();
        let (tree_empty, _) = storage.insert(tree_empty_symbol, &[], None);
        storage.terms[tree_empty.set_index()].increment();

        TermPool {
            inner: Rc::new(TermPoolInner {
                storage: RefCell::new(storage),
                locks: Cell::new(0),
                reserved: ReservedSymbols {
                    int_symbol,
                    list_symbol,
                    empty_list_symbol,
                    tree_node_symbol,
                    tree_empty_symbol,
                    empty_list,
                    tree_empty,
                },
            }),
        }
    }

    /// Returns the function symbol with the given name and arity, creating it on first use.
    pub fn create_symbol(&self, name: impl AsRef<str>, arity: usize) -> Result<Symbol, TermPoolError> {
        let name = name.as_ref();
        let index = {
            let mut storage = self.inner.storage.borrow_mut();
            if arity > storage.config.max_arity {
                return Err(TermPoolError::ArityTooLarge {
                    name: name.to_string(),
                    arity,
                    maximum: storage.config.max_arity,
                });
            }

            let index = storage.symbols.create(name, arity);
            storage.symbols.get(&index).increment();
            index
        };

        Ok(Symbol::from_index(self.clone(), index))
    }

    /// Creates a term with the given head symbol and arguments.
    ///
    /// # Panics
    ///
    /// When the number of arguments differs from the arity of the symbol.
    pub fn create_term<'a, 'b, 'c, 'd>(&self, symbol: &impl Symb<'a, 'b>, arguments: &[impl Term<'c, 'd>]) -> ATerm {
        let indices: SmallVec<[ATermIndex; 8]> = arguments.iter().map(|argument| *argument.shared()).collect();
        self.create_term_indices(symbol.shared(), &indices)
    }

    /// Creates a term with the given head symbol and the arguments produced by the iterator.
    pub fn create_term_iter<'a, 'b, 'c, 'd, I, T>(&self, symbol: &impl Symb<'a, 'b>, iter: I) -> ATerm
    where
        I: IntoIterator<Item = T>,
        T: Term<'c, 'd>,
    {
        // The arguments are kept until the term has been created, since the iterator might produce the only handles.
        let arguments: SmallVec<[T; 8]> = iter.into_iter().collect();
        self.create_term(symbol, &arguments)
    }

    /// Creates a constant, i.e., a term without arguments.
    pub fn create_constant<'a, 'b>(&self, symbol: &impl Symb<'a, 'b>) -> ATerm {
        self.create_term_indices(symbol.shared(), &[])
    }

    /// Creates a term that stores the given integer.
    pub fn create_int(&self, value: u64) -> ATerm {
        let index = self.insert_term(self.inner.reserved.int_symbol, &[], Some(value));
        ATerm::from_index(self.clone(), index)
    }

    /// Creates the list term `[items[0], ..., items[n-1]]`.
    pub fn create_list<'a, 'b>(&self, items: &[impl Term<'a, 'b>]) -> ATerm {
        let mut list = self.empty_list().protect();
        for item in items.iter().rev() {
            list = self.create_term_indices(self.reserved_list_symbol(), &[*item.shared(), *list.shared()]);
        }
        list
    }

    /// Parses the given text into a term, see [parse_term].
    pub fn from_string(&self, text: &str) -> Result<ATerm, MercError> {
        parse_term(self, text)
    }

    /// Returns a handle to the term with the given index.
    ///
    /// The caller must ensure that the term is kept alive, for example because
    /// the index is stored in a [crate::Protected] container.
    pub(crate) fn get_term(&self, index: &ATermIndex) -> ATermRef<'_> {
        ATermRef::from_index(self, *index)
    }

    /// Returns a handle to the symbol with the given index.
    pub fn get_symbol(&self, index: &SymbolIndex) -> SymbolRef<'_> {
        SymbolRef::from_index(self, *index)
    }

    /// Removes all terms and symbols that are no longer reachable.
    ///
    /// Returns false when the collection had to be postponed because a
    /// protected container is being modified.
    pub fn collect(&self) -> bool {
        if self.inner.locks.get() > 0 {
            debug!("Garbage collection postponed, a protected container is being modified");
            return false;
        }

        self.inner.storage.borrow_mut().collect();
        true
    }

    /// Returns the number of terms in the pool.
    pub fn len(&self) -> usize {
        self.inner.storage.borrow().terms.len()
    }

    /// Returns true iff the pool contains no terms.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of function symbols in the pool.
    pub fn number_of_symbols(&self) -> usize {
        self.inner.storage.borrow().symbols.len()
    }

    /// Returns the metrics of the pool, can be formatted and written to output.
    pub fn metrics(&self) -> TermPoolMetrics {
        let storage = self.inner.storage.borrow();
        TermPoolMetrics {
            terms: storage.terms.len(),
            symbols: storage.symbols.len(),
            containers: storage.containers.len(),
            maximum_containers: storage.containers.maximum_size(),
            collections: storage.number_of_collections,
        }
    }

    /// Returns true iff both values refer to the same pool.
    pub fn ptr_eq(&self, other: &TermPool) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Performs a final garbage collection and reports the metrics of the pool.
    pub fn shutdown(self) {
        self.collect();
        info!("{}", self.metrics());
    }

    /// Returns the symbol used for integer terms.
    pub fn int_symbol(&self) -> SymbolRef<'_> {
        self.get_symbol(&self.inner.reserved.int_symbol)
    }

    /// Returns the symbol used for list cells.
    pub fn list_symbol(&self) -> SymbolRef<'_> {
        self.get_symbol(&self.inner.reserved.list_symbol)
    }

    /// Returns the symbol used for the empty list.
    pub fn empty_list_symbol(&self) -> SymbolRef<'_> {
        self.get_symbol(&self.inner.reserved.empty_list_symbol)
    }

    /// Returns the symbol used for the nodes of balanced trees.
    pub fn tree_node_symbol(&self) -> SymbolRef<'_> {
        self.get_symbol(&self.inner.reserved.tree_node_symbol)
    }

    /// Returns the symbol used for the empty balanced tree.
    pub fn tree_empty_symbol(&self) -> SymbolRef<'_> {
        self.get_symbol(&self.inner.reserved.tree_empty_symbol)
    }

    /// Returns the empty list.
    pub fn empty_list(&self) -> ATermRef<'_> {
        self.get_term(&self.inner.reserved.empty_list)
    }

    /// Returns the empty balanced tree.
    pub fn tree_empty(&self) -> ATermRef<'_> {
        self.get_term(&self.inner.reserved.tree_empty)
    }

    /// Creates a term from the indices of its symbol and arguments.
    pub(crate) fn create_term_indices(&self, symbol: &SymbolIndex, arguments: &[ATermIndex]) -> ATerm {
        let arity = self.symbol_arity(symbol);
        assert_eq!(
            arity,
            arguments.len(),
            "Symbol {} has arity {arity} but {} arguments were given",
            self.symbol_name(symbol),
            arguments.len()
        );

        let index = self.insert_term(*symbol, arguments, None);
        ATerm::from_index(self.clone(), index)
    }

    /// Inserts the term into the storage, returns its index with one additional reference.
    fn insert_term(&self, symbol: SymbolIndex, arguments: &[ATermIndex], annotation: Option<u64>) -> ATermIndex {
        let (index, inserted) = {
            let mut storage = self.inner.storage.borrow_mut();
            let (index, inserted) = storage.insert(symbol, arguments, annotation);
            storage.terms[index.set_index()].increment();
            (index, inserted)
        };

        if inserted {
            self.trigger_garbage_collection();
        }

        index
    }

    /// Counts down the number of created terms, and collects garbage when the threshold is reached.
    fn trigger_garbage_collection(&self) {
        let mut storage = self.inner.storage.borrow_mut();
        storage.countdown = storage.countdown.saturating_sub(1);

        if storage.countdown == 0 && storage.config.automatic_gc {
            if self.inner.locks.get() > 0 {
                // The countdown stays at zero, so the next created term tries again.
                debug_trace!("Garbage collection postponed");
                return;
            }

            storage.collect();
        }
    }

    /// Protects the given term by creating a new handle for it.
    pub(crate) fn protect(&self, index: &ATermIndex) -> ATerm {
        self.inner.storage.borrow().terms[index.set_index()].increment();
        ATerm::from_index(self.clone(), *index)
    }

    /// Releases a handle to the given term.
    pub(crate) fn release(&self, index: &ATermIndex) {
        self.inner.storage.borrow().terms[index.set_index()].decrement();
    }

    /// Protects the given symbol by creating a new handle for it.
    pub(crate) fn protect_symbol(&self, index: &SymbolIndex) -> Symbol {
        self.inner.storage.borrow().symbols.get(index).increment();
        Symbol::from_index(self.clone(), *index)
    }

    /// Releases a handle to the given symbol.
    pub(crate) fn release_symbol(&self, index: &SymbolIndex) {
        self.inner.storage.borrow().symbols.get(index).decrement();
    }

    /// Registers a container whose terms are marked during garbage collection.
    pub(crate) fn protect_container(&self, container: Rc<dyn Markable>) -> ProtectionIndex {
        let root = self.inner.storage.borrow_mut().containers.protect(container);
        debug_trace!("Protected container index {}", root);
        root
    }

    /// Removes the container with the given root.
    pub(crate) fn unprotect_container(&self, root: ProtectionIndex) {
        debug_trace!("Unprotected container index {}", root);
        self.inner.storage.borrow_mut().containers.unprotect(root);
    }

    /// Postpones garbage collection until the matching [TermPool::unlock].
    pub(crate) fn lock(&self) {
        self.inner.locks.set(self.inner.locks.get() + 1);
    }

    pub(crate) fn unlock(&self) {
        let locks = self.inner.locks.get();
        debug_assert!(locks > 0, "Unbalanced unlock of the term pool");
        self.inner.locks.set(locks - 1);
    }

    pub(crate) fn argument(&self, term: &ATermIndex, index: usize) -> ATermIndex {
        self.inner.storage.borrow().terms[term.set_index()].arguments()[index]
    }

    pub(crate) fn head_symbol(&self, term: &ATermIndex) -> SymbolIndex {
        *self.inner.storage.borrow().terms[term.set_index()].symbol()
    }

    pub(crate) fn annotation(&self, term: &ATermIndex) -> Option<u64> {
        self.inner.storage.borrow().terms[term.set_index()].annotation()
    }

    pub(crate) fn symbol_name(&self, symbol: &SymbolIndex) -> Rc<str> {
        self.inner.storage.borrow().symbols.get(symbol).name().clone()
    }

    pub(crate) fn symbol_arity(&self, symbol: &SymbolIndex) -> usize {
        self.inner.storage.borrow().symbols.get(symbol).arity()
    }

    pub(crate) fn reserved_int_symbol(&self) -> &SymbolIndex {
        &self.inner.reserved.int_symbol
    }

    pub(crate) fn reserved_list_symbol(&self) -> &SymbolIndex {
        &self.inner.reserved.list_symbol
    }

    pub(crate) fn reserved_empty_list_symbol(&self) -> &SymbolIndex {
        &self.inner.reserved.empty_list_symbol
    }

    pub(crate) fn reserved_tree_node_symbol(&self) -> &SymbolIndex {
        &self.inner.reserved.tree_node_symbol
    }

    pub(crate) fn reserved_tree_empty_symbol(&self) -> &SymbolIndex {
        &self.inner.reserved.tree_empty_symbol
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermPool({})", self.metrics())
    }
}

impl Drop for TermPoolInner {
    fn drop(&mut self) {
        debug!("{}", self.storage.borrow().metrics_line());
    }
}

impl TermStorage {
    /// Inserts the term, returns its index and whether it was newly created.
    fn insert(&mut self, symbol: SymbolIndex, arguments: &[ATermIndex], annotation: Option<u64>) -> (ATermIndex, bool) {
        let (index, inserted) = self.terms.insert_equiv(&SharedTermLookup {
            symbol,
            arguments,
            annotation,
        });

        if inserted {
            // Every term keeps its head symbol alive.
            self.symbols.get(&symbol).increment();
        }

        (ATermIndex::new(index), inserted)
    }

    /// Marks all reachable terms and removes the others.
    fn collect(&mut self) {
        self.number_of_collections += 1;

        self.marked_terms.clear();
        self.marked_terms.resize(self.terms.slots(), false);
        self.marked_symbols.clear();
        self.marked_symbols.resize(self.symbols.slots(), false);
        self.stack.clear();

        let mark_time = Instant::now();

        let mut marker = Marker {
            terms: &self.terms,
            marked_terms: &mut self.marked_terms,
            marked_symbols: &mut self.marked_symbols,
            stack: &mut self.stack,
        };

        // Terms with handles are roots.
        for (index, term) in self.terms.iter() {
            if term.reference_count() > 0 {
                marker.mark(&ATermIndex::new(index));
            }
        }

        for (_root, container) in self.containers.iter() {
            debug_trace!("Marking container {_root}");
            container.mark(&mut marker);
        }

        let mark_time_elapsed = mark_time.elapsed();
        let collect_time = Instant::now();

        // Delete all terms that are not marked, and release their head symbols.
        let marked_terms = &self.marked_terms;
        let symbols = &self.symbols;
        let removed_terms = self.terms.retain_mut(|index, term| {
            if marked_terms[*index] {
                return true;
            }

            debug_trace!("Dropping term: {:?}", term);
            symbols.get(term.symbol()).decrement();
            false
        });

        // Symbols that are referenced by neither terms, handles nor containers are removed.
        let marked_symbols = &self.marked_symbols;
        let removed_symbols = self.symbols.retain_unreferenced(|index| marked_symbols[index.value()]);

        // Create the next threshold relative to the number of live terms.
        self.countdown = self.config.gc_initial_threshold.max(self.terms.len());

        debug!(
            "Garbage collection: marking took {}ms, collection took {}ms, {} terms and {} symbols removed",
            mark_time_elapsed.as_millis(),
            collect_time.elapsed().as_millis(),
            removed_terms,
            removed_symbols
        );

        debug!("{}", self.metrics_line());
    }

    fn metrics_line(&self) -> String {
        format!(
            "There are {} terms, and {} symbols",
            LargeFormatter(self.terms.len()),
            LargeFormatter(self.symbols.len())
        )
    }
}

/// The metrics of a [TermPool].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermPoolMetrics {
    pub terms: usize,
    pub symbols: usize,
    pub containers: usize,
    pub maximum_containers: usize,
    pub collections: usize,
}

impl fmt::Display for TermPoolMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There are {} terms, and {} symbols. Containers: {} roots, max {}. {} garbage collections",
            LargeFormatter(self.terms),
            LargeFormatter(self.symbols),
            LargeFormatter(self.containers),
            LargeFormatter(self.maximum_containers),
            LargeFormatter(self.collections)
        )
    }
}

/// Helper struct to pass private data required to mark term recursively.
pub struct Marker<'a> {
    terms: &'a IndexedSet<SharedTerm>,
    marked_terms: &'a mut BitVec,
    marked_symbols: &'a mut BitVec,
    stack: &'a mut Vec<ATermIndex>,
}

impl Marker<'_> {
    /// Marks the given term, and all its subterms, as being reachable.
    pub fn mark(&mut self, term: &ATermIndex) {
        if self.marked_terms[term.value()] {
            return;
        }

        self.marked_terms.set(term.value(), true);
        self.stack.push(*term);

        while let Some(term) = self.stack.pop() {
            let shared = &self.terms[term.set_index()];
            self.marked_symbols.set(shared.symbol().value(), true);

            for argument in shared.arguments() {
                // Mark before pushing since subterms can be shared.
                if !self.marked_terms[argument.value()] {
                    self.marked_terms.set(argument.value(), true);
                    self.stack.push(*argument);
                }
            }
        }
    }

    /// Marks the given symbol as being reachable.
    pub fn mark_symbol(&mut self, symbol: &SymbolIndex) {
        self.marked_symbols.set(symbol.value(), true);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use merc_utilities::random_test;
    use merc_utilities::test_logger;

    use crate::Protected;
    use crate::random_term;

    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_maximal_sharing() {
        random_test(100, |rng| {
            let pool = TermPool::new();
            let mut terms = HashMap::new();

            for _ in 0..1000 {
                let term = random_term(&pool, rng, &[("f".into(), 2), ("g".into(), 1)], &["a".to_string()], 10);

                let representation = format!("{}", term);
                if let Some(entry) = terms.get(&representation) {
                    assert_eq!(term, *entry, "There is another term with the same representation");
                } else {
                    terms.insert(representation, term);
                }
            }
        });
    }

    #[test]
    fn test_symbol_sharing() {
        test_logger();
        let pool = TermPool::new();

        let f = pool.create_symbol("f", 2).unwrap();
        let g = pool.create_symbol("f", 2).unwrap();
        let h = pool.create_symbol("f", 1).unwrap();

        assert_eq!(f, g, "Symbols with the same name and arity are shared");
        assert_ne!(f, h, "Symbols with a different arity are different");
    }

    #[test]
    fn test_create_list() {
        let pool = TermPool::new();
        let items = [pool.from_string("a").unwrap(), pool.from_string("f(b)").unwrap()];

        assert_eq!(pool.create_list(&items), pool.from_string("[a, f(b)]").unwrap());
        let none: [ATerm; 0] = [];
        assert_eq!(pool.create_list(&none), pool.empty_list().protect());
    }

    #[test]
    fn test_arity_too_large() {
        let pool = TermPool::with_config(TermPoolConfig {
            max_arity: 3,
            ..TermPoolConfig::default()
        });

        assert!(pool.create_symbol("f", 3).is_ok());
        assert_eq!(
            pool.create_symbol("f", 4).unwrap_err(),
            TermPoolError::ArityTooLarge {
                name: "f".to_string(),
                arity: 4,
                maximum: 3
            }
        );
    }

    #[test]
    #[should_panic]
    fn test_wrong_number_of_arguments() {
        let pool = TermPool::new();
        let f = pool.create_symbol("f", 2).unwrap();
        let a = pool.from_string("a").unwrap();

        pool.create_term(&f, &[a]);
    }

    #[test]
    fn test_collect_unreachable() {
        test_logger();
        let pool = TermPool::with_config(TermPoolConfig {
            automatic_gc: false,
            ..TermPoolConfig::default()
        });

        let kept = pool.from_string("f(g(a), b)").unwrap();
        let initial = pool.len();
        {
            let _garbage = pool.from_string("h(c, d)").unwrap();
        }

        assert!(pool.collect());
        assert_eq!(pool.len(), initial, "Only h(c, d) and its arguments are removed");
        assert_eq!(kept, pool.from_string("f(g(a), b)").unwrap());
        assert!(pool.metrics().collections == 1);

        // The symbols h, c and d are no longer used.
        let symbols = pool.number_of_symbols();
        pool.from_string("h(c, d)").unwrap();
        assert_eq!(pool.number_of_symbols(), symbols + 3);
    }

    #[test]
    fn test_collect_keeps_protected_containers() {
        test_logger();
        let pool = TermPool::with_config(TermPoolConfig {
            automatic_gc: false,
            ..TermPoolConfig::default()
        });

        let mut container: Protected<Vec<ATermIndex>> = Protected::new(&pool, Vec::new());
        {
            let term = pool.from_string("f(a, b)").unwrap();
            let mut write = container.write();
            let index = write.protect(&term);
            write.push(index);
        }

        let before = pool.len();

        // No handle to f(a, b) exists anymore, but the container keeps it alive.
        assert!(pool.collect());
        assert_eq!(pool.len(), before);

        {
            let read = container.read();
            assert_eq!(read.term(&read[0]).to_string(), "f(a, b)");
        }

        drop(container);
        assert!(pool.collect());
        assert!(pool.len() < before);
    }

    #[test]
    fn test_collect_postponed_by_write_guard() {
        let pool = TermPool::new();
        let mut container: Protected<Vec<ATermIndex>> = Protected::new(&pool, Vec::new());

        let write = container.write();
        assert!(!pool.collect(), "Collection must wait for the write guard");
        drop(write);

        assert!(pool.collect());
    }

    #[test]
    fn test_automatic_collection() {
        random_test(10, |rng| {
            let pool = TermPool::with_config(TermPoolConfig {
                gc_initial_threshold: 100,
                ..TermPoolConfig::default()
            });

            let kept = random_term(&pool, rng, &[("f".into(), 2)], &["a".to_string(), "b".to_string()], 20);
            let representation = kept.to_string();

            for _ in 0..100 {
                random_term(&pool, rng, &[("g".into(), 2), ("h".into(), 1)], &["c".to_string()], 20);
            }

            assert!(pool.metrics().collections > 0, "Collections are triggered by allocations");
            assert_eq!(kept.to_string(), representation);
            assert_eq!(pool.from_string(&representation).unwrap(), kept);
        });
    }
}
