#![forbid(unsafe_code)]

use rand::Rng;
use rand::prelude::IteratorRandom;
use rustc_hash::FxHashSet;

use crate::ATerm;
use crate::TermPool;

/// Create a random term consisting of the given symbols and constants.
/// Performs `iterations` number of constructions, where every construction may
/// reuse the terms that were constructed before it as arguments.
///
/// Returns an arbitrary constant when no construction was performed, and
/// panics when `constants` is empty or any name is not a valid symbol.
pub fn random_term(
    pool: &TermPool,
    rng: &mut impl Rng,
    symbols: &[(String, usize)],
    constants: &[String],
    iterations: usize,
) -> ATerm {
    assert!(!constants.is_empty(), "We need constants to be able to create a term");

    let mut subterms = FxHashSet::<ATerm>::from_iter(constants.iter().map(|name| {
        let symbol = pool.create_symbol(name, 0).expect("Constants have arity zero");
        pool.create_constant(&symbol)
    }));

    let mut result = None;
    for _ in 0..iterations {
        let Some((name, arity)) = symbols.iter().choose(rng) else {
            break;
        };

        let arguments: Vec<ATerm> = (0..*arity)
            .filter_map(|_| subterms.iter().choose(rng).cloned())
            .collect();

        let symbol = pool
            .create_symbol(name, *arity)
            .expect("Random symbols must be within the maximum arity");
        let term = pool.create_term(&symbol, &arguments);

        // Make this term available as another subterm that can be used.
        subterms.insert(term.clone());
        result = Some(term);
    }

    match result {
        Some(term) => term,
        None => subterms
            .into_iter()
            .next()
            .expect("There is at least one constant"),
    }
}
