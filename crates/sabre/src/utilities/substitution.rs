#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use merc_aterm::ATerm;
use merc_aterm::ATermIndex;
use merc_aterm::ATermRef;
use merc_aterm::Term;

use crate::DisplayPattern;
use crate::is_variable;

/// A finite mapping from variables to terms. Looking up a variable that is not
/// bound yields `None`, in which case the variable is left as is.
#[derive(Clone, Default)]
pub struct Substitution {
    /// Maps the index of a variable to the variable and its value, the
    /// variable is stored to keep it alive.
    bindings: FxHashMap<ATermIndex, (ATerm, ATerm)>,
}

impl Substitution {
    /// Creates the empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the variable to the given value, returns the previous value if there was one.
    pub fn insert(&mut self, variable: ATerm, value: ATerm) -> Option<ATerm> {
        debug_assert!(is_variable(&variable), "Only variables can be bound, got {variable}");
        self.bindings
            .insert(*variable.shared(), (variable, value))
            .map(|(_, previous)| previous)
    }

    /// Returns the value bound to the given variable.
    pub fn get<'a, 'b>(&self, variable: &'b impl Term<'a, 'b>) -> Option<&ATerm> {
        self.bindings.get(variable.shared()).map(|(_, value)| value)
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true iff no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Replaces all bound variables in the term simultaneously by their value.
    /// The values themselves are not substituted again.
    pub fn apply<'a, 'b>(&self, term: &'b impl Term<'a, 'b>) -> ATerm {
        if self.bindings.is_empty() {
            return term.protect();
        }

        let pool = term.pool();
        let mut results: FxHashMap<ATermIndex, ATerm> = FxHashMap::default();
        let mut stack: Vec<(ATermRef<'a>, bool)> = vec![(term.copy(), false)];

        while let Some((current, arguments_done)) = stack.pop() {
            if results.contains_key(current.shared()) {
                // Shared subterms are only substituted once.
                continue;
            }

            if let Some(value) = self.get(&current) {
                results.insert(*current.shared(), value.clone());
            } else if arguments_done {
                let unchanged = current
                    .arguments()
                    .all(|arg| results.get(arg.shared()).is_some_and(|result| *result == arg));

                let result = if unchanged {
                    current.protect()
                } else {
                    pool.create_term_iter(
                        &current.get_head_symbol(),
                        current.arguments().map(|arg| results[arg.shared()].copy()),
                    )
                };
                results.insert(*current.shared(), result);
            } else {
                stack.push((current, true));
                for arg in current.arguments() {
                    if !results.contains_key(arg.shared()) {
                        stack.push((arg, false));
                    }
                }
            }
        }

        results.remove(term.shared()).unwrap_or_else(|| term.protect())
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.bindings.values().format_with(", ", |(variable, value), f| {
                f(&format_args!("{} -> {}", DisplayPattern(variable.copy()), value))
            })
        )
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use crate::create_variable;
    use crate::to_variables;

    use super::*;

    #[test]
    fn test_simultaneous_substitution() {
        let pool = TermPool::new();
        let term = to_variables(&pool, &pool.from_string("f(x, g(y, x))").unwrap(), &["x", "y"]).unwrap();

        let x = create_variable(&pool, "x").unwrap();
        let y = create_variable(&pool, "y").unwrap();

        let mut sigma = Substitution::new();
        sigma.insert(x.clone(), y.clone());
        sigma.insert(y.clone(), pool.from_string("a").unwrap());

        // The value of x is not substituted again.
        let expected = to_variables(&pool, &pool.from_string("f(y, g(a, y))").unwrap(), &["y"]).unwrap();
        assert_eq!(sigma.apply(&term), expected);
        assert_eq!(sigma.len(), 2);
    }

    #[test]
    fn test_unbound_variables() {
        let pool = TermPool::new();
        let term = to_variables(&pool, &pool.from_string("f(x, [a, b], 5)").unwrap(), &["x"]).unwrap();

        let mut sigma = Substitution::new();
        sigma.insert(create_variable(&pool, "z").unwrap(), pool.from_string("a").unwrap());

        assert_eq!(sigma.apply(&term), term, "Terms without bound variables are unchanged");
        assert!(Substitution::new().get(&term).is_none());
    }
}
