#![forbid(unsafe_code)]

use std::rc::Rc;

use log::debug;
use log::info;
use log::warn;
use rustc_hash::FxHashMap;

use merc_aterm::ATerm;
use merc_aterm::Symb;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::TermPoolError;
use merc_utilities::debug_trace;

use crate::InnermostRewriter;
use crate::MatchKey;
use crate::ReservedTerms;
use crate::RewriteEngine;
use crate::RewriteSpecification;
use crate::RewritingStatistics;
use crate::Rule;
use crate::compiling::ArgumentAnalysis;
use crate::compiling::CompilerConfig;
use crate::compiling::Program;
use crate::compiling::compile;
use crate::compiling::verify;
use crate::match_key;
use crate::utilities::Substitution;

/// How the terms with a given head symbol are rewritten.
pub(crate) enum Dispatch {
    Compiled(Rc<Program>),
    Interpreted,
}

/// Innermost rewrite engine that compiles the rules of every head symbol to a
/// verified bytecode program the first time a term with that head is
/// rewritten.
///
/// When compilation or verification fails for a symbol, the terms with that
/// head are rewritten by the [InnermostRewriter], which yields the same normal
/// forms.
pub struct CompilingRewriter {
    pub(crate) pool: TermPool,
    pub(crate) interpreter: InnermostRewriter,
    pub(crate) reserved: ReservedTerms,
    pub(crate) analysis: ArgumentAnalysis,
    pub(crate) config: CompilerConfig,
    pub(crate) dispatch: FxHashMap<MatchKey, Dispatch>,
}

impl RewriteEngine for CompilingRewriter {
    fn normalize(&mut self, term: &ATerm, substitution: &Substitution) -> ATerm {
        let mut stats = RewritingStatistics::default();

        let term = substitution.apply(term);
        debug_trace!("input: {}", term);

        let result = self.normalize_term(&term, &mut stats);

        info!(
            "{} rewrites, {} single steps and {} symbol comparisons",
            stats.recursions, stats.rewrite_steps, stats.symbol_comparisons
        );
        result
    }

    fn add_rule(&mut self, rule: Rule) -> bool {
        let key = match_key(rule.lhs());
        let was_defined = self.interpreter.rules().is_defined(&key);

        if !self.interpreter.add_rule(rule) {
            return false;
        }

        self.invalidate(key, was_defined);
        true
    }

    fn remove_rule(&mut self, rule: &Rule) -> bool {
        let key = match_key(rule.lhs());
        let was_defined = self.interpreter.rules().is_defined(&key);

        if !self.interpreter.remove_rule(rule) {
            return false;
        }

        self.invalidate(key, was_defined);
        true
    }
}

impl CompilingRewriter {
    /// Creates a new CompilingRewriter from the given rewrite specification.
    pub fn new(pool: &TermPool, spec: &RewriteSpecification) -> Result<CompilingRewriter, TermPoolError> {
        Self::with_config(pool, spec, CompilerConfig::default())
    }

    /// Creates a new CompilingRewriter whose programs are bounded by the given configuration.
    pub fn with_config(
        pool: &TermPool,
        spec: &RewriteSpecification,
        config: CompilerConfig,
    ) -> Result<CompilingRewriter, TermPoolError> {
        let interpreter = InnermostRewriter::new(pool, spec)?;
        let analysis = ArgumentAnalysis::new(interpreter.rules());

        let (normal, total) = analysis.summary();
        debug!("{normal} of {total} constructed arguments are always in normal form");

        Ok(CompilingRewriter {
            pool: pool.clone(),
            interpreter,
            reserved: ReservedTerms::new(pool)?,
            analysis,
            config,
            dispatch: FxHashMap::default(),
        })
    }

    /// Returns true iff the rules for the given head symbol have been compiled successfully.
    pub fn is_compiled(&self, key: &MatchKey) -> bool {
        matches!(self.dispatch.get(key), Some(Dispatch::Compiled(_)))
    }

    /// Returns the normal form of an arbitrary term, the arguments are
    /// rewritten before the term itself.
    fn normalize_term(&mut self, term: &ATerm, stats: &mut RewritingStatistics) -> ATerm {
        let mut todo: Vec<(ATerm, bool)> = vec![(term.clone(), false)];
        let mut results: Vec<ATerm> = Vec::new();

        while let Some((term, expanded)) = todo.pop() {
            if self.reserved.is_variable(&term.copy()) {
                results.push(term);
            } else if !expanded && !term.arguments().is_empty() {
                todo.push((term.clone(), true));

                // The first argument is normalized first.
                for argument in term.arguments().rev() {
                    todo.push((argument.protect(), false));
                }
            } else {
                let arity = term.arguments().len();
                let head = if arity == 0 {
                    term
                } else {
                    let arguments = results.split_off(results.len() - arity);
                    self.pool.create_term(&term.get_head_symbol(), &arguments)
                };

                let result = self.head_normal_form(head, stats);
                results.push(result);
            }
        }

        debug_assert_eq!(results.len(), 1, "Exactly the normal form must remain");
        results.pop().unwrap_or_else(|| term.clone())
    }

    /// Returns the normal form of a term whose arguments are in normal form.
    pub(crate) fn head_normal_form(&mut self, term: ATerm, stats: &mut RewritingStatistics) -> ATerm {
        let key = match_key(&term);
        if !self.analysis.is_defined(&key) {
            return term;
        }

        match self.program(key) {
            Some(program) => self.execute(program, term, stats),
            None => self.interpreter.rewrite_head(term.copy(), stats),
        }
    }

    /// Returns the program for the given head symbol, compiles it when
    /// necessary. Returns None when the terms must be interpreted.
    pub(crate) fn program(&mut self, key: MatchKey) -> Option<Rc<Program>> {
        if let Some(dispatch) = self.dispatch.get(&key) {
            return match dispatch {
                Dispatch::Compiled(program) => Some(program.clone()),
                Dispatch::Interpreted => None,
            };
        }

        let tree = self.interpreter.rules().tree(&key)?;
        let result = compile(tree, &self.analysis, &self.reserved, &self.config).and_then(|program| {
            verify(&program)?;
            Ok(program)
        });

        match result {
            Ok(program) => {
                debug_trace!("compiled {:?}:\n{}", key, program);
                let program = Rc::new(program);
                self.dispatch.insert(key, Dispatch::Compiled(program.clone()));
                Some(program)
            }
            Err(error) => {
                let name = match key {
                    MatchKey::Symbol(symbol) => self.pool.get_symbol(&symbol).name().to_string(),
                    MatchKey::Int(value) => value.to_string(),
                };

                warn!("Rewriting {name} with the interpreter, because compilation failed: {error}");
                self.dispatch.insert(key, Dispatch::Interpreted);
                None
            }
        }
    }

    /// Discards the programs that depend on the rules of the given head symbol.
    fn invalidate(&mut self, key: MatchKey, was_defined: bool) {
        self.analysis = ArgumentAnalysis::new(self.interpreter.rules());

        if was_defined != self.analysis.is_defined(&key) {
            // Other programs construct or call the symbol depending on whether it has rules.
            self.dispatch.clear();
        } else {
            self.dispatch.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;
    use test_log::test;

    use crate::test_utility::create_conditional_rewrite_rule;
    use crate::test_utility::create_rewrite_rule;

    use super::*;

    fn peano(pool: &TermPool) -> RewriteSpecification {
        RewriteSpecification::new(vec![
            create_rewrite_rule(pool, "f(0)", "1", &[]).unwrap(),
            create_rewrite_rule(pool, "f(s(x))", "f(x)", &["x"]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_compiled_peano() {
        let pool = TermPool::new();
        let mut rewriter = CompilingRewriter::new(&pool, &peano(&pool)).unwrap();

        let term = pool.from_string("f(s(s(0)))").unwrap();
        assert_eq!(rewriter.rewrite(&term), pool.from_string("1").unwrap());

        let f = pool.create_symbol("f", 1).unwrap();
        assert!(rewriter.is_compiled(&MatchKey::Symbol(*f.shared())));
    }

    #[test]
    fn test_fallback() {
        let pool = TermPool::new();
        let config = CompilerConfig {
            max_program_size: 1,
            ..CompilerConfig::default()
        };
        let mut rewriter = CompilingRewriter::with_config(&pool, &peano(&pool), config).unwrap();

        let term = pool.from_string("g(f(s(s(0))))").unwrap();
        assert_eq!(rewriter.rewrite(&term), pool.from_string("g(1)").unwrap());

        let f = pool.create_symbol("f", 1).unwrap();
        assert!(!rewriter.is_compiled(&MatchKey::Symbol(*f.shared())));
    }

    #[test]
    fn test_compiled_guards() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            create_rewrite_rule(&pool, "eq(x, x)", "true", &["x"]).unwrap(),
            create_rewrite_rule(&pool, "eq(x, y)", "false", &["x", "y"]).unwrap(),
            create_conditional_rewrite_rule(&pool, "filter(cons(x, xs))", "eq(x, a)", "filter(xs)", &["x", "xs"])
                .unwrap(),
            create_rewrite_rule(&pool, "filter(cons(x, xs))", "cons(x, filter(xs))", &["x", "xs"]).unwrap(),
        ])
        .unwrap();
        let mut rewriter = CompilingRewriter::new(&pool, &spec).unwrap();

        let term = pool.from_string("filter(cons(a, cons(b, cons(a, cons(c, nil)))))").unwrap();
        assert_eq!(
            rewriter.rewrite(&term),
            pool.from_string("cons(b, cons(c, filter(nil)))").unwrap()
        );
    }

    #[test]
    fn test_invalidate() {
        let pool = TermPool::new();
        let mut rewriter = CompilingRewriter::new(&pool, &peano(&pool)).unwrap();
        let term = pool.from_string("f(s(0))").unwrap();
        assert_eq!(rewriter.rewrite(&term), pool.from_string("1").unwrap());

        // The constant 1 becomes a defined symbol, so the program for f must be recompiled.
        let rule = create_rewrite_rule(&pool, "1", "one", &[]).unwrap();
        assert!(rewriter.add_rule(rule.clone()));
        assert!(!rewriter.add_rule(rule.clone()));
        assert_eq!(rewriter.rewrite(&term), pool.from_string("one").unwrap());

        assert!(rewriter.remove_rule(&rule));
        assert!(!rewriter.remove_rule(&rule));
        assert_eq!(rewriter.rewrite(&term), pool.from_string("1").unwrap());
    }

    #[test]
    fn test_int_rules_fall_back() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            Rule::new(pool.create_int(2), None, pool.from_string("two").unwrap()).unwrap(),
            create_rewrite_rule(&pool, "f(x)", "g(x)", &["x"]).unwrap(),
        ])
        .unwrap();
        let mut rewriter = CompilingRewriter::new(&pool, &spec).unwrap();

        let f = pool.create_symbol("f", 1).unwrap();
        let term = pool.create_term(&f, &[pool.create_int(2)]);
        assert_eq!(rewriter.rewrite(&term), pool.from_string("g(two)").unwrap());
        assert!(!rewriter.is_compiled(&MatchKey::Int(2)));
    }
}
