#![forbid(unsafe_code)]

use log::info;
use smallvec::SmallVec;

use merc_aterm::ATerm;
use merc_aterm::ATermIndex;
use merc_aterm::ATermRef;
use merc_aterm::Symbol;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::TermPoolError;
use merc_utilities::debug_trace;

use crate::Announcement;
use crate::RewriteEngine;
use crate::RewriteSpecification;
use crate::RewritingStatistics;
use crate::Rule;
use crate::RuleSet;
use crate::VARIABLE_SYMBOL_NAME;
use crate::check_equivalence_classes;
use crate::match_key;
use crate::utilities::Config;
use crate::utilities::InnermostStack;
use crate::utilities::PositionIndexed;
use crate::utilities::Substitution;

/// The terms that the rewriters need to recognise.
pub struct ReservedTerms {
    /// A guard holds iff it rewrites to this constant.
    pub true_term: ATerm,
    /// The head symbol of variables.
    pub variable_symbol: Symbol,
}

impl ReservedTerms {
    pub fn new(pool: &TermPool) -> Result<ReservedTerms, TermPoolError> {
        Ok(ReservedTerms {
            true_term: pool.create_constant(&pool.create_symbol("true", 0)?),
            variable_symbol: pool.create_symbol(VARIABLE_SYMBOL_NAME, 1)?,
        })
    }

    /// Returns true iff the term is a variable, which is always in normal form.
    pub fn is_variable(&self, term: &ATermRef<'_>) -> bool {
        term.get_head_symbol() == self.variable_symbol
    }
}

/// Innermost rewrite engine that selects rules using the match trees of a [RuleSet].
pub struct InnermostRewriter {
    pool: TermPool,
    rules: RuleSet,
    reserved: ReservedTerms,
    stack: InnermostStack,
}

impl RewriteEngine for InnermostRewriter {
    fn normalize(&mut self, term: &ATerm, substitution: &Substitution) -> ATerm {
        let mut stats = RewritingStatistics::default();

        let term = substitution.apply(term);
        debug_trace!("input: {}", term);

        let result = InnermostRewriter::rewrite_aux(
            &self.pool,
            &mut self.stack,
            &mut stats,
            &self.rules,
            &self.reserved,
            term.copy(),
            false,
        );

        info!(
            "{} rewrites, {} single steps and {} symbol comparisons",
            stats.recursions, stats.rewrite_steps, stats.symbol_comparisons
        );
        result
    }

    fn add_rule(&mut self, rule: Rule) -> bool {
        self.rules.add_rule(rule)
    }

    fn remove_rule(&mut self, rule: &Rule) -> bool {
        self.rules.remove_rule(rule)
    }
}

impl InnermostRewriter {
    /// Creates a new InnermostRewriter from the given rewrite specification.
    pub fn new(pool: &TermPool, spec: &RewriteSpecification) -> Result<InnermostRewriter, TermPoolError> {
        Ok(InnermostRewriter {
            pool: pool.clone(),
            rules: RuleSet::new(spec),
            reserved: ReservedTerms::new(pool)?,
            stack: InnermostStack::new(pool),
        })
    }

    /// Returns the rules of this rewriter.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the normal form of a term whose arguments are already in normal form.
    pub(crate) fn rewrite_head(&mut self, term: ATermRef<'_>, stats: &mut RewritingStatistics) -> ATerm {
        InnermostRewriter::rewrite_aux(
            &self.pool,
            &mut self.stack,
            stats,
            &self.rules,
            &self.reserved,
            term,
            true,
        )
    }

    /// Function to rewrite a term 't'. The rule set and the stack are passed
    /// as separate parameters to satisfy the borrow checker.
    ///
    /// # Details
    ///
    /// Uses a stack of terms and configurations to avoid recursions and to keep
    /// track of terms in normal forms without explicit tagging. The configuration
    /// stack consists of three different possible values with the following semantics
    ///     - Return(): Returns the top of the stack.
    ///     - Rewrite(index): Updates the configuration to rewrite the top of the term stack
    ///                       and places the result on the given index.
    ///     - Construct(symbol, arity, index): Constructs the term from the top arity
    ///                       normal forms, and places its normal form on the given index.
    ///
    /// When `arguments_normal` is true the arguments of the input term are not rewritten.
    pub(crate) fn rewrite_aux(
        pool: &TermPool,
        stack: &mut InnermostStack,
        stats: &mut RewritingStatistics,
        rules: &RuleSet,
        reserved: &ReservedTerms,
        input_term: ATermRef<'_>,
        arguments_normal: bool,
    ) -> ATerm {
        stats.recursions += 1;
        let top_of_stack = {
            let mut write_terms = stack.terms.write();
            let mut write_configs = stack.configs.write();

            // Push the result term to the stack.
            let top_of_stack = write_terms.len();
            write_configs.push(Config::Return());
            write_terms.push(None);
            if !arguments_normal {
                InnermostStack::add_rewrite(&mut write_configs, &mut write_terms, input_term, top_of_stack);
            }
            top_of_stack
        };

        if arguments_normal {
            InnermostRewriter::rewrite_step(pool, stack, stats, rules, reserved, input_term.protect(), top_of_stack);
        }

        loop {
            debug_trace!("{}", stack);

            let config = stack.configs.write().pop();
            match config {
                Some(Config::Rewrite(result)) => {
                    let term = {
                        let mut write_terms = stack.terms.write();
                        match write_terms.pop().flatten() {
                            Some(index) => write_terms.term(&index).protect(),
                            None => unreachable!("A term must be pushed for every rewrite"),
                        }
                    };

                    if reserved.is_variable(&term.copy()) {
                        let mut write_terms = stack.terms.write();
                        write_terms[result] = Some(write_terms.protect(&term));
                    } else if term.arguments().is_empty() {
                        InnermostRewriter::rewrite_step(pool, stack, stats, rules, reserved, term, result);
                    } else {
                        let mut write_terms = stack.terms.write();
                        let mut write_configs = stack.configs.write();

                        // For all the argument we reserve space on the stack.
                        let arguments = term.arguments();
                        let top_of_stack = write_terms.len();
                        for _ in 0..arguments.len() {
                            write_terms.push(None);
                        }

                        InnermostStack::add_result(&mut write_configs, term.get_head_symbol(), arguments.len(), result);
                        for (offset, arg) in arguments.enumerate() {
                            InnermostStack::add_rewrite(&mut write_configs, &mut write_terms, arg, top_of_stack + offset);
                        }
                    }
                }
                Some(Config::Construct(symbol, arity, index)) => {
                    let term = {
                        // Take the last arity arguments.
                        let mut write_terms = stack.terms.write();
                        let length = write_terms.len();

                        let arguments: SmallVec<[ATermIndex; 8]> =
                            write_terms[length - arity..].iter().flatten().copied().collect();
                        debug_assert_eq!(arguments.len(), arity, "All arguments must be in normal form");

                        let term = pool.create_term_iter(
                            &pool.get_symbol(&symbol),
                            arguments.iter().map(|argument| write_terms.term(argument)),
                        );

                        // Remove the arguments from the stack.
                        write_terms.drain(length - arity..);
                        term
                    };

                    InnermostRewriter::rewrite_step(pool, stack, stats, rules, reserved, term, index);
                }
                Some(Config::Return()) => {
                    let mut write_terms = stack.terms.write();

                    return match write_terms.pop().flatten() {
                        Some(index) => write_terms.term(&index).protect(),
                        None => unreachable!("The result should be the last element on the stack"),
                    };
                }
                None => unreachable!("The stack must end with a Return() configuration"),
            }
        }
    }

    /// Applies the first rule that matches the term, whose arguments are in
    /// normal form, and places the normal form at the given index.
    fn rewrite_step(
        pool: &TermPool,
        stack: &mut InnermostStack,
        stats: &mut RewritingStatistics,
        rules: &RuleSet,
        reserved: &ReservedTerms,
        term: ATerm,
        index: usize,
    ) {
        match InnermostRewriter::find_match(pool, stack, stats, rules, reserved, term.copy()) {
            Some(announcement) => {
                let bindings: SmallVec<[ATermRef<'_>; 8]> = announcement
                    .variables
                    .iter()
                    .map(|position| term.copy().get_position(position))
                    .collect();

                debug_trace!(
                    "rewrite {} => {} using rule {}",
                    term,
                    announcement.rhs.evaluate(pool, &bindings),
                    announcement.rule
                );

                let mut write_terms = stack.terms.write();
                let mut write_configs = stack.configs.write();
                InnermostStack::integrate(
                    &mut write_configs,
                    &mut write_terms,
                    &announcement.rhs,
                    &bindings,
                    index,
                );
                stats.rewrite_steps += 1;
            }
            None => {
                // Add the term on the stack.
                let mut write_terms = stack.terms.write();
                write_terms[index] = Some(write_terms.protect(&term));
            }
        }
    }

    /// Use the match tree to find the first rule that matches the given term.
    fn find_match<'r>(
        pool: &TermPool,
        stack: &mut InnermostStack,
        stats: &mut RewritingStatistics,
        rules: &'r RuleSet,
        reserved: &ReservedTerms,
        term: ATermRef<'_>,
    ) -> Option<&'r Announcement> {
        let tree = rules.tree(&match_key(&term))?;

        for candidate in tree.candidates(term, stats) {
            let announcement = &tree.announcements()[*candidate];

            if !check_equivalence_classes(term, &announcement.equivalence_classes) {
                continue;
            }

            if let Some(guard) = &announcement.guard {
                let bindings: SmallVec<[ATermRef<'_>; 8]> = announcement
                    .variables
                    .iter()
                    .map(|position| term.get_position(position))
                    .collect();

                let guard = guard.evaluate(pool, &bindings);
                let normal = InnermostRewriter::rewrite_aux(pool, stack, stats, rules, reserved, guard.copy(), false);
                if normal != reserved.true_term {
                    continue;
                }
            }

            return Some(announcement);
        }

        None
    }
}
