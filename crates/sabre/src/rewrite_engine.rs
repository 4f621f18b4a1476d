#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use merc_aterm::ATerm;
use merc_aterm::TermPool;
use merc_utilities::MercError;

use crate::CompilingRewriter;
use crate::InnermostRewriter;
use crate::RewriteSpecification;
use crate::Rule;
use crate::utilities::Substitution;

/// A shared trait for all the rewriters
pub trait RewriteEngine {
    /// Returns the normal form of the term in which all the variables bound by
    /// the substitution have been replaced by their value.
    fn normalize(&mut self, term: &ATerm, substitution: &Substitution) -> ATerm;

    /// Rewrites the given term into normal form.
    fn rewrite(&mut self, term: &ATerm) -> ATerm {
        self.normalize(term, &Substitution::default())
    }

    /// Adds the rule after all existing rules, returns false if the rule was already present.
    fn add_rule(&mut self, rule: Rule) -> bool;

    /// Removes the rule, returns false if the rule was not present.
    fn remove_rule(&mut self, rule: &Rule) -> bool;
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RewritingStatistics {
    /// Count the number of rewrite rules applied
    pub rewrite_steps: usize,
    /// Counts the number of times symbols are compared.
    pub symbol_comparisons: usize,
    /// The number of times rewrite is called recursively (to rewrite conditions etc)
    pub recursions: usize,
}

/// The available rewrite strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RewriteStrategy {
    /// Innermost rewriting that interprets the match trees.
    #[default]
    Innermost,
    /// Innermost rewriting with the rules of every symbol compiled to bytecode.
    Compiling,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteStrategyError {
    #[error("unknown rewrite strategy {0}")]
    Unknown(String),
}

impl RewriteStrategy {
    /// Returns a one line explanation of the strategy.
    pub fn description(&self) -> &'static str {
        match self {
            RewriteStrategy::Innermost => "innermost rewriting using match trees",
            RewriteStrategy::Compiling => "innermost rewriting using compiled bytecode for every symbol",
        }
    }
}

impl FromStr for RewriteStrategy {
    type Err = RewriteStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jitty" => Ok(RewriteStrategy::Innermost),
            "jittyc" => Ok(RewriteStrategy::Compiling),
            _ => Err(RewriteStrategyError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for RewriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteStrategy::Innermost => write!(f, "jitty"),
            RewriteStrategy::Compiling => write!(f, "jittyc"),
        }
    }
}

/// Creates a rewriter for the given specification using the given strategy.
pub fn create_rewriter(
    pool: &TermPool,
    spec: &RewriteSpecification,
    strategy: RewriteStrategy,
) -> Result<Box<dyn RewriteEngine>, MercError> {
    Ok(match strategy {
        RewriteStrategy::Innermost => Box::new(InnermostRewriter::new(pool, spec)?),
        RewriteStrategy::Compiling => Box::new(CompilingRewriter::new(pool, spec)?),
    })
}
