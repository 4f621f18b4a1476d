#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use merc_aterm::Symb;
use merc_aterm::SymbolIndex;

use crate::MatchKey;
use crate::RuleSet;
use crate::match_key;
use crate::utilities::TemplateNode;
use crate::utilities::TermTemplate;

/// Static analysis of a rule set that determines which terms are in normal
/// form by construction.
///
/// # Details
///
/// A symbol without rules is a constructor. A node of a right-hand side or a
/// guard is in normal form by construction when it is a variable, since the
/// bindings are in normal form, or a constructor applied to arguments that
/// are in normal form by construction. These nodes never have to be
/// rewritten after they have been constructed.
///
/// The compiler creates subterms that are normal by construction and do not
/// depend on the bindings once, as constants, and never rewrites them.
///
/// The argument table records for every symbol and argument whether all the
/// occurrences of the symbol in right-hand sides and guards have an argument
/// that is always in normal form. Since arguments are rewritten before a
/// call, it is only reported.
#[derive(Debug, Default)]
pub struct ArgumentAnalysis {
    defined: FxHashSet<MatchKey>,
    always_normal: FxHashMap<SymbolIndex, Vec<bool>>,
}

impl ArgumentAnalysis {
    pub fn new(rules: &RuleSet) -> ArgumentAnalysis {
        let mut result = ArgumentAnalysis {
            defined: rules.trees().map(|(key, _)| *key).collect(),
            always_normal: FxHashMap::default(),
        };

        let mut table: FxHashMap<SymbolIndex, Vec<bool>> = FxHashMap::default();
        for (_, tree) in rules.trees() {
            for announcement in tree.announcements() {
                result.record(&mut table, &announcement.rhs);
                if let Some(guard) = &announcement.guard {
                    result.record(&mut table, guard);
                }
            }
        }

        result.always_normal = table;
        result
    }

    /// Returns true iff there is a rule with the given head.
    pub fn is_defined(&self, key: &MatchKey) -> bool {
        self.defined.contains(key)
    }

    /// Returns true iff the symbol has no rules.
    pub fn is_constructor(&self, symbol: &SymbolIndex) -> bool {
        !self.defined.contains(&MatchKey::Symbol(*symbol))
    }

    /// Returns true iff the given argument of the symbol is in normal form by
    /// construction at all its occurrences. This holds vacuously for symbols
    /// that do not occur in any right-hand side or guard.
    pub fn always_normal(&self, symbol: &SymbolIndex, argument: usize) -> bool {
        self.always_normal
            .get(symbol)
            .is_none_or(|arguments| arguments.get(argument).copied().unwrap_or(true))
    }

    /// Returns the number of symbol and argument pairs that are always in normal form, and the total number of pairs.
    pub fn summary(&self) -> (usize, usize) {
        let total = self.always_normal.values().map(|arguments| arguments.len()).sum();
        let normal = self
            .always_normal
            .values()
            .map(|arguments| arguments.iter().filter(|normal| **normal).count())
            .sum();

        (normal, total)
    }

    /// Returns whether the subtemplate starting at the node is in normal form
    /// by construction, together with the node after the subtemplate.
    pub fn is_normal(&self, nodes: &[TemplateNode], node: usize) -> (bool, usize) {
        match &nodes[node] {
            TemplateNode::Variable(_) => (true, node + 1),
            TemplateNode::Term(term) => (!self.is_defined(&match_key(term)), node + 1),
            TemplateNode::Construct(symbol, arity) => {
                let mut normal = self.is_constructor(symbol.shared());
                let mut next = node + 1;
                for _ in 0..*arity {
                    let (argument, after) = self.is_normal(nodes, next);
                    normal &= argument;
                    next = after;
                }

                (normal, next)
            }
        }
    }

    /// Updates the argument table for all the applications in the template.
    fn record(&self, table: &mut FxHashMap<SymbolIndex, Vec<bool>>, template: &TermTemplate) {
        let nodes = template.nodes();
        for (index, node) in nodes.iter().enumerate() {
            if let TemplateNode::Construct(symbol, arity) = node {
                let entry = table.entry(*symbol.shared()).or_insert_with(|| vec![true; *arity]);

                let mut next = index + 1;
                for argument in 0..*arity {
                    let (normal, after) = self.is_normal(nodes, next);
                    entry[argument] &= normal;
                    next = after;
                }
            }
        }
    }
}
