#![forbid(unsafe_code)]

use log::debug;
use rustc_hash::FxHashMap;

use crate::MatchKey;
use crate::MatchTree;
use crate::RewriteSpecification;
use crate::Rule;
use crate::match_key;

/// The rewrite rules in registration order, together with a match tree for
/// every head symbol that has rules.
pub struct RuleSet {
    rules: Vec<Rule>,
    trees: FxHashMap<MatchKey, MatchTree>,
}

impl RuleSet {
    /// Creates the rule set for the rules of the given specification.
    pub fn new(spec: &RewriteSpecification) -> RuleSet {
        let mut result = RuleSet {
            rules: Vec::new(),
            trees: FxHashMap::default(),
        };

        for rule in spec.rewrite_rules() {
            if !result.rules.contains(rule) {
                result.rules.push(rule.clone());
            }
        }

        let mut keys: Vec<MatchKey> = result.rules.iter().map(|rule| match_key(rule.lhs())).collect();
        keys.sort_unstable();
        keys.dedup();

        for key in keys {
            result.rebuild(key);
        }

        result
    }

    /// Returns the rules in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the match tree for the rules with the given head, if there are any.
    pub fn tree(&self, key: &MatchKey) -> Option<&MatchTree> {
        self.trees.get(key)
    }

    /// Returns the match trees of all heads that have rules.
    pub fn trees(&self) -> impl Iterator<Item = (&MatchKey, &MatchTree)> {
        self.trees.iter()
    }

    /// Returns true iff there is a rule with the given head.
    pub fn is_defined(&self, key: &MatchKey) -> bool {
        self.trees.contains_key(key)
    }

    /// Adds the rule after all existing rules, returns false if the rule was already present.
    pub fn add_rule(&mut self, rule: Rule) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }

        let key = match_key(rule.lhs());
        debug!("Adding rule {rule}");
        self.rules.push(rule);
        self.rebuild(key);
        true
    }

    /// Removes the rule, returns false if the rule was not present.
    pub fn remove_rule(&mut self, rule: &Rule) -> bool {
        let Some(index) = self.rules.iter().position(|r| r == rule) else {
            return false;
        };

        debug!("Removing rule {rule}");
        self.rules.remove(index);
        self.rebuild(match_key(rule.lhs()));
        true
    }

    /// Rebuilds the match tree for the rules with the given head.
    fn rebuild(&mut self, key: MatchKey) {
        let rules: Vec<&Rule> = self.rules.iter().filter(|rule| match_key(rule.lhs()) == key).collect();

        if rules.is_empty() {
            self.trees.remove(&key);
        } else {
            self.trees.insert(key, MatchTree::new(rules));
        }
    }
}
