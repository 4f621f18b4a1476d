#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use merc_aterm::ATermRef;

use crate::RewritingStatistics;
use crate::Rule;
use crate::utilities::ExplicitPosition;
use crate::utilities::PositionIndexed;

use super::Announcement;
use super::MatchKey;
use super::match_key;

/// A node of the [MatchTree].
#[derive(Clone, Debug)]
pub enum MatchNode {
    /// Inspects the key at the position and continues with the matching
    /// branch, or with the default when no branch matches. When there is no
    /// default no rule can match.
    Switch {
        position: ExplicitPosition,
        branches: Vec<(MatchKey, usize)>,
        default: Option<usize>,
    },

    /// All the positions of the candidates have been inspected, the
    /// candidates are given in registration order.
    Leaf { candidates: Vec<usize> },
}

/// A match tree selects the rewrite rules, for a fixed head symbol, whose
/// left-hand side matches a term.
///
/// # Details
///
/// Every position is inspected at most once on each path through the tree.
/// The candidates of a leaf are exactly the rules whose function symbols
/// match the term, the non-linear variables and the guard still have to be
/// checked for them in order.
#[derive(Clone, Debug)]
pub struct MatchTree {
    announcements: Vec<Announcement>,
    nodes: Vec<MatchNode>,
}

/// The rules that have to be considered at a node, with their remaining tests.
type Candidates = Vec<(usize, Vec<(ExplicitPosition, MatchKey)>)>;

impl MatchTree {
    /// Creates the match tree for the given rules, which must have the same head symbol.
    pub fn new<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> MatchTree {
        let announcements: Vec<Announcement> = rules.into_iter().map(Announcement::new).collect();

        let candidates = announcements
            .iter()
            .enumerate()
            .map(|(index, announcement)| (index, announcement.tests.clone()))
            .collect();

        let mut nodes = Vec::new();
        Self::build(&mut nodes, candidates);

        MatchTree { announcements, nodes }
    }

    /// Returns the announcements of the rules, in registration order.
    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }

    /// Returns the nodes of the tree, where the first node is the root.
    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    /// Returns the indices of the announcements whose function symbols match
    /// the term, in registration order.
    pub fn candidates(&self, term: ATermRef<'_>, stats: &mut RewritingStatistics) -> &[usize] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                MatchNode::Switch {
                    position,
                    branches,
                    default,
                } => {
                    stats.symbol_comparisons += 1;
                    let key = match_key(&term.get_position(position));

                    match branches.iter().find(|(branch, _)| *branch == key) {
                        Some((_, child)) => node = *child,
                        None => match default {
                            Some(child) => node = *child,
                            None => return &[],
                        },
                    }
                }
                MatchNode::Leaf { candidates } => return candidates,
            }
        }
    }

    /// Adds the subtree for the given candidates and returns the index of its root.
    fn build(nodes: &mut Vec<MatchNode>, candidates: Candidates) -> usize {
        // Inspect the first remaining position of the first rule, all its parent positions have already been inspected.
        let Some(position) = candidates
            .iter()
            .find_map(|(_, tests)| tests.first().map(|(position, _)| position.clone()))
        else {
            nodes.push(MatchNode::Leaf {
                candidates: candidates.iter().map(|(index, _)| *index).collect(),
            });
            return nodes.len() - 1;
        };

        // Reserve the node such that the root of the subtree comes first.
        let index = nodes.len();
        nodes.push(MatchNode::Leaf { candidates: vec![] });

        let mut keys: Vec<MatchKey> = Vec::new();
        for (_, tests) in &candidates {
            if let Some((_, key)) = tests.iter().find(|(p, _)| *p == position) {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }

        let mut branches = Vec::with_capacity(keys.len());
        for key in keys {
            let mut child: Candidates = Vec::new();
            for (rule, tests) in &candidates {
                match tests.iter().position(|(p, _)| *p == position) {
                    Some(test) if tests[test].1 == key => {
                        let mut remaining = tests.clone();
                        remaining.remove(test);
                        child.push((*rule, remaining));
                    }
                    Some(_) => {
                        // This rule requires another key at this position.
                    }
                    None => child.push((*rule, tests.clone())),
                }
            }

            branches.push((key, Self::build(nodes, child)));
        }

        let remaining: Candidates = candidates
            .into_iter()
            .filter(|(_, tests)| !tests.iter().any(|(p, _)| *p == position))
            .collect();
        let default = if remaining.is_empty() {
            None
        } else {
            Some(Self::build(nodes, remaining))
        };

        nodes[index] = MatchNode::Switch {
            position,
            branches,
            default,
        };
        index
    }
}

impl fmt::Display for MatchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                MatchNode::Switch {
                    position,
                    branches,
                    default,
                } => {
                    write!(
                        f,
                        "{index}: switch {position} [{}]",
                        branches
                            .iter()
                            .format_with(", ", |(key, child), f| f(&format_args!("{key:?} -> {child}")))
                    )?;
                    if let Some(default) = default {
                        write!(f, " default {default}")?;
                    }
                    writeln!(f)?;
                }
                MatchNode::Leaf { candidates } => {
                    writeln!(
                        f,
                        "{index}: [{}]",
                        candidates
                            .iter()
                            .format_with(", ", |candidate, f| f(&self.announcements[*candidate].rule))
                    )?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::Symb;
    use merc_aterm::Term;
    use merc_aterm::TermPool;

    use crate::test_utility::create_rewrite_rule;

    use super::*;

    #[test]
    fn test_match_tree_order() {
        let pool = TermPool::new();
        let rules = [
            create_rewrite_rule(&pool, "f(s(x), 0)", "a", &["x"]).unwrap(),
            create_rewrite_rule(&pool, "f(x, y)", "b", &["x", "y"]).unwrap(),
            create_rewrite_rule(&pool, "f(s(s(x)), y)", "c", &["x", "y"]).unwrap(),
        ];

        let tree = MatchTree::new(&rules);
        let mut stats = RewritingStatistics::default();

        let term = pool.from_string("f(s(s(0)), 0)").unwrap();
        assert_eq!(tree.candidates(term.copy(), &mut stats), &[0, 1, 2], "{tree}");

        let term = pool.from_string("f(s(0), s(0))").unwrap();
        assert_eq!(tree.candidates(term.copy(), &mut stats), &[1], "{tree}");

        let term = pool.from_string("f(0, 0)").unwrap();
        assert_eq!(tree.candidates(term.copy(), &mut stats), &[1], "{tree}");
        assert!(stats.symbol_comparisons > 0);
    }

    #[test]
    fn test_match_tree_without_default() {
        let pool = TermPool::new();
        let rules = [
            create_rewrite_rule(&pool, "g(a)", "b", &[]).unwrap(),
            create_rewrite_rule(&pool, "g(b)", "c", &[]).unwrap(),
        ];

        let tree = MatchTree::new(&rules);
        let mut stats = RewritingStatistics::default();

        let term = pool.from_string("g(c)").unwrap();
        assert!(tree.candidates(term.copy(), &mut stats).is_empty());

        let term = pool.from_string("g(b)").unwrap();
        let candidates = tree.candidates(term.copy(), &mut stats);
        assert_eq!(tree.announcements()[candidates[0]].rule.rhs().get_head_symbol().name().as_ref(), "c");
    }
}
