#![forbid(unsafe_code)]

use merc_aterm::ATerm;
use merc_aterm::ATermRef;
use merc_aterm::Symb;
use merc_aterm::SymbolIndex;
use merc_aterm::Term;

use crate::Rule;
use crate::is_variable;
use crate::utilities::ExplicitPosition;
use crate::utilities::TermTemplate;

use super::EquivalenceClass;
use super::derive_equivalence_classes;

/// The value that the match tree compares at a position, either the head
/// symbol of the subterm or the value of an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKey {
    Symbol(SymbolIndex),
    Int(u64),
}

/// Returns the key that the match tree uses for the given term.
pub fn match_key<'a, 'b>(t: &'b impl Term<'a, 'b>) -> MatchKey {
    match t.annotation() {
        Some(value) => MatchKey::Int(value),
        None => MatchKey::Symbol(*t.get_head_symbol().shared()),
    }
}

/// The information that is necessary to apply a rewrite rule once its left-hand side has been matched.
#[derive(Clone, Debug)]
pub struct Announcement {
    /// The rule that is announced.
    pub rule: Rule,

    /// The keys that must occur at the positions below the root, in pre order.
    pub tests: Vec<(ExplicitPosition, MatchKey)>,

    /// The position of the first occurrence of every variable, indexed by its slot.
    pub variables: Vec<ExplicitPosition>,

    /// Positions in the pattern with the same variable, for non-linear patterns
    pub equivalence_classes: Vec<EquivalenceClass>,

    /// The guard that must normalize to `true`.
    pub guard: Option<TermTemplate>,

    /// The right-hand side of the rule.
    pub rhs: TermTemplate,
}

impl Announcement {
    pub fn new(rule: &Rule) -> Announcement {
        let mut tests = Vec::new();
        let mut occurrences: Vec<(ATerm, ExplicitPosition)> = Vec::new();

        let mut stack: Vec<(ATermRef<'_>, ExplicitPosition)> = vec![(rule.lhs().copy(), ExplicitPosition::empty())];
        while let Some((term, position)) = stack.pop() {
            if is_variable(&term) {
                occurrences.push((term.protect(), position));
                continue;
            }

            if !position.is_empty() {
                tests.push((position.clone(), match_key(&term)));
            }

            // Reverse the arguments so that the positions are visited in pre order.
            for (index, argument) in term.arguments().enumerate().rev() {
                let mut argument_position = position.clone();
                argument_position.push(index + 1);
                stack.push((argument, argument_position));
            }
        }

        // The first occurrence of every variable is used to bind it.
        let mut slots: Vec<ATerm> = Vec::new();
        let mut variables = Vec::new();
        for (variable, position) in &occurrences {
            if !slots.contains(variable) {
                slots.push(variable.clone());
                variables.push(position.clone());
            }
        }

        Announcement {
            rule: rule.clone(),
            tests,
            variables,
            equivalence_classes: derive_equivalence_classes(&occurrences),
            guard: rule.guard().map(|guard| TermTemplate::new(guard, &slots)),
            rhs: TermTemplate::new(rule.rhs(), &slots),
        }
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use crate::test_utility::create_rewrite_rule;

    use super::*;

    #[test]
    fn test_announcement() {
        let pool = TermPool::new();
        let rule = create_rewrite_rule(&pool, "f(s(x), g(y, 0), x)", "h(y)", &["x", "y"]).unwrap();
        let announcement = Announcement::new(&rule);

        let positions: Vec<String> = announcement.tests.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(positions, vec!["1", "2", "2.2"]);
        assert_eq!(
            announcement.variables,
            vec![ExplicitPosition::new(&[1, 1]), ExplicitPosition::new(&[2, 1])]
        );
        assert_eq!(announcement.equivalence_classes.len(), 1);
        assert_eq!(announcement.rhs.to_string(), "[Construct(h, 1), Variable(1)]");
    }
}
