#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use merc_aterm::ATerm;
use merc_aterm::ATermRef;
use merc_aterm::Term;

use crate::DisplayPattern;
use crate::utilities::ExplicitPosition;
use crate::utilities::PositionIndexed;

/// An equivalence class is a variable with (multiple) positions. This is
/// necessary for non-linear patterns.
///
/// # Example
/// Suppose we have a pattern f(x,x), where x is a variable. Then it will have
/// one equivalence class storing "x" and the positions 1 and 2. The function
/// check_equivalence_classes checks whether the term has the same term on those
/// positions. For example, it will returns false on the term f(a, b) and true
/// on the term f(a, a).
#[derive(Hash, Clone, Eq, PartialEq, Debug)]
pub struct EquivalenceClass {
    pub variable: ATerm,
    pub positions: Vec<ExplicitPosition>,
}

/// Derives the positions in a pattern with same variable (for non-linear
/// patterns) from the occurrences of variables, given in pre order.
pub fn derive_equivalence_classes(occurrences: &[(ATerm, ExplicitPosition)]) -> Vec<EquivalenceClass> {
    let mut var_equivalences: Vec<EquivalenceClass> = vec![];

    for (variable, position) in occurrences {
        match var_equivalences.iter_mut().find(|ec| ec.variable == *variable) {
            Some(ec) => {
                if !ec.positions.contains(position) {
                    ec.positions.push(position.clone());
                }
            }
            None => var_equivalences.push(EquivalenceClass {
                variable: variable.clone(),
                positions: vec![position.clone()],
            }),
        }
    }

    // Discard variables that only occur once
    var_equivalences.retain(|x| x.positions.len() > 1);
    var_equivalences
}

/// Checks if the equivalence classes hold for the given term.
pub fn check_equivalence_classes(term: ATermRef<'_>, eqs: &[EquivalenceClass]) -> bool {
    eqs.iter().all(|ec| {
        debug_assert!(
            ec.positions.len() >= 2,
            "An equivalence class must contain at least two positions"
        );

        // The term at the first position must be equivalent to all other positions.
        let mut iter_pos = ec.positions.iter();
        match iter_pos.next() {
            Some(first) => {
                let first = term.get_position(first);
                iter_pos.all(|other_pos| first == term.get_position(other_pos))
            }
            None => true,
        }
    })
}

impl fmt::Display for EquivalenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{ {} }}",
            DisplayPattern(self.variable.copy()),
            self.positions.iter().format(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use crate::Announcement;
    use crate::test_utility::create_rewrite_rule;

    use super::*;

    #[test]
    fn test_derive_equivalence_classes() {
        let pool = TermPool::new();
        let rule = create_rewrite_rule(&pool, "f(x, h(x))", "result", &["x"]).unwrap();
        let announcement = Announcement::new(&rule);
        let eq = &announcement.equivalence_classes;

        assert_eq!(eq.len(), 1);
        assert_eq!(
            eq[0].positions,
            vec![ExplicitPosition::new(&[1]), ExplicitPosition::new(&[2, 1])],
            "The resulting equivalence class is not as expected"
        );
        assert_eq!(eq[0].to_string(), "x{ 1, 2.1 }");

        // Check the equivalence class for an example
        let expression = pool.from_string("f(a(b), h(a(b)))").unwrap();
        assert!(
            check_equivalence_classes(expression.copy(), eq),
            "The equivalence classes are not checked correctly, equivalences: {:?} and term {}",
            &eq,
            &expression
        );

        let expression = pool.from_string("f(a(b), h(a(c)))").unwrap();
        assert!(!check_equivalence_classes(expression.copy(), eq));
    }
}
