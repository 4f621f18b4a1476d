#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

use merc_aterm::ATerm;
use merc_aterm::Term;

use crate::DisplayPattern;
use crate::is_variable;
use crate::utilities::PositionIterator;

/// The reasons why a rewrite rule is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("variable {variable} of rule {rule} does not occur in the left-hand side")]
    UnboundVariable { variable: String, rule: String },

    #[error("the left-hand side of rule {rule} is a variable")]
    VariableLeftHandSide { rule: String },
}

/// A rewrite rule `lhs = rhs`, which can only be applied when the optional
/// guard normalizes to `true`.
///
/// The variables of the guard and the right-hand side all occur in the
/// left-hand side, and the left-hand side is not a variable itself.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Rule {
    lhs: ATerm,
    guard: Option<ATerm>,
    rhs: ATerm,
}

impl Rule {
    /// Creates a new rewrite rule, checks that the rule is well-formed.
    pub fn new(lhs: ATerm, guard: Option<ATerm>, rhs: ATerm) -> Result<Rule, RuleError> {
        let rule = Rule { lhs, guard, rhs };
        rule.validate()?;
        Ok(rule)
    }

    /// Returns the left-hand side of the rule.
    pub fn lhs(&self) -> &ATerm {
        &self.lhs
    }

    /// Returns the guard of the rule, if any.
    pub fn guard(&self) -> Option<&ATerm> {
        self.guard.as_ref()
    }

    /// Returns the right-hand side of the rule.
    pub fn rhs(&self) -> &ATerm {
        &self.rhs
    }

    /// Checks that the rule can be applied.
    fn validate(&self) -> Result<(), RuleError> {
        if is_variable(&self.lhs) {
            return Err(RuleError::VariableLeftHandSide { rule: self.to_string() });
        }

        let bound: Vec<ATerm> = variables(&self.lhs);
        for term in self.guard.iter().chain(std::iter::once(&self.rhs)) {
            for variable in variables(term) {
                if !bound.contains(&variable) {
                    return Err(RuleError::UnboundVariable {
                        variable: DisplayPattern(variable.copy()).to_string(),
                        rule: self.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Returns the variables that occur in the given term.
fn variables(term: &ATerm) -> Vec<ATerm> {
    PositionIterator::new(term.copy())
        .filter(|(subterm, _)| is_variable(subterm))
        .map(|(subterm, _)| subterm.protect())
        .collect()
}

/// A rewrite specification is a list of rewrite rules, given by [Rule], in registration order.
#[derive(Debug, Default, Clone)]
pub struct RewriteSpecification {
    rewrite_rules: Vec<Rule>,
}

impl RewriteSpecification {
    /// Create a new rewrite specification, the order of the rules is preserved.
    pub fn new(rewrite_rules: Vec<Rule>) -> Result<RewriteSpecification, RuleError> {
        for rule in &rewrite_rules {
            rule.validate()?;
        }

        Ok(RewriteSpecification { rewrite_rules })
    }

    /// Returns the rewrite rules of this specification.
    pub fn rewrite_rules(&self) -> &[Rule] {
        &self.rewrite_rules
    }
}

impl fmt::Display for RewriteSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rewrite_rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}",
            DisplayPattern(self.lhs.copy()),
            DisplayPattern(self.rhs.copy())
        )?;

        if let Some(guard) = &self.guard {
            write!(f, " if {}", DisplayPattern(guard.copy()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use crate::test_utility::create_conditional_rewrite_rule;
    use crate::test_utility::create_rewrite_rule;

    use super::*;

    #[test]
    fn test_rule_display() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            create_rewrite_rule(&pool, "f(s(x))", "f(x)", &["x"]).unwrap(),
            create_conditional_rewrite_rule(&pool, "g(x, y)", "eq(x, y)", "x", &["x", "y"]).unwrap(),
        ])
        .unwrap();

        assert_eq!(spec.to_string(), "f(s(x)) = f(x)\ng(x, y) = x if eq(x, y)\n");
    }

    #[test]
    fn test_unbound_variable() {
        let pool = TermPool::new();

        let result = create_rewrite_rule(&pool, "f(x)", "g(x, y)", &["x", "y"]);
        let error = result.unwrap_err();
        assert_eq!(
            error.downcast_ref::<RuleError>(),
            Some(&RuleError::UnboundVariable {
                variable: "y".to_string(),
                rule: "f(x) = g(x, y)".to_string()
            })
        );

        let guard = create_conditional_rewrite_rule(&pool, "f(x)", "h(z)", "x", &["x", "z"]);
        assert!(guard.is_err(), "Guard variables must be bound by the left-hand side");
    }

    #[test]
    fn test_variable_left_hand_side() {
        let pool = TermPool::new();

        let result = create_rewrite_rule(&pool, "x", "a", &["x"]);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<RuleError>(),
            Some(RuleError::VariableLeftHandSide { .. })
        ));
    }
}
