#![forbid(unsafe_code)]

use merc_aterm::TermPool;
use merc_utilities::MercError;

use crate::Rule;
use crate::to_variables;

/// Create a rewrite rule lhs -> rhs with the given names being variables.
pub fn create_rewrite_rule(pool: &TermPool, lhs: &str, rhs: &str, variables: &[&str]) -> Result<Rule, MercError> {
    let lhs = to_variables(pool, &pool.from_string(lhs)?, variables)?;
    let rhs = to_variables(pool, &pool.from_string(rhs)?, variables)?;

    Ok(Rule::new(lhs, None, rhs)?)
}

/// Create a rewrite rule lhs -> rhs that is only applied when the guard normalizes to `true`.
pub fn create_conditional_rewrite_rule(
    pool: &TermPool,
    lhs: &str,
    guard: &str,
    rhs: &str,
    variables: &[&str],
) -> Result<Rule, MercError> {
    let lhs = to_variables(pool, &pool.from_string(lhs)?, variables)?;
    let guard = to_variables(pool, &pool.from_string(guard)?, variables)?;
    let rhs = to_variables(pool, &pool.from_string(rhs)?, variables)?;

    Ok(Rule::new(lhs, Some(guard), rhs)?)
}
