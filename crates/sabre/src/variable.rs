#![forbid(unsafe_code)]

use std::fmt;
use std::rc::Rc;

use merc_aterm::ATerm;
use merc_aterm::ATermRef;
use merc_aterm::Symb;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::TermPoolError;
use merc_aterm::is_int_term;
use merc_aterm::is_list_term;

/// The name of the function symbol that marks a variable, the argument is a constant with the name of the variable.
pub const VARIABLE_SYMBOL_NAME: &str = "DataVarId";

/// Returns true iff the term is a variable `DataVarId(name)`.
pub fn is_variable<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    let symbol = t.get_head_symbol();
    symbol.arity() == 1 && &*symbol.name() == VARIABLE_SYMBOL_NAME
}

/// Returns the name of the given variable.
pub fn variable_name<'a, 'b>(t: &'b impl Term<'a, 'b>) -> Rc<str> {
    debug_assert!(is_variable(t), "Term {} is not a variable", t.copy());
    t.arg(0).get_head_symbol().name()
}

/// Creates the variable with the given name.
pub fn create_variable(pool: &TermPool, name: &str) -> Result<ATerm, TermPoolError> {
    let symbol = pool.create_symbol(VARIABLE_SYMBOL_NAME, 1)?;
    let name = pool.create_constant(&pool.create_symbol(name, 0)?);
    Ok(pool.create_term(&symbol, &[name]))
}

/// Replaces every constant whose name occurs in `variables` by the variable with that name.
pub fn to_variables(pool: &TermPool, term: &ATerm, variables: &[&str]) -> Result<ATerm, TermPoolError> {
    let mut arguments = Vec::new();
    for arg in term.arguments() {
        arguments.push(to_variables(pool, &arg.protect(), variables)?);
    }

    let symbol = term.get_head_symbol();
    if arguments.is_empty() {
        if !is_int_term(term) && variables.contains(&&*symbol.name()) {
            return create_variable(pool, &symbol.name());
        }

        return Ok(term.clone());
    }

    Ok(pool.create_term(&symbol, &arguments))
}

/// Displays a term with variables printed as their name.
pub struct DisplayPattern<'a>(pub ATermRef<'a>);

impl fmt::Display for DisplayPattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = self.0;
        if is_variable(&term) {
            return write!(f, "{}", variable_name(&term));
        }

        if is_int_term(&term) || is_list_term(&term) || term.arguments().is_empty() {
            return write!(f, "{term}");
        }

        write!(f, "{}(", term.get_head_symbol().name())?;
        for (index, arg) in term.arguments().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", DisplayPattern(arg))?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_variables() {
        let pool = TermPool::new();
        let term = pool.from_string("f(x, g(y, a))").unwrap();

        let pattern = to_variables(&pool, &term, &["x", "y"]).unwrap();
        assert!(is_variable(&pattern.arg(0)));
        assert_eq!(&*variable_name(&pattern.arg(0)), "x");
        assert!(!is_variable(&pattern.arg(1).arg(1)));

        assert_eq!(pattern.to_string(), "f(DataVarId(x), g(DataVarId(y), a))");
        assert_eq!(DisplayPattern(pattern.copy()).to_string(), "f(x, g(y, a))");
    }
}
