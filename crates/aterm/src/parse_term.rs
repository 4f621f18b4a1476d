#![forbid(unsafe_code)]

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use merc_utilities::MercError;

use crate::ATerm;
use crate::ATermList;
use crate::TermPool;

#[derive(Parser)]
#[grammar = "term_grammar.pest"]
pub struct TermParser;

/// Parse a term from a string.
///
/// Grammar:  f(t_1, ..., t_n) | c | [t_1, ..., t_n]
///
/// Numbers are parsed as constants, the integer terms created by
/// [TermPool::create_int] have no textual representation of their own.
pub fn parse_term(pool: &TermPool, text: &str) -> Result<ATerm, MercError> {
    let mut result = TermParser::parse(Rule::TermSpec, text)?;
    let root = result.next().ok_or("Could not parse the term")?;
    let term = root.into_inner().next().ok_or("Could not parse the term")?;

    build_term(pool, term)
}

/// Constructs the term for a [Rule::Term] node.
fn build_term(pool: &TermPool, term: Pair<'_, Rule>) -> Result<ATerm, MercError> {
    let mut children = term.into_inner();
    let first = children.next().ok_or("A term must have a head")?;

    match first.as_rule() {
        Rule::List => {
            let elements = first
                .into_inner()
                .map(|element| build_term(pool, element))
                .collect::<Result<Vec<ATerm>, MercError>>()?;

            Ok(ATermList::from_double_iter(pool, elements.into_iter()).into())
        }
        Rule::Id => {
            let name = first.as_str();

            if let Some(args) = children.next() {
                let arguments = args
                    .into_inner()
                    .map(|argument| build_term(pool, argument))
                    .collect::<Result<Vec<ATerm>, MercError>>()?;

                let symbol = pool.create_symbol(name, arguments.len())?;
                Ok(pool.create_term(&symbol, &arguments))
            } else {
                let symbol = pool.create_symbol(name, 0)?;
                Ok(pool.create_constant(&symbol))
            }
        }
        rule => Err(format!("Unexpected rule {rule:?} in term").into()),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::Symb;
    use crate::Term;
    use crate::is_list_term;

    use super::*;

    #[test]
    fn test_parse_term() {
        let pool = TermPool::new();
        let term = parse_term(&pool, "f(a, g(b))").unwrap();

        assert_eq!(term.get_head_symbol().name().as_ref(), "f");
        assert_eq!(term.get_head_symbol().arity(), 2);
        assert_eq!(term.to_string(), "f(a, g(b))");
    }

    #[test]
    fn test_parse_list() {
        let pool = TermPool::new();
        let term = parse_term(&pool, "f([a, b], [])").unwrap();

        assert!(is_list_term(&term.arg(0)));
        assert_eq!(term.to_string(), "f([a,b], [])");
    }

    #[test]
    fn test_parse_whitespace() {
        let pool = TermPool::new();
        assert_eq!(
            parse_term(&pool, " f( a ,\n g(b) ) ").unwrap(),
            parse_term(&pool, "f(a,g(b))").unwrap()
        );
    }

    #[test]
    fn test_parse_numbers_as_constants() {
        let pool = TermPool::new();
        let term = parse_term(&pool, "s(0)").unwrap();

        assert_eq!(term.arg(0).get_head_symbol().name().as_ref(), "0");
        assert_eq!(term.arg(0).annotation(), None);
    }

    #[test]
    fn test_parse_errors() {
        let pool = TermPool::new();

        assert!(parse_term(&pool, "f(a").is_err());
        assert!(parse_term(&pool, "f()").is_err());
        assert!(parse_term(&pool, "f(a) g").is_err());
        assert!(parse_term(&pool, "").is_err());
    }
}
