#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use merc_aterm::ATerm;
use merc_aterm::ATermRef;
use merc_aterm::Symb;
use merc_aterm::Symbol;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::is_int_term;

use crate::is_variable;

/// A node of a [TermTemplate].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TemplateNode {
    /// An application of the symbol with the given arity, its arguments are the next nodes.
    Construct(Symbol, usize),
    /// The term bound to the variable with the given slot.
    Variable(usize),
    /// A term that is used as is, for example an integer.
    Term(ATerm),
}

/// A term with free variables, stored in pre order, that can be instantiated
/// efficiently.
///
/// Variables are replaced by slots, which index the terms that were bound
/// while matching the left-hand side of a rewrite rule.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TermTemplate {
    nodes: Vec<TemplateNode>,
}

impl TermTemplate {
    /// Creates a template for the given term where the variables in `slots`
    /// are replaced by their index. Variables that have no slot are kept as is.
    pub fn new(term: &ATerm, slots: &[ATerm]) -> TermTemplate {
        let mut nodes = Vec::new();
        let mut stack: Vec<ATermRef<'_>> = vec![term.copy()];

        while let Some(current) = stack.pop() {
            if is_variable(&current) {
                match slots.iter().position(|variable| *variable == current) {
                    Some(slot) => nodes.push(TemplateNode::Variable(slot)),
                    None => nodes.push(TemplateNode::Term(current.protect())),
                }
            } else if is_int_term(&current) {
                nodes.push(TemplateNode::Term(current.protect()));
            } else {
                let symbol = current.get_head_symbol();
                nodes.push(TemplateNode::Construct(symbol.protect(), symbol.arity()));

                // Reverse the arguments so that the first argument is popped first.
                stack.extend(current.arguments().rev());
            }
        }

        TermTemplate { nodes }
    }

    /// Returns the nodes of the template in pre order.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Instantiates the template with the given bindings for the slots.
    pub fn evaluate(&self, pool: &TermPool, bindings: &[ATermRef<'_>]) -> ATerm {
        let mut stack: Vec<ATerm> = Vec::with_capacity(self.nodes.len());

        // In reverse pre order all arguments are available before the application.
        for node in self.nodes.iter().rev() {
            match node {
                TemplateNode::Construct(symbol, arity) => {
                    let length = stack.len();
                    let term = pool.create_term_iter(symbol, stack.drain(length - arity..).rev());
                    stack.push(term);
                }
                TemplateNode::Variable(slot) => stack.push(bindings[*slot].protect()),
                TemplateNode::Term(term) => stack.push(term.clone()),
            }
        }

        debug_assert_eq!(stack.len(), 1, "Expect exactly one term on the result stack");
        stack.pop().unwrap_or_else(|| pool.empty_list().protect())
    }
}

impl fmt::Display for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateNode::Construct(symbol, arity) => write!(f, "Construct({symbol}, {arity})"),
            TemplateNode::Variable(slot) => write!(f, "Variable({slot})"),
            TemplateNode::Term(term) => write!(f, "Term({term})"),
        }
    }
}

impl fmt::Display for TermTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.nodes.iter().format(", "))
    }
}
