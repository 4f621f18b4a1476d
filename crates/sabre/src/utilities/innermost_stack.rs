#![forbid(unsafe_code)]

use std::fmt;

use merc_aterm::ATermIndex;
use merc_aterm::ATermRef;
use merc_aterm::Markable;
use merc_aterm::Protected;
use merc_aterm::ProtectedWriteGuard;
use merc_aterm::SymbolIndex;
use merc_aterm::SymbolRef;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::storage::Marker;

use super::TemplateNode;
use super::TermTemplate;

/// An instruction on the configuration stack of the [InnermostStack].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Config {
    /// Rewrite the top of the term stack and put the result at the given index.
    Rewrite(usize),
    /// Constructs function symbol with given arity from the top of the
    /// term stack, rewrites it and puts the result at the given index.
    Construct(SymbolIndex, usize, usize),
    /// Yields the top of the term stack as returned term.
    Return(),
}

impl Markable for Config {
    fn mark(&self, marker: &mut Marker) {
        if let Config::Construct(symbol, _, _) = self {
            marker.mark_symbol(symbol);
        }
    }

    fn contains_term(&self, _term: &ATermIndex) -> bool {
        false
    }

    fn contains_symbol(&self, symbol: &SymbolIndex) -> bool {
        matches!(self, Config::Construct(s, _, _) if s == symbol)
    }

    fn len(&self) -> usize {
        if let Config::Construct(_, _, _) = self { 1 } else { 0 }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Config::Rewrite(result) => write!(f, "Rewrite({result})"),
            Config::Construct(symbol, arity, result) => {
                write!(f, "Construct({symbol}, {arity}, {result})")
            }
            Config::Return() => write!(f, "Return()"),
        }
    }
}

/// This stack is used to avoid recursion and also to keep track of terms in
/// normal forms by explicitly representing the rewrites of a right hand
/// side.
pub struct InnermostStack {
    pub configs: Protected<Vec<Config>>,
    pub terms: Protected<Vec<Option<ATermIndex>>>,
}

impl InnermostStack {
    pub fn new(pool: &TermPool) -> InnermostStack {
        InnermostStack {
            configs: Protected::with_default(pool),
            terms: Protected::with_default(pool),
        }
    }

    /// Updates the InnermostStack to construct the right-hand side for the
    /// given bindings, and place its normal form at the result index. The
    /// bindings must be in normal form.
    pub fn integrate(
        write_configs: &mut ProtectedWriteGuard<Vec<Config>>,
        write_terms: &mut ProtectedWriteGuard<Vec<Option<ATermIndex>>>,
        rhs: &TermTemplate,
        bindings: &[ATermRef<'_>],
        result_index: usize,
    ) {
        let next = Self::integrate_node(write_configs, write_terms, rhs.nodes(), 0, bindings, result_index);
        debug_assert_eq!(next, rhs.nodes().len(), "The whole template must be integrated");
    }

    /// Integrates the subtemplate starting at the given node, returns the node after the subtemplate.
    fn integrate_node(
        write_configs: &mut ProtectedWriteGuard<Vec<Config>>,
        write_terms: &mut ProtectedWriteGuard<Vec<Option<ATermIndex>>>,
        nodes: &[TemplateNode],
        node: usize,
        bindings: &[ATermRef<'_>],
        result_index: usize,
    ) -> usize {
        match &nodes[node] {
            TemplateNode::Variable(slot) => {
                // Bindings are already in normal form, so they are placed on the result immediately.
                write_terms[result_index] = Some(write_terms.protect(&bindings[*slot]));
                node + 1
            }
            TemplateNode::Term(term) => {
                Self::add_rewrite(write_configs, write_terms, term.copy(), result_index);
                node + 1
            }
            TemplateNode::Construct(symbol, arity) => {
                // Reserve the arguments, their configurations are performed before the construction.
                let top_of_stack = write_terms.len();
                for _ in 0..*arity {
                    write_terms.push(None);
                }

                Self::add_result(write_configs, symbol.copy(), *arity, result_index);

                let mut next = node + 1;
                for offset in 0..*arity {
                    next = Self::integrate_node(write_configs, write_terms, nodes, next, bindings, top_of_stack + offset);
                }
                next
            }
        }
    }

    /// Indicate that the given symbol with arity can be constructed at the given index.
    pub fn add_result(
        write_configs: &mut ProtectedWriteGuard<Vec<Config>>,
        symbol: SymbolRef<'_>,
        arity: usize,
        index: usize,
    ) {
        let symbol = write_configs.protect_symbol(&symbol);
        write_configs.push(Config::Construct(symbol, arity, index));
    }

    /// Indicate that the term must be rewritten and its result must be placed at the given index.
    pub fn add_rewrite(
        write_configs: &mut ProtectedWriteGuard<Vec<Config>>,
        write_terms: &mut ProtectedWriteGuard<Vec<Option<ATermIndex>>>,
        term: ATermRef<'_>,
        index: usize,
    ) {
        let term = write_terms.protect(&term);
        write_configs.push(Config::Rewrite(index));
        write_terms.push(Some(term));
    }
}

impl fmt::Display for InnermostStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.terms.read();
        writeln!(f, "Terms: [")?;
        for (i, entry) in terms.iter().enumerate() {
            match entry {
                Some(term) => writeln!(f, "{i}\t{}", terms.term(term))?,
                None => writeln!(f, "{i}\tNone")?,
            }
        }
        writeln!(f, "]")?;

        writeln!(f, "Configs: [")?;
        for config in self.configs.read().iter() {
            writeln!(f, "\t{config}")?;
        }
        write!(f, "]")
    }
}
