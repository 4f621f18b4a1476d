#![forbid(unsafe_code)]

use thiserror::Error;

use merc_aterm::ATerm;
use merc_aterm::Symb;
use merc_aterm::Term;
use merc_aterm::TermPool;

use crate::Announcement;
use crate::MatchKey;
use crate::MatchNode;
use crate::MatchTree;
use crate::ReservedTerms;
use crate::match_key;
use crate::utilities::TemplateNode;
use crate::utilities::TermTemplate;

use super::ArgumentAnalysis;
use super::Constant;
use super::Instruction;
use super::Program;

/// The bounds on the programs produced by the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// The maximum number of instructions in a single program.
    pub max_program_size: usize,
    /// The maximum number of registers in a single program.
    pub max_registers: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_program_size: 1 << 16,
            max_registers: 256,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("the program exceeds the maximum of {0} instructions")]
    ProgramTooLarge(usize),

    #[error("a rule binds more than the maximum of {0} registers")]
    TooManyRegisters(usize),

    #[error("the rules for {0} cannot be compiled")]
    UnsupportedSymbol(String),

    #[error("instruction {instruction} jumps to {target}, which is outside of the program")]
    InvalidJump { instruction: usize, target: usize },

    #[error("instruction {instruction} uses register {register}, which does not exist")]
    InvalidRegister { instruction: usize, register: usize },

    #[error("instruction {instruction} refers to constant {constant}, which has the wrong kind or does not exist")]
    InvalidConstant { instruction: usize, constant: usize },

    #[error("the stack height at instruction {instruction} is inconsistent")]
    StackMismatch { instruction: usize },
}

/// Compiles the match tree for the rules of a single head symbol into a program.
pub fn compile(
    tree: &MatchTree,
    analysis: &ArgumentAnalysis,
    reserved: &ReservedTerms,
    config: &CompilerConfig,
) -> Result<Program, CompileError> {
    let Some(first) = tree.announcements().first() else {
        return Ok(Program::new(vec![Instruction::ReturnSubject], Vec::new(), 0));
    };

    if let MatchKey::Int(value) = match_key(first.rule.lhs()) {
        return Err(CompileError::UnsupportedSymbol(value.to_string()));
    }

    let mut compiler = Compiler {
        pool: reserved.true_term.pool(),
        analysis,
        config,
        code: Vec::new(),
        constants: vec![Constant::Term(reserved.true_term.clone())],
        registers: 0,
        true_constant: 0,
    };

    compiler.node(tree, 0)?;

    Ok(Program::new(compiler.code, compiler.constants, compiler.registers))
}

struct Compiler<'a> {
    pool: &'a TermPool,
    analysis: &'a ArgumentAnalysis,
    config: &'a CompilerConfig,
    code: Vec<Instruction>,
    constants: Vec<Constant>,
    registers: usize,
    true_constant: usize,
}

impl Compiler<'_> {
    /// Appends the instruction and returns its index.
    fn emit(&mut self, instruction: Instruction) -> Result<usize, CompileError> {
        if self.code.len() >= self.config.max_program_size {
            return Err(CompileError::ProgramTooLarge(self.config.max_program_size));
        }

        self.code.push(instruction);
        Ok(self.code.len() - 1)
    }

    /// Sets the target of the jump instruction at the given index to the next instruction.
    fn patch(&mut self, index: usize) {
        let target = self.code.len();
        match &mut self.code[index] {
            Instruction::JumpIfNotKey(_, jump) | Instruction::JumpIfNotEqual(jump) => *jump = target,
            instruction => unreachable!("Only jumps can be patched, found {instruction}"),
        }
    }

    /// Returns the index of the constant, shared constants are stored once.
    fn constant(&mut self, constant: Constant) -> usize {
        match self.constants.iter().position(|c| *c == constant) {
            Some(index) => index,
            None => {
                self.constants.push(constant);
                self.constants.len() - 1
            }
        }
    }

    /// Compiles the subtree of the match tree, the stack is empty at every node.
    fn node(&mut self, tree: &MatchTree, node: usize) -> Result<(), CompileError> {
        match &tree.nodes()[node] {
            MatchNode::Switch {
                position,
                branches,
                default,
            } => {
                let position = self.constant(Constant::Position(position.clone()));
                self.emit(Instruction::LoadPosition(position))?;

                for (key, child) in branches {
                    let key = self.constant(Constant::Key(*key));
                    let jump = self.emit(Instruction::JumpIfNotKey(key, 0))?;
                    self.emit(Instruction::Pop)?;
                    self.node(tree, *child)?;
                    self.patch(jump);
                }

                self.emit(Instruction::Pop)?;
                match default {
                    Some(child) => self.node(tree, *child)?,
                    None => {
                        self.emit(Instruction::ReturnSubject)?;
                    }
                }
            }
            MatchNode::Leaf { candidates } => {
                for candidate in candidates {
                    self.candidate(&tree.announcements()[*candidate])?;
                }

                self.emit(Instruction::ReturnSubject)?;
            }
        }

        Ok(())
    }

    /// Compiles the checks that remain after the match tree for the rule,
    /// continues after the rule when one of them fails.
    fn candidate(&mut self, announcement: &Announcement) -> Result<(), CompileError> {
        if announcement.variables.len() > self.config.max_registers {
            return Err(CompileError::TooManyRegisters(self.config.max_registers));
        }
        self.registers = self.registers.max(announcement.variables.len());

        let mut failures = Vec::new();
        for class in &announcement.equivalence_classes {
            if let Some((first, others)) = class.positions.split_first() {
                let first = self.constant(Constant::Position(first.clone()));
                for other in others {
                    let other = self.constant(Constant::Position(other.clone()));
                    self.emit(Instruction::LoadPosition(first))?;
                    self.emit(Instruction::LoadPosition(other))?;
                    failures.push(self.emit(Instruction::JumpIfNotEqual(0))?);
                }
            }
        }

        for (register, position) in announcement.variables.iter().enumerate() {
            let position = self.constant(Constant::Position(position.clone()));
            self.emit(Instruction::LoadPosition(position))?;
            self.emit(Instruction::Store(register))?;
        }

        if let Some(guard) = &announcement.guard {
            self.template(guard)?;
            self.emit(Instruction::PushConstant(self.true_constant))?;
            failures.push(self.emit(Instruction::JumpIfNotEqual(0))?);
        }

        self.template(&announcement.rhs)?;
        self.emit(Instruction::Return)?;

        for failure in failures {
            self.patch(failure);
        }

        Ok(())
    }

    /// Emits the code that pushes the normal form of the instantiated template.
    fn template(&mut self, template: &TermTemplate) -> Result<(), CompileError> {
        let next = self.template_node(template.nodes(), 0)?;
        debug_assert_eq!(next, template.nodes().len(), "The whole template must be compiled");
        Ok(())
    }

    fn template_node(&mut self, nodes: &[TemplateNode], node: usize) -> Result<usize, CompileError> {
        match &nodes[node] {
            TemplateNode::Variable(slot) => {
                self.emit(Instruction::Load(*slot))?;
            }
            TemplateNode::Term(term) => {
                let constant = self.constant(Constant::Term(term.clone()));
                self.emit(Instruction::PushConstant(constant))?;
                if !self.analysis.is_normal(nodes, node).0 {
                    self.emit(Instruction::Rewrite)?;
                }
            }
            TemplateNode::Construct(symbol, arity) => {
                // Subterms that are normal by construction and do not depend on the bindings are created once.
                let (normal, end) = self.analysis.is_normal(nodes, node);
                if normal {
                    if let Some(term) = ground_term(self.pool, &nodes[node..end]) {
                        let constant = self.constant(Constant::Term(term));
                        self.emit(Instruction::PushConstant(constant))?;
                        return Ok(end);
                    }
                }

                // The arguments are in normal form when the application is constructed.
                let mut next = node + 1;
                for _ in 0..*arity {
                    next = self.template_node(nodes, next)?;
                }

                let constant = self.constant(Constant::Symbol(symbol.clone()));
                if self.analysis.is_constructor(symbol.shared()) {
                    self.emit(Instruction::Construct(constant, *arity))?;
                } else {
                    self.emit(Instruction::Call(constant, *arity))?;
                }

                return Ok(next);
            }
        }

        Ok(node + 1)
    }
}

/// Returns the term described by the nodes of a subtemplate, or None when it contains a variable slot.
fn ground_term(pool: &TermPool, nodes: &[TemplateNode]) -> Option<ATerm> {
    let mut stack: Vec<ATerm> = Vec::with_capacity(nodes.len());

    for node in nodes.iter().rev() {
        match node {
            TemplateNode::Construct(symbol, arity) => {
                let length = stack.len();
                let term = pool.create_term_iter(symbol, stack.drain(length - arity..).rev());
                stack.push(term);
            }
            TemplateNode::Variable(_) => return None,
            TemplateNode::Term(term) => stack.push(term.clone()),
        }
    }

    stack.pop()
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;

    use crate::RewriteSpecification;
    use crate::RuleSet;
    use crate::compiling::verify;
    use crate::test_utility::create_conditional_rewrite_rule;
    use crate::test_utility::create_rewrite_rule;

    use super::*;

    fn compile_rules(
        pool: &TermPool,
        spec: &RewriteSpecification,
        config: &CompilerConfig,
    ) -> Result<Program, CompileError> {
        let rules = RuleSet::new(spec);
        let analysis = ArgumentAnalysis::new(&rules);
        let reserved = ReservedTerms::new(pool).unwrap();
        let lhs = spec.rewrite_rules()[0].lhs();
        compile(rules.tree(&match_key(lhs)).unwrap(), &analysis, &reserved, config)
    }

    #[test]
    fn test_compile_and_verify() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            create_rewrite_rule(&pool, "f(x, x)", "g(x)", &["x"]).unwrap(),
            create_conditional_rewrite_rule(&pool, "f(s(x), y)", "less(x, y)", "f(x, y)", &["x", "y"]).unwrap(),
            create_rewrite_rule(&pool, "f(0, y)", "y", &["y"]).unwrap(),
        ])
        .unwrap();

        let program = compile_rules(&pool, &spec, &CompilerConfig::default()).unwrap();
        assert_eq!(verify(&program), Ok(()), "{program}");
        assert_eq!(program.registers(), 2);
        assert!(program.code().contains(&Instruction::Return));
        assert!(
            program
                .code()
                .iter()
                .any(|instruction| matches!(instruction, Instruction::Call(_, 2))),
            "The recursive call to f must normalize, {program}"
        );
    }

    #[test]
    fn test_compile_normal_subterms() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            create_rewrite_rule(&pool, "f(x)", "pair(x, s(s(0)), s(f(0)))", &["x"]).unwrap(),
            create_rewrite_rule(&pool, "f(0)", "0", &[]).unwrap(),
        ])
        .unwrap();

        let program = compile_rules(&pool, &spec, &CompilerConfig::default()).unwrap();
        assert_eq!(verify(&program), Ok(()), "{program}");

        // The ground constructor term s(s(0)) is created by the compiler.
        let constant = Constant::Term(pool.from_string("s(s(0))").unwrap());
        assert!(program.constants().contains(&constant), "{program}");

        // The argument of s(f(0)) must still be rewritten.
        let calls = program
            .code()
            .iter()
            .filter(|instruction| matches!(instruction, Instruction::Call(_, 1)))
            .count();
        assert_eq!(calls, 1, "{program}");
    }

    #[test]
    fn test_compile_limits() {
        let pool = TermPool::new();
        let spec = RewriteSpecification::new(vec![
            create_rewrite_rule(&pool, "f(x, y)", "g(x, y)", &["x", "y"]).unwrap(),
        ])
        .unwrap();

        let config = CompilerConfig {
            max_program_size: 2,
            ..CompilerConfig::default()
        };
        assert_eq!(compile_rules(&pool, &spec, &config).unwrap_err(), CompileError::ProgramTooLarge(2));

        let config = CompilerConfig {
            max_registers: 1,
            ..CompilerConfig::default()
        };
        assert_eq!(compile_rules(&pool, &spec, &config).unwrap_err(), CompileError::TooManyRegisters(1));
    }

    #[test]
    fn test_compile_int_rules() {
        let pool = TermPool::new();
        let lhs = pool.create_int(3);
        let rhs = pool.from_string("three").unwrap();
        let spec = RewriteSpecification::new(vec![crate::Rule::new(lhs, None, rhs).unwrap()]).unwrap();

        assert_eq!(
            compile_rules(&pool, &spec, &CompilerConfig::default()).unwrap_err(),
            CompileError::UnsupportedSymbol("3".to_string())
        );
    }
}
