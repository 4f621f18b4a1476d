#![forbid(unsafe_code)]

use std::fmt;

use merc_aterm::ATerm;
use merc_aterm::Symbol;

use crate::MatchKey;
use crate::utilities::ExplicitPosition;

/// A single instruction of a [Program].
///
/// Every program operates on the subject, which is the term whose arguments
/// are in normal form and whose head symbol the program was compiled for, an
/// operand stack of terms and a fixed number of registers. All the terms on
/// the operand stack, except the subterms loaded from the subject positions
/// during matching, are in normal form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Pushes the subterm of the subject at the position constant.
    LoadPosition(usize),
    /// Jumps to the target when the key of the top of the stack differs from the key constant, does not pop.
    JumpIfNotKey(usize, usize),
    /// Pops two terms and jumps to the target when they differ.
    JumpIfNotEqual(usize),
    /// Removes the top of the stack.
    Pop,
    /// Pops the top of the stack into the register.
    Store(usize),
    /// Pushes the contents of the register.
    Load(usize),
    /// Pushes the term constant.
    PushConstant(usize),
    /// Pops the arguments and pushes the application of the symbol constant, which has no rules.
    Construct(usize, usize),
    /// Pops the arguments and pushes the normal form of the application of the symbol constant.
    Call(usize, usize),
    /// Replaces the top of the stack, whose arguments are in normal form, by its normal form.
    Rewrite,
    /// Returns the top of the stack, which is the normal form of the subject.
    Return,
    /// No rule applies, the subject is in normal form.
    ReturnSubject,
}

/// The constants that instructions refer to by index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    Position(ExplicitPosition),
    Key(MatchKey),
    Symbol(Symbol),
    Term(ATerm),
}

/// The bytecode for the rules of a single head symbol.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) code: Vec<Instruction>,
    pub(crate) constants: Vec<Constant>,
    pub(crate) registers: usize,
}

impl Program {
    pub fn new(code: Vec<Instruction>, constants: Vec<Constant>, registers: usize) -> Program {
        Program {
            code,
            constants,
            registers,
        }
    }

    /// Returns the instructions of the program.
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Returns the constant table of the program.
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Returns the number of registers that the program uses.
    pub fn registers(&self) -> usize {
        self.registers
    }

    pub(crate) fn position(&self, index: usize) -> &ExplicitPosition {
        match &self.constants[index] {
            Constant::Position(position) => position,
            constant => unreachable!("Verified programs only load positions, found {constant}"),
        }
    }

    pub(crate) fn key(&self, index: usize) -> &MatchKey {
        match &self.constants[index] {
            Constant::Key(key) => key,
            constant => unreachable!("Verified programs only compare keys, found {constant}"),
        }
    }

    pub(crate) fn symbol(&self, index: usize) -> &Symbol {
        match &self.constants[index] {
            Constant::Symbol(symbol) => symbol,
            constant => unreachable!("Verified programs only construct symbols, found {constant}"),
        }
    }

    pub(crate) fn term(&self, index: usize) -> &ATerm {
        match &self.constants[index] {
            Constant::Term(term) => term,
            constant => unreachable!("Verified programs only push terms, found {constant}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadPosition(position) => write!(f, "load_position #{position}"),
            Instruction::JumpIfNotKey(key, target) => write!(f, "jump_if_not_key #{key} @{target}"),
            Instruction::JumpIfNotEqual(target) => write!(f, "jump_if_not_equal @{target}"),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Store(register) => write!(f, "store r{register}"),
            Instruction::Load(register) => write!(f, "load r{register}"),
            Instruction::PushConstant(term) => write!(f, "push #{term}"),
            Instruction::Construct(symbol, arity) => write!(f, "construct #{symbol} {arity}"),
            Instruction::Call(symbol, arity) => write!(f, "call #{symbol} {arity}"),
            Instruction::Rewrite => write!(f, "rewrite"),
            Instruction::Return => write!(f, "return"),
            Instruction::ReturnSubject => write!(f, "return_subject"),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Position(position) => write!(f, "position {position}"),
            Constant::Key(MatchKey::Symbol(symbol)) => write!(f, "symbol key {symbol}"),
            Constant::Key(MatchKey::Int(value)) => write!(f, "int key {value}"),
            Constant::Symbol(symbol) => write!(f, "symbol {symbol:?}"),
            Constant::Term(term) => write!(f, "term {term}"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "registers: {}", self.registers)?;
        for (index, constant) in self.constants.iter().enumerate() {
            writeln!(f, "#{index}\t{constant}")?;
        }

        for (index, instruction) in self.code.iter().enumerate() {
            writeln!(f, "@{index}\t{instruction}")?;
        }

        Ok(())
    }
}
