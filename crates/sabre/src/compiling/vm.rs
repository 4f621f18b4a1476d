#![forbid(unsafe_code)]

use std::rc::Rc;

use smallvec::SmallVec;
use smallvec::smallvec;

use merc_aterm::ATerm;
use merc_aterm::Term;
use merc_utilities::debug_trace;

use crate::CompilingRewriter;
use crate::RewritingStatistics;
use crate::match_key;
use crate::utilities::PositionIndexed;

use super::Instruction;
use super::Program;

/// The state of a program that is being executed.
struct Frame {
    program: Rc<Program>,
    pc: usize,
    subject: ATerm,
    registers: SmallVec<[ATerm; 8]>,
    /// The height of the operand stack when the frame was entered.
    base: usize,
}

impl Frame {
    fn new(program: Rc<Program>, subject: ATerm, base: usize) -> Frame {
        Frame {
            registers: smallvec![subject.clone(); program.registers()],
            program,
            pc: 0,
            subject,
            base,
        }
    }
}

impl CompilingRewriter {
    /// Executes the program for the subject, whose arguments must be in
    /// normal form, and returns its normal form.
    ///
    /// # Details
    ///
    /// Calls to other compiled programs push a frame instead of recursing, such
    /// that deeply nested right-hand sides do not exhaust the native stack.
    /// Symbols without a program are rewritten by the interpreter.
    pub(crate) fn execute(&mut self, program: Rc<Program>, subject: ATerm, stats: &mut RewritingStatistics) -> ATerm {
        stats.recursions += 1;

        let mut frames: Vec<Frame> = vec![Frame::new(program, subject, 0)];
        let mut stack: Vec<ATerm> = Vec::new();

        loop {
            let Some(frame) = frames.last_mut() else {
                unreachable!("The last frame returns the result");
            };

            let instruction = frame.program.code[frame.pc];
            frame.pc += 1;
            debug_trace!("@{}\t{}", frame.pc - 1, instruction);

            match instruction {
                Instruction::LoadPosition(position) => {
                    let subterm = frame.subject.copy().get_position(frame.program.position(position)).protect();
                    stack.push(subterm);
                }
                Instruction::JumpIfNotKey(key, target) => {
                    stats.symbol_comparisons += 1;
                    if stack.last().map(|term| match_key(term)).as_ref() != Some(frame.program.key(key)) {
                        frame.pc = target;
                    }
                }
                Instruction::JumpIfNotEqual(target) => {
                    let right = stack.pop();
                    let left = stack.pop();
                    if left != right {
                        frame.pc = target;
                    }
                }
                Instruction::Pop => {
                    stack.pop();
                }
                Instruction::Store(register) => {
                    if let Some(term) = stack.pop() {
                        frame.registers[register] = term;
                    }
                }
                Instruction::Load(register) => stack.push(frame.registers[register].clone()),
                Instruction::PushConstant(term) => stack.push(frame.program.term(term).clone()),
                Instruction::Construct(symbol, arity) => {
                    let arguments = stack.split_off(stack.len() - arity);
                    stack.push(self.pool.create_term(frame.program.symbol(symbol), &arguments));
                }
                Instruction::Call(symbol, arity) => {
                    let arguments = stack.split_off(stack.len() - arity);
                    let term = self.pool.create_term(frame.program.symbol(symbol), &arguments);
                    self.call(&mut frames, &mut stack, term, stats);
                }
                Instruction::Rewrite => {
                    if let Some(term) = stack.pop() {
                        self.call(&mut frames, &mut stack, term, stats);
                    }
                }
                Instruction::Return | Instruction::ReturnSubject => {
                    let result = if instruction == Instruction::Return {
                        stats.rewrite_steps += 1;
                        stack.pop()
                    } else {
                        Some(frame.subject.clone())
                    };

                    let base = frame.base;
                    frames.pop();
                    stack.truncate(base);

                    match result {
                        Some(result) if frames.is_empty() => return result,
                        Some(result) => stack.push(result),
                        None => unreachable!("Verified programs return a term"),
                    }
                }
            }
        }
    }

    /// Pushes the normal form of the term, whose arguments are in normal form,
    /// or a frame that computes it.
    fn call(&mut self, frames: &mut Vec<Frame>, stack: &mut Vec<ATerm>, term: ATerm, stats: &mut RewritingStatistics) {
        let key = match_key(&term);
        if !self.analysis.is_defined(&key) {
            stack.push(term);
            return;
        }

        match self.program(key) {
            Some(program) => {
                stats.recursions += 1;
                frames.push(Frame::new(program, term, stack.len()));
            }
            None => {
                let result = self.interpreter.rewrite_head(term.copy(), stats);
                stack.push(result);
            }
        }
    }
}
