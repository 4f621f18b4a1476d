#![forbid(unsafe_code)]

use merc_aterm::Symb;

use super::CompileError;
use super::Constant;
use super::Instruction;
use super::Program;

/// Checks that the program can be executed safely. Every jump target,
/// register and constant must exist, the constants must have the kind that
/// the instruction expects, and the height of the operand stack must be the
/// same on all paths to an instruction.
pub fn verify(program: &Program) -> Result<(), CompileError> {
    for (index, instruction) in program.code().iter().enumerate() {
        verify_operands(program, index, instruction)?;
    }

    // Computes the stack height before every instruction.
    let mut heights: Vec<Option<usize>> = vec![None; program.code().len()];
    let mut todo = vec![(0, 0)];

    while let Some((index, height)) = todo.pop() {
        let Some(instruction) = program.code().get(index) else {
            // Execution would continue after the last instruction.
            return Err(CompileError::InvalidJump {
                instruction: index.saturating_sub(1),
                target: index,
            });
        };

        match heights[index] {
            Some(previous) if previous == height => continue,
            Some(_) => return Err(CompileError::StackMismatch { instruction: index }),
            None => heights[index] = Some(height),
        }

        let (pops, pushes) = stack_effect(instruction);
        if height < pops {
            return Err(CompileError::StackMismatch { instruction: index });
        }
        let next = height - pops + pushes;

        match instruction {
            Instruction::Return | Instruction::ReturnSubject => {}
            Instruction::JumpIfNotKey(_, target) | Instruction::JumpIfNotEqual(target) => {
                todo.push((*target, next));
                todo.push((index + 1, next));
            }
            _ => todo.push((index + 1, next)),
        }
    }

    Ok(())
}

/// Returns the number of terms that the instruction requires on the stack
/// and the number of terms that remain of those after execution.
fn stack_effect(instruction: &Instruction) -> (usize, usize) {
    match instruction {
        Instruction::LoadPosition(_) | Instruction::Load(_) | Instruction::PushConstant(_) => (0, 1),
        Instruction::JumpIfNotKey(_, _) => (1, 1),
        Instruction::JumpIfNotEqual(_) => (2, 0),
        Instruction::Pop | Instruction::Store(_) => (1, 0),
        Instruction::Construct(_, arity) | Instruction::Call(_, arity) => (*arity, 1),
        Instruction::Rewrite => (1, 1),
        Instruction::Return => (1, 0),
        Instruction::ReturnSubject => (0, 0),
    }
}

fn verify_operands(program: &Program, index: usize, instruction: &Instruction) -> Result<(), CompileError> {
    let constant = |constant: usize, valid: fn(&Constant) -> bool| {
        if program.constants().get(constant).is_some_and(valid) {
            Ok(())
        } else {
            Err(CompileError::InvalidConstant {
                instruction: index,
                constant,
            })
        }
    };

    let jump = |target: usize| {
        if target < program.code().len() {
            Ok(())
        } else {
            Err(CompileError::InvalidJump {
                instruction: index,
                target,
            })
        }
    };

    let register = |register: usize| {
        if register < program.registers() {
            Ok(())
        } else {
            Err(CompileError::InvalidRegister {
                instruction: index,
                register,
            })
        }
    };

    match instruction {
        Instruction::LoadPosition(position) => constant(*position, |c| matches!(c, Constant::Position(_))),
        Instruction::JumpIfNotKey(key, target) => {
            constant(*key, |c| matches!(c, Constant::Key(_)))?;
            jump(*target)
        }
        Instruction::JumpIfNotEqual(target) => jump(*target),
        Instruction::Store(r) | Instruction::Load(r) => register(*r),
        Instruction::PushConstant(term) => constant(*term, |c| matches!(c, Constant::Term(_))),
        Instruction::Construct(symbol, arity) | Instruction::Call(symbol, arity) => {
            constant(*symbol, |c| matches!(c, Constant::Symbol(_)))?;
            match &program.constants()[*symbol] {
                Constant::Symbol(s) if s.arity() == *arity => Ok(()),
                _ => Err(CompileError::InvalidConstant {
                    instruction: index,
                    constant: *symbol,
                }),
            }
        }
        Instruction::Pop | Instruction::Rewrite | Instruction::Return | Instruction::ReturnSubject => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use merc_aterm::TermPool;
    use test_case::test_case;

    use crate::utilities::ExplicitPosition;

    use super::*;

    fn program(pool: &TermPool, code: Vec<Instruction>) -> Program {
        Program::new(
            code,
            vec![
                Constant::Term(pool.from_string("true").unwrap()),
                Constant::Position(ExplicitPosition::new(&[1])),
                Constant::Symbol(pool.create_symbol("g", 1).unwrap()),
            ],
            1,
        )
    }

    #[test]
    fn test_verify_valid() {
        let pool = TermPool::new();
        let code = vec![
            Instruction::LoadPosition(1),
            Instruction::PushConstant(0),
            Instruction::JumpIfNotEqual(5),
            Instruction::PushConstant(0),
            Instruction::Return,
            Instruction::LoadPosition(1),
            Instruction::Construct(2, 1),
            Instruction::Return,
        ];
        assert_eq!(verify(&program(&pool, code)), Ok(()));
    }

    #[test_case(vec![Instruction::PushConstant(0), Instruction::JumpIfNotEqual(9)], CompileError::InvalidJump { instruction: 1, target: 9 } ; "jump outside")]
    #[test_case(vec![Instruction::Load(1), Instruction::Return], CompileError::InvalidRegister { instruction: 0, register: 1 } ; "register")]
    #[test_case(vec![Instruction::PushConstant(1), Instruction::Return], CompileError::InvalidConstant { instruction: 0, constant: 1 } ; "constant kind")]
    #[test_case(vec![Instruction::PushConstant(0), Instruction::Construct(2, 2), Instruction::Return], CompileError::InvalidConstant { instruction: 1, constant: 2 } ; "arity")]
    #[test_case(vec![Instruction::Return], CompileError::StackMismatch { instruction: 0 } ; "empty return")]
    #[test_case(vec![Instruction::PushConstant(0)], CompileError::InvalidJump { instruction: 0, target: 1 } ; "fall through")]
    #[test_case(vec![
        Instruction::LoadPosition(1),
        Instruction::PushConstant(0),
        Instruction::JumpIfNotEqual(5),
        Instruction::PushConstant(0),
        Instruction::PushConstant(0),
        Instruction::Return,
    ], CompileError::StackMismatch { instruction: 5 } ; "merge")]
    fn test_verify_invalid(code: Vec<Instruction>, error: CompileError) {
        let pool = TermPool::new();
        assert_eq!(verify(&program(&pool, code)), Err(error));
    }
}
