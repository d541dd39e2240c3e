use crate::cpu::Instruction;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Hash)]
pub enum JumpError {
    #[error("jump of {offset} bytes from instruction {index} leaves the program")]
    OutOfRange { index: usize, offset: isize },
    #[error("jump of {offset} bytes from instruction {index} lands inside an instruction")]
    Misaligned { index: usize, offset: isize },
}

pub type Result<T> = std::result::Result<T, JumpError>;

/// Translates a relative byte displacement into an index into `program`.
///
/// The displacement is measured from the first byte after `program[index]`,
/// so an offset of 0 resolves to `index + 1`. Backward jumps walk from
/// `index` towards the start, subtracting each instruction's length until the
/// displacement is used up; forward jumps walk the other way. A result equal
/// to `program.len()` means "run off the end" and is allowed.
pub fn resolve_relative<I: Instruction>(
    program: &[I],
    index: usize,
    offset: isize,
) -> Result<usize> {
    if index >= program.len() {
        return Err(JumpError::OutOfRange { index, offset });
    }

    if offset < 0 {
        let mut remaining = offset.unsigned_abs();
        let mut target = index;
        loop {
            let len = program[target].len_bytes();
            if len > remaining {
                return Err(JumpError::Misaligned { index, offset });
            }
            remaining -= len;
            if remaining == 0 {
                return Ok(target);
            }
            if target == 0 {
                return Err(JumpError::OutOfRange { index, offset });
            }
            target -= 1;
        }
    }

    let mut remaining = offset.unsigned_abs();
    let mut target = index + 1;
    while remaining > 0 {
        let Some(instruction) = program.get(target) else {
            return Err(JumpError::OutOfRange { index, offset });
        };
        let len = instruction.len_bytes();
        if len > remaining {
            return Err(JumpError::Misaligned { index, offset });
        }
        remaining -= len;
        target += 1;
    }
    Ok(target)
}
