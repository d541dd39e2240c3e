use sim86_core::{resolve_relative, JumpError, MemoryError};
use thiserror::Error;

use crate::isa::{Instruction, MemoryOperand, Mnemonic, Operand, Width};
use crate::machine::MachineState;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("instruction {index}: invalid jump target")]
    InvalidJumpTarget {
        index: usize,
        #[source]
        source: JumpError,
    },
    #[error("instruction {index}: operand `{operand}` cannot be resolved")]
    UnresolvableOperand { index: usize, operand: Operand },
    #[error("instruction {index}: `{mnemonic}` is missing its source operand")]
    MissingOperand { index: usize, mnemonic: Mnemonic },
    #[error("instruction {index}: memory access failed")]
    Memory {
        index: usize,
        #[source]
        source: MemoryError,
    },
    #[error("instruction {index}: step limit of {limit} exceeded")]
    StepLimitExceeded { index: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, CpuError>;

/// How the sign flag is derived from a result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SignFlagPolicy {
    /// Set for any non-zero result.
    #[default]
    NonZero,
    /// Set from the most significant bit of the result's width.
    HighBit,
}

impl SignFlagPolicy {
    pub fn sign(&self, value: u16, width: Width) -> bool {
        match self {
            SignFlagPolicy::NonZero => value != 0,
            SignFlagPolicy::HighBit => match width {
                Width::Byte => value & 0x80 != 0,
                Width::Word => value & 0x8000 != 0,
            },
        }
    }
}

pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub step_limit: usize,
    pub sign_flag: SignFlagPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            sign_flag: SignFlagPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_sign_flag(mut self, policy: SignFlagPolicy) -> Self {
        self.sign_flag = policy;
        self
    }
}

fn truncate(value: u16, width: Width) -> u16 {
    match width {
        Width::Byte => value & 0x00FF,
        Width::Word => value,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct I8086Cpu {
    config: RunConfig,
}

impl I8086Cpu {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    fn unresolvable(machine: &MachineState, operand: &Operand) -> CpuError {
        CpuError::UnresolvableOperand {
            index: machine.ip,
            operand: *operand,
        }
    }

    fn memory_address(
        machine: &MachineState,
        operand: &Operand,
        mem: &MemoryOperand,
    ) -> Result<usize> {
        mem.absolute()
            .map(|address| address as usize)
            .ok_or_else(|| Self::unresolvable(machine, operand))
    }

    fn read_operand(&self, machine: &MachineState, operand: &Operand) -> Result<u16> {
        match operand {
            Operand::Register(reg) => Ok(machine.registers.read(*reg)),
            Operand::Memory(mem) => {
                let address = Self::memory_address(machine, operand, mem)?;
                let value = match mem.width {
                    Width::Byte => machine.memory.read_u8(address).map(u16::from),
                    Width::Word => machine.memory.read_u16(address),
                };
                value.map_err(|source| CpuError::Memory {
                    index: machine.ip,
                    source,
                })
            }
            Operand::Immediate(imm) => Ok(imm.value),
            Operand::Relative(_) => Err(Self::unresolvable(machine, operand)),
        }
    }

    fn write_operand(
        &self,
        machine: &mut MachineState,
        operand: &Operand,
        value: u16,
    ) -> Result<()> {
        match operand {
            Operand::Register(reg) => {
                machine.registers.write(*reg, value);
                Ok(())
            }
            Operand::Memory(mem) => {
                let address = Self::memory_address(machine, operand, mem)?;
                let index = machine.ip;
                let written = match mem.width {
                    Width::Byte => machine.memory.write_u8(address, value as u8),
                    Width::Word => machine.memory.write_u16(address, value),
                };
                written.map_err(|source| CpuError::Memory { index, source })
            }
            Operand::Immediate(_) | Operand::Relative(_) => {
                Err(Self::unresolvable(machine, operand))
            }
        }
    }

    fn set_flags(&self, machine: &mut MachineState, value: u16, width: Width) {
        machine.flags.zero = value == 0;
        machine.flags.sign = self.config.sign_flag.sign(value, width);
    }

    fn source<'a>(machine: &MachineState, instruction: &'a Instruction) -> Result<&'a Operand> {
        instruction
            .source
            .as_ref()
            .ok_or(CpuError::MissingOperand {
                index: machine.ip,
                mnemonic: instruction.mnemonic,
            })
    }

    /// Executes one instruction against `machine` without moving `ip`.
    /// Returns the jump displacement in bytes, or 0 to fall through.
    pub fn execute(
        &self,
        machine: &mut MachineState,
        instruction: &Instruction,
    ) -> Result<isize> {
        let destination = &instruction.destination;
        let width = destination.width().unwrap_or(Width::Word);

        let (before, result, store) = match instruction.mnemonic {
            Mnemonic::Mov => {
                let value = self.read_operand(machine, Self::source(machine, instruction)?)?;
                (None, truncate(value, width), true)
            }
            Mnemonic::Add | Mnemonic::Sub | Mnemonic::Cmp => {
                let lhs = self.read_operand(machine, destination)?;
                let rhs = self.read_operand(machine, Self::source(machine, instruction)?)?;
                let value = match instruction.mnemonic {
                    Mnemonic::Add => lhs.wrapping_add(rhs),
                    _ => lhs.wrapping_sub(rhs),
                };
                let store = instruction.mnemonic != Mnemonic::Cmp;
                (Some(lhs), truncate(value, width), store)
            }
            Mnemonic::Jnz => {
                let displacement = instruction.displacement().unwrap_or(0);
                let offset = if machine.flags.zero {
                    0
                } else {
                    displacement as isize
                };
                tracing::debug!(
                    "ip {} | {} | zf={} -> offset {}",
                    machine.ip,
                    instruction,
                    machine.flags.zero as u8,
                    offset
                );
                return Ok(offset);
            }
            other => {
                tracing::warn!(
                    "ip {} | {} has no execution semantics, skipping",
                    machine.ip,
                    other
                );
                return Ok(0);
            }
        };

        if store {
            self.write_operand(machine, destination, result)?;
        }
        self.set_flags(machine, result, width);
        match before {
            Some(before) => tracing::debug!(
                "ip {} | {} | {}: 0x{:04X} -> 0x{:04X} | flags {}",
                machine.ip,
                instruction,
                destination,
                before,
                result,
                machine.flags
            ),
            None => tracing::debug!(
                "ip {} | {} | {} <- 0x{:04X} | flags {}",
                machine.ip,
                instruction,
                destination,
                result,
                machine.flags
            ),
        }
        Ok(0)
    }

    /// Executes `program[machine.ip]` and moves `ip` to the next instruction
    /// or the resolved jump target.
    pub fn step(&self, machine: &mut MachineState, program: &[Instruction]) -> Result<()> {
        let index = machine.ip;
        let instruction = program.get(index).ok_or(CpuError::InvalidJumpTarget {
            index,
            source: JumpError::OutOfRange { index, offset: 0 },
        })?;

        let offset = self.execute(machine, instruction)?;
        machine.ip = if offset == 0 {
            index + 1
        } else {
            resolve_relative(program, index, offset)
                .map_err(|source| CpuError::InvalidJumpTarget { index, source })?
        };
        tracing::trace!("ip {} -> {}", index, machine.ip);
        Ok(())
    }

    /// Steps until `ip` runs off the end of `program`.
    #[tracing::instrument(name = "run", skip_all, fields(len = program.len()))]
    pub fn run(
        &self,
        mut machine: MachineState,
        program: &[Instruction],
    ) -> Result<MachineState> {
        if machine.ip > program.len() {
            return Err(CpuError::InvalidJumpTarget {
                index: machine.ip,
                source: JumpError::OutOfRange {
                    index: machine.ip,
                    offset: 0,
                },
            });
        }

        tracing::info!("running program of {} instructions", program.len());
        let mut steps = 0;
        while machine.ip < program.len() {
            if steps == self.config.step_limit {
                return Err(CpuError::StepLimitExceeded {
                    index: machine.ip,
                    limit: self.config.step_limit,
                });
            }
            self.step(&mut machine, program)?;
            steps += 1;
        }
        tracing::info!("halted after {} steps", steps);
        Ok(machine)
    }
}

/// Runs `program` to completion with the default configuration.
pub fn run(machine: MachineState, program: &[Instruction]) -> Result<MachineState> {
    I8086Cpu::default().run(machine, program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{EffectiveAddress, Immediate, RegisterId, WordRegister};
    use crate::machine::new_machine;

    fn reg(id: RegisterId) -> Operand {
        Operand::Register(id)
    }

    fn imm(value: u16) -> Operand {
        Operand::Immediate(Immediate::word(value))
    }

    fn direct(address: u16, width: Width) -> Operand {
        Operand::Memory(MemoryOperand::new(
            EffectiveAddress::Direct(address),
            0,
            width,
        ))
    }

    fn countdown() -> Vec<Instruction> {
        vec![
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Cx), imm(2), 3),
            Instruction::new(Mnemonic::Sub, reg(RegisterId::Cx), imm(1), 2),
            Instruction::branch(Mnemonic::Jnz, -4, 2),
        ]
    }

    #[test]
    fn test_backward_jump_revisits_sub() {
        let program = countdown();
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();
        let mut trace = vec![machine.ip];
        while machine.ip < program.len() {
            cpu.step(&mut machine, &program).unwrap();
            trace.push(machine.ip);
        }
        assert_eq!(trace, [0, 1, 2, 1, 2, 3]);
        assert_eq!(machine.register(WordRegister::Cx), 0);
        assert!(machine.flags.zero);
        assert!(!machine.flags.sign);
    }

    #[test]
    fn test_run_countdown() {
        let machine = run(new_machine(), &countdown()).unwrap();
        assert_eq!(machine.ip, 3);
        assert_eq!(machine.register(WordRegister::Cx), 0);
        assert!(machine.flags.zero);
    }

    #[test]
    fn test_arithmetic_and_flags() {
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();
        let ax = reg(RegisterId::Ax);

        cpu.execute(&mut machine, &Instruction::new(Mnemonic::Mov, ax, imm(10), 3))
            .unwrap();
        assert_eq!(machine.register(WordRegister::Ax), 10);
        assert_eq!((machine.flags.zero, machine.flags.sign), (false, true));

        cpu.execute(&mut machine, &Instruction::new(Mnemonic::Add, ax, imm(5), 3))
            .unwrap();
        assert_eq!(machine.register(WordRegister::Ax), 15);

        cpu.execute(&mut machine, &Instruction::new(Mnemonic::Cmp, ax, imm(15), 3))
            .unwrap();
        assert_eq!(machine.register(WordRegister::Ax), 15);
        assert_eq!((machine.flags.zero, machine.flags.sign), (true, false));

        cpu.execute(&mut machine, &Instruction::new(Mnemonic::Sub, ax, imm(20), 3))
            .unwrap();
        assert_eq!(machine.register(WordRegister::Ax), 0xFFFB);
        assert_eq!((machine.flags.zero, machine.flags.sign), (false, true));

        let bx = reg(RegisterId::Bx);
        cpu.execute(&mut machine, &Instruction::new(Mnemonic::Mov, bx, ax, 2))
            .unwrap();
        assert_eq!(machine.register(WordRegister::Bx), 0xFFFB);
    }

    #[test]
    fn test_sign_flag_policies() {
        let nonzero = I8086Cpu::default();
        let high_bit = I8086Cpu::new(RunConfig::new().with_sign_flag(SignFlagPolicy::HighBit));
        let mov = Instruction::new(Mnemonic::Mov, reg(RegisterId::Dx), imm(1), 3);

        let mut machine = new_machine();
        nonzero.execute(&mut machine, &mov).unwrap();
        assert!(machine.flags.sign);

        let mut machine = new_machine();
        high_bit.execute(&mut machine, &mov).unwrap();
        assert!(!machine.flags.sign);

        let mov = Instruction::new(Mnemonic::Mov, reg(RegisterId::Dx), imm(0x8000), 3);
        high_bit.execute(&mut machine, &mov).unwrap();
        assert!(machine.flags.sign);

        assert!(SignFlagPolicy::HighBit.sign(0x80, Width::Byte));
        assert!(!SignFlagPolicy::HighBit.sign(0x80, Width::Word));
    }

    #[test]
    fn test_direct_memory_access() {
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();

        let store = Instruction::new(Mnemonic::Mov, direct(1000, Width::Word), imm(0x1234), 6);
        cpu.execute(&mut machine, &store).unwrap();
        assert_eq!(machine.memory.read_u16(1000), Ok(0x1234));
        assert_eq!(machine.memory.read_u8(1000), Ok(0x34));

        let add = Instruction::new(
            Mnemonic::Add,
            direct(1000, Width::Byte),
            Operand::Immediate(Immediate::byte(0xF0)),
            5,
        );
        cpu.execute(&mut machine, &add).unwrap();
        // byte arithmetic wraps within the byte
        assert_eq!(machine.memory.read_u16(1000), Ok(0x1224));

        let load = Instruction::new(Mnemonic::Mov, reg(RegisterId::Bp), direct(1000, Width::Word), 4);
        cpu.execute(&mut machine, &load).unwrap();
        assert_eq!(machine.register(WordRegister::Bp), 0x1224);
    }

    #[test]
    fn test_unresolvable_operands() {
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();

        let based = Operand::Memory(MemoryOperand::new(EffectiveAddress::Bx, 4, Width::Word));
        let load = Instruction::new(Mnemonic::Mov, reg(RegisterId::Ax), based, 3);
        assert_eq!(
            cpu.execute(&mut machine, &load),
            Err(CpuError::UnresolvableOperand {
                index: 0,
                operand: based
            })
        );

        let store = Instruction::new(Mnemonic::Mov, imm(1), reg(RegisterId::Ax), 3);
        assert_eq!(
            cpu.execute(&mut machine, &store),
            Err(CpuError::UnresolvableOperand {
                index: 0,
                operand: imm(1)
            })
        );
    }

    #[test]
    fn test_byte_register_arithmetic() {
        let cpu = I8086Cpu::new(RunConfig::new().with_sign_flag(SignFlagPolicy::HighBit));
        let mut machine = new_machine();
        machine.registers.set(WordRegister::Ax, 0x12F0);

        let add = Instruction::new(
            Mnemonic::Add,
            reg(RegisterId::Al),
            Operand::Immediate(Immediate::byte(0x10)),
            2,
        );
        cpu.execute(&mut machine, &add).unwrap();
        // wraps within al, ah untouched
        assert_eq!(machine.register(WordRegister::Ax), 0x1200);
        assert!(machine.flags.zero);
        assert!(!machine.flags.sign);

        let mov = Instruction::new(
            Mnemonic::Mov,
            reg(RegisterId::Ah),
            Operand::Immediate(Immediate::byte(0x80)),
            2,
        );
        cpu.execute(&mut machine, &mov).unwrap();
        assert_eq!(machine.register(WordRegister::Ax), 0x8000);
        assert!(machine.flags.sign);

        let sub = Instruction::new(Mnemonic::Sub, reg(RegisterId::Cl), reg(RegisterId::Ah), 2);
        cpu.execute(&mut machine, &sub).unwrap();
        assert_eq!(machine.register(WordRegister::Cx), 0x0080);
        assert!(machine.flags.sign);
    }

    #[test]
    fn test_word_write_past_end_of_memory() {
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();
        let store = Instruction::new(Mnemonic::Mov, direct(0xFFFF, Width::Word), imm(1), 6);
        assert_eq!(
            cpu.execute(&mut machine, &store),
            Err(CpuError::Memory {
                index: 0,
                source: MemoryError::OutOfRange {
                    address: 0xFFFF,
                    length: 2
                }
            })
        );
    }

    #[test]
    fn test_decode_only_branches_fall_through() {
        let program = vec![
            Instruction::branch(Mnemonic::Loop, -2, 2),
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Si), imm(7), 3),
        ];
        let machine = run(new_machine(), &program).unwrap();
        assert_eq!(machine.register(WordRegister::Si), 7);
        assert_eq!(machine.ip, 2);
    }

    #[test]
    fn test_jnz_not_taken_when_zero() {
        let cpu = I8086Cpu::default();
        let mut machine = new_machine();
        machine.flags.zero = true;
        let jnz = Instruction::branch(Mnemonic::Jnz, -6, 2);
        assert_eq!(cpu.execute(&mut machine, &jnz), Ok(0));
        machine.flags.zero = false;
        assert_eq!(cpu.execute(&mut machine, &jnz), Ok(-6));
    }

    #[test]
    fn test_invalid_jump_targets() {
        // jumps back past the start of the program
        let program = vec![
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Cx), imm(1), 3),
            Instruction::branch(Mnemonic::Jnz, -8, 2),
        ];
        assert_eq!(
            run(new_machine(), &program),
            Err(CpuError::InvalidJumpTarget {
                index: 1,
                source: JumpError::OutOfRange {
                    index: 1,
                    offset: -8
                }
            })
        );

        // lands in the middle of the mov
        let program = vec![
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Cx), imm(1), 3),
            Instruction::branch(Mnemonic::Jnz, -4, 2),
        ];
        assert_eq!(
            run(new_machine(), &program),
            Err(CpuError::InvalidJumpTarget {
                index: 1,
                source: JumpError::Misaligned {
                    index: 1,
                    offset: -4
                }
            })
        );

        let mut machine = new_machine();
        machine.ip = 5;
        assert!(matches!(
            run(machine, &program),
            Err(CpuError::InvalidJumpTarget { index: 5, .. })
        ));
    }

    #[test]
    fn test_forward_jump_to_end_terminates() {
        let program = vec![
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Ax), imm(1), 3),
            Instruction::branch(Mnemonic::Jnz, 3, 2),
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Ax), imm(9), 3),
        ];
        let machine = run(new_machine(), &program).unwrap();
        assert_eq!(machine.ip, 3);
        assert_eq!(machine.register(WordRegister::Ax), 1);
    }

    #[test]
    fn test_step_limit() {
        // jnz -2 jumps to itself forever
        let program = vec![
            Instruction::new(Mnemonic::Mov, reg(RegisterId::Ax), imm(1), 3),
            Instruction::branch(Mnemonic::Jnz, -2, 2),
        ];
        let cpu = I8086Cpu::new(RunConfig::new().with_step_limit(100));
        assert_eq!(
            cpu.run(new_machine(), &program),
            Err(CpuError::StepLimitExceeded {
                index: 1,
                limit: 100
            })
        );
        assert_eq!(RunConfig::default().step_limit, DEFAULT_STEP_LIMIT);
    }

    #[test]
    fn test_empty_program() {
        let machine = run(new_machine(), &[]).unwrap();
        assert_eq!(machine, new_machine());
    }
}
