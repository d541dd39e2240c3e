pub mod cpu;
mod memory;
mod register;

pub use crate::cpu::decoder::{Decode, DecodeError, DecodeOne};
pub use crate::cpu::jump::{resolve_relative, JumpError};
pub use crate::cpu::opcode::Opcode8;
pub use crate::cpu::Instruction;
pub use crate::memory::{Memory, MemoryError, MemoryStats};
pub use crate::register::{Reg16, Register};
