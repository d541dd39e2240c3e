use std::fmt;

use sim86_core::Memory;

use crate::isa::WordRegister;
use crate::registers::{Flags, Registers};

/// 64 KiB flat address space.
pub const MEMORY_SIZE: usize = 0x10000;

pub type MachineMemory = Memory<MEMORY_SIZE>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MachineState {
    pub registers: Registers,
    pub flags: Flags,
    pub memory: MachineMemory,
    /// Index into the decoded program, not a byte address.
    pub ip: usize,
}

impl MachineState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(&self, reg: WordRegister) -> u16 {
        self.registers.get(reg)
    }
}

/// A machine with every register, flag and memory byte zeroed.
pub fn new_machine() -> MachineState {
    MachineState::new()
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (reg, value) in self.registers.iter() {
            writeln!(f, "{}: 0x{:04X} ({})", reg, value, value)?;
        }
        writeln!(f, "ip: {}", self.ip)?;
        write!(f, "flags: {}", self.flags)
    }
}
