use std::fmt;

use sim86_core::Reg16;

use crate::isa::{RegisterId, RegisterPart, WordRegister};

/// The eight word registers. Byte registers read and write the halves of
/// `ax`, `cx`, `dx` and `bx`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [Reg16; 8],
}

impl Registers {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, reg: WordRegister) -> u16 {
        self.regs[reg.index()].read()
    }

    pub fn set(&mut self, reg: WordRegister, value: u16) {
        self.regs[reg.index()].write(value);
    }

    /// Reads any named register, zero-extending byte registers.
    pub fn read(&self, id: RegisterId) -> u16 {
        let (reg, part) = id.location();
        let cell = &self.regs[reg.index()];
        match part {
            RegisterPart::Word => cell.read(),
            RegisterPart::Low => cell.low() as u16,
            RegisterPart::High => cell.high() as u16,
        }
    }

    /// Writes any named register. Byte registers keep only the low byte of
    /// `value` and leave the other half of their word register alone.
    pub fn write(&mut self, id: RegisterId, value: u16) {
        let (reg, part) = id.location();
        let cell = &mut self.regs[reg.index()];
        match part {
            RegisterPart::Word => cell.write(value),
            RegisterPart::Low => cell.write_low(value as u8),
            RegisterPart::High => cell.write_high(value as u8),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordRegister, u16)> + '_ {
        WordRegister::ALL.iter().map(|reg| (*reg, self.get(*reg)))
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for reg in WordRegister::ALL {
            map.entry(&reg.to_string(), &self.regs[reg.index()]);
        }
        map.finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    pub zero: bool,
    pub sign: bool,
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zero = if self.zero { 'Z' } else { '-' };
        let sign = if self.sign { 'S' } else { '-' };
        write!(f, "{}{}", zero, sign)
    }
}
