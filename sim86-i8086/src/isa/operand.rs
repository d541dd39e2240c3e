use std::fmt;

use crate::isa::register::RegisterId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn from_flag(word: bool) -> Self {
        if word {
            Width::Word
        } else {
            Width::Byte
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Byte => f.write_str("byte"),
            Width::Word => f.write_str("word"),
        }
    }
}

/// Base of a memory operand, selected by the r/m field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectiveAddress {
    BxSi,
    BxDi,
    BpSi,
    BpDi,
    Si,
    Di,
    Bp,
    Bx,
    /// Absolute 16-bit address, encoded as mod=00 r/m=110.
    Direct(u16),
}

static BASE_TABLE: [EffectiveAddress; 8] = [
    EffectiveAddress::BxSi,
    EffectiveAddress::BxDi,
    EffectiveAddress::BpSi,
    EffectiveAddress::BpDi,
    EffectiveAddress::Si,
    EffectiveAddress::Di,
    EffectiveAddress::Bp,
    EffectiveAddress::Bx,
];

impl EffectiveAddress {
    /// Register-relative base for an r/m field. The mod=00 r/m=110 direct
    /// case needs the trailing address bytes and is handled by the decoder.
    pub fn base(rm: u8) -> Self {
        BASE_TABLE[(rm & 0b111) as usize]
    }
}

impl fmt::Display for EffectiveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveAddress::BxSi => f.write_str("bx + si"),
            EffectiveAddress::BxDi => f.write_str("bx + di"),
            EffectiveAddress::BpSi => f.write_str("bp + si"),
            EffectiveAddress::BpDi => f.write_str("bp + di"),
            EffectiveAddress::Si => f.write_str("si"),
            EffectiveAddress::Di => f.write_str("di"),
            EffectiveAddress::Bp => f.write_str("bp"),
            EffectiveAddress::Bx => f.write_str("bx"),
            EffectiveAddress::Direct(address) => write!(f, "{}", address),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryOperand {
    pub address: EffectiveAddress,
    pub displacement: i16,
    pub width: Width,
}

impl MemoryOperand {
    pub fn new(address: EffectiveAddress, displacement: i16, width: Width) -> Self {
        Self {
            address,
            displacement,
            width,
        }
    }

    /// The absolute address, when it doesn't depend on register contents.
    pub fn absolute(&self) -> Option<u16> {
        match self.address {
            EffectiveAddress::Direct(address) => {
                Some(address.wrapping_add(self.displacement as u16))
            }
            _ => None,
        }
    }
}

impl fmt::Display for MemoryOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.displacement {
            0 => write!(f, "[{}]", self.address),
            disp if disp < 0 => write!(f, "[{} - {}]", self.address, disp.unsigned_abs()),
            disp => write!(f, "[{} + {}]", self.address, disp),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Immediate {
    pub value: u16,
    pub width: Width,
}

impl Immediate {
    pub fn byte(value: u8) -> Self {
        Self {
            value: value as u16,
            width: Width::Byte,
        }
    }

    pub fn word(value: u16) -> Self {
        Self {
            value,
            width: Width::Word,
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(RegisterId),
    Memory(MemoryOperand),
    Immediate(Immediate),
    /// Signed byte offset from the end of a jump/loop instruction.
    Relative(i8),
}

impl Operand {
    pub fn width(&self) -> Option<Width> {
        match self {
            Operand::Register(reg) => Some(reg.width()),
            Operand::Memory(mem) => Some(mem.width),
            Operand::Immediate(imm) => Some(imm.width),
            Operand::Relative(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Memory(mem) => write!(f, "{}", mem),
            Operand::Immediate(imm) => write!(f, "{}", imm),
            Operand::Relative(disp) => write!(f, "{}", disp),
        }
    }
}
