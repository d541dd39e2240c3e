use std::fmt;

use crate::isa::operand::Operand;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mnemonic {
    Mov,
    Add,
    Sub,
    Cmp,
    Jnz,
    Je,
    Jl,
    Jle,
    Jb,
    Jbe,
    Jp,
    Jo,
    Js,
    Jnl,
    Jg,
    Jnb,
    Ja,
    Jnp,
    Jno,
    Jns,
    Loop,
    Loopz,
    Loopnz,
    Jcxz,
}

impl Mnemonic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mnemonic::Mov => "mov",
            Mnemonic::Add => "add",
            Mnemonic::Sub => "sub",
            Mnemonic::Cmp => "cmp",
            Mnemonic::Jnz => "jnz",
            Mnemonic::Je => "je",
            Mnemonic::Jl => "jl",
            Mnemonic::Jle => "jle",
            Mnemonic::Jb => "jb",
            Mnemonic::Jbe => "jbe",
            Mnemonic::Jp => "jp",
            Mnemonic::Jo => "jo",
            Mnemonic::Js => "js",
            Mnemonic::Jnl => "jnl",
            Mnemonic::Jg => "jg",
            Mnemonic::Jnb => "jnb",
            Mnemonic::Ja => "ja",
            Mnemonic::Jnp => "jnp",
            Mnemonic::Jno => "jno",
            Mnemonic::Jns => "jns",
            Mnemonic::Loop => "loop",
            Mnemonic::Loopz => "loopz",
            Mnemonic::Loopnz => "loopnz",
            Mnemonic::Jcxz => "jcxz",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub destination: Operand,
    pub source: Option<Operand>,
    /// Exact number of encoded bytes.
    pub length: usize,
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, destination: Operand, source: Operand, length: usize) -> Self {
        Self {
            mnemonic,
            destination,
            source: Some(source),
            length,
        }
    }

    pub fn branch(mnemonic: Mnemonic, displacement: i8, length: usize) -> Self {
        Self {
            mnemonic,
            destination: Operand::Relative(displacement),
            source: None,
            length,
        }
    }

    /// Signed byte displacement for branch instructions.
    pub fn displacement(&self) -> Option<i8> {
        match self.destination {
            Operand::Relative(disp) => Some(disp),
            _ => None,
        }
    }
}

impl sim86_core::Instruction for Instruction {
    fn len_bytes(&self) -> usize {
        self.length
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.mnemonic)?;
        match (&self.destination, &self.source) {
            // An immediate doesn't say how wide the memory write is.
            (Operand::Memory(mem), Some(src @ Operand::Immediate(_))) => {
                write!(f, "{} {}, {}", mem.width, mem, src)
            }
            (dest, Some(src)) => write!(f, "{}, {}", dest, src),
            (dest, None) => write!(f, "{}", dest),
        }
    }
}
