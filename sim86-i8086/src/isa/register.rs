use std::fmt;

use crate::isa::operand::Width;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterId {
    Al,
    Cl,
    Dl,
    Bl,
    Ah,
    Ch,
    Dh,
    Bh,
    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,
}

/// Indexed by `(reg << 1) | w`, so byte and word registers interleave.
static REGISTER_TABLE: [RegisterId; 16] = [
    RegisterId::Al,
    RegisterId::Ax,
    RegisterId::Cl,
    RegisterId::Cx,
    RegisterId::Dl,
    RegisterId::Dx,
    RegisterId::Bl,
    RegisterId::Bx,
    RegisterId::Ah,
    RegisterId::Sp,
    RegisterId::Ch,
    RegisterId::Bp,
    RegisterId::Dh,
    RegisterId::Si,
    RegisterId::Bh,
    RegisterId::Di,
];

impl RegisterId {
    /// Resolves a 3-bit register field and the W flag. Bits above the low
    /// three of `reg` are ignored.
    pub fn from_fields(reg: u8, word: bool) -> Self {
        let index = ((reg & 0b111) << 1) | word as u8;
        REGISTER_TABLE[index as usize]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegisterId::Al => "al",
            RegisterId::Cl => "cl",
            RegisterId::Dl => "dl",
            RegisterId::Bl => "bl",
            RegisterId::Ah => "ah",
            RegisterId::Ch => "ch",
            RegisterId::Dh => "dh",
            RegisterId::Bh => "bh",
            RegisterId::Ax => "ax",
            RegisterId::Cx => "cx",
            RegisterId::Dx => "dx",
            RegisterId::Bx => "bx",
            RegisterId::Sp => "sp",
            RegisterId::Bp => "bp",
            RegisterId::Si => "si",
            RegisterId::Di => "di",
        }
    }

    pub fn width(&self) -> Width {
        match self.location().1 {
            RegisterPart::Word => Width::Word,
            RegisterPart::Low | RegisterPart::High => Width::Byte,
        }
    }

    /// The word register this name lives in, and which part of it. `al`/`ah`
    /// are the low and high bytes of `ax`, and so on for `cx`, `dx`, `bx`.
    pub fn location(&self) -> (WordRegister, RegisterPart) {
        match self {
            RegisterId::Al => (WordRegister::Ax, RegisterPart::Low),
            RegisterId::Cl => (WordRegister::Cx, RegisterPart::Low),
            RegisterId::Dl => (WordRegister::Dx, RegisterPart::Low),
            RegisterId::Bl => (WordRegister::Bx, RegisterPart::Low),
            RegisterId::Ah => (WordRegister::Ax, RegisterPart::High),
            RegisterId::Ch => (WordRegister::Cx, RegisterPart::High),
            RegisterId::Dh => (WordRegister::Dx, RegisterPart::High),
            RegisterId::Bh => (WordRegister::Bx, RegisterPart::High),
            RegisterId::Ax => (WordRegister::Ax, RegisterPart::Word),
            RegisterId::Cx => (WordRegister::Cx, RegisterPart::Word),
            RegisterId::Dx => (WordRegister::Dx, RegisterPart::Word),
            RegisterId::Bx => (WordRegister::Bx, RegisterPart::Word),
            RegisterId::Sp => (WordRegister::Sp, RegisterPart::Word),
            RegisterId::Bp => (WordRegister::Bp, RegisterPart::Word),
            RegisterId::Si => (WordRegister::Si, RegisterPart::Word),
            RegisterId::Di => (WordRegister::Di, RegisterPart::Word),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterPart {
    Word,
    Low,
    High,
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WordRegister {
    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,
}

impl WordRegister {
    pub const ALL: [WordRegister; 8] = [
        WordRegister::Ax,
        WordRegister::Cx,
        WordRegister::Dx,
        WordRegister::Bx,
        WordRegister::Sp,
        WordRegister::Bp,
        WordRegister::Si,
        WordRegister::Di,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn id(&self) -> RegisterId {
        RegisterId::from_fields(self.index() as u8, true)
    }
}

impl fmt::Display for WordRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id().name())
    }
}
