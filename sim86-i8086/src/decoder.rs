use sim86_core::cpu::decoder::{DecodeError, DecodeOne, Result};
use sim86_core::{Decode, Opcode8};

use crate::isa::{
    EffectiveAddress, Immediate, Instruction, MemoryOperand, Mnemonic, Operand, RegisterId, Width,
};

/// Single-byte conditional jump and loop opcodes.
static JUMP_TABLE: [(u8, Mnemonic); 20] = [
    (0x75, Mnemonic::Jnz),
    (0x74, Mnemonic::Je),
    (0x7C, Mnemonic::Jl),
    (0x7E, Mnemonic::Jle),
    (0x72, Mnemonic::Jb),
    (0x76, Mnemonic::Jbe),
    (0x7A, Mnemonic::Jp),
    (0x70, Mnemonic::Jo),
    (0x78, Mnemonic::Js),
    (0x7D, Mnemonic::Jnl),
    (0x7F, Mnemonic::Jg),
    (0x73, Mnemonic::Jnb),
    (0x77, Mnemonic::Ja),
    (0x7B, Mnemonic::Jnp),
    (0x71, Mnemonic::Jno),
    (0x79, Mnemonic::Jns),
    (0xE2, Mnemonic::Loop),
    (0xE1, Mnemonic::Loopz),
    (0xE0, Mnemonic::Loopnz),
    (0xE3, Mnemonic::Jcxz),
];

/// Register/memory-with-register forms, keyed by the top six opcode bits.
static REGISTER_MEMORY_OPS: [(u8, Mnemonic); 4] = [
    (0b000000, Mnemonic::Add),
    (0b001010, Mnemonic::Sub),
    (0b001110, Mnemonic::Cmp),
    (0b100010, Mnemonic::Mov),
];

/// Immediate-to-register/memory arithmetic, keyed by the ModRM reg field.
static IMMEDIATE_OPS: [(u8, Mnemonic); 3] = [
    (0b000, Mnemonic::Add),
    (0b101, Mnemonic::Sub),
    (0b111, Mnemonic::Cmp),
];

const IMMEDIATE_ARITHMETIC: u8 = 0b100000;
const IMMEDIATE_MOV: u8 = 0b110001;
const DIRECT_ADDRESS_RM: u8 = 0b110;

fn lookup(table: &[(u8, Mnemonic)], key: u8) -> Option<Mnemonic> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, mnemonic)| *mnemonic)
}

pub fn jump_mnemonic(opcode: u8) -> Option<Mnemonic> {
    lookup(&JUMP_TABLE, opcode)
}

/// The encoding family a leading byte was classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingClass {
    ImmediateToRegister,
    ImmediateToRegisterMemory,
    ImmediateToAccumulator(Mnemonic),
    Branch,
    RegisterMemory,
}

type DecodeFn = fn(&I8086Decoder, Opcode8, &mut ByteReader<'_>) -> Result<Instruction>;

struct DecodeRule {
    class: EncodingClass,
    matches: fn(Opcode8) -> bool,
    decode: DecodeFn,
}

/// Evaluated in order; the first match wins where bit patterns overlap.
static DECODE_RULES: [DecodeRule; 7] = [
    DecodeRule {
        class: EncodingClass::ImmediateToRegister,
        matches: |op| op.top_bits(4) == 0b1011,
        decode: I8086Decoder::immediate_to_register,
    },
    DecodeRule {
        class: EncodingClass::ImmediateToRegisterMemory,
        matches: |op| matches!(op.top_bits(6), IMMEDIATE_ARITHMETIC | IMMEDIATE_MOV),
        decode: I8086Decoder::immediate_to_register_memory,
    },
    DecodeRule {
        class: EncodingClass::ImmediateToAccumulator(Mnemonic::Add),
        matches: |op| op.top_bits(7) == 0b0000010,
        decode: |decoder, op, reader| {
            decoder.immediate_to_accumulator(Mnemonic::Add, op, reader)
        },
    },
    DecodeRule {
        class: EncodingClass::ImmediateToAccumulator(Mnemonic::Sub),
        matches: |op| op.top_bits(7) == 0b0010110,
        decode: |decoder, op, reader| {
            decoder.immediate_to_accumulator(Mnemonic::Sub, op, reader)
        },
    },
    DecodeRule {
        class: EncodingClass::ImmediateToAccumulator(Mnemonic::Cmp),
        matches: |op| op.top_bits(7) == 0b0011110,
        decode: |decoder, op, reader| {
            decoder.immediate_to_accumulator(Mnemonic::Cmp, op, reader)
        },
    },
    DecodeRule {
        class: EncodingClass::Branch,
        matches: |op| jump_mnemonic(op.value()).is_some(),
        decode: I8086Decoder::branch,
    },
    DecodeRule {
        class: EncodingClass::RegisterMemory,
        matches: |op| lookup(&REGISTER_MEMORY_OPS, op.top_bits(6)).is_some(),
        decode: I8086Decoder::register_memory,
    },
];

fn find_rule(opcode: Opcode8) -> Option<&'static DecodeRule> {
    DECODE_RULES.iter().find(|rule| (rule.matches)(opcode))
}

/// Classifies a leading byte without consuming anything.
pub fn classify(byte: u8) -> Option<EncodingClass> {
    find_rule(Opcode8::new(byte)).map(|rule| rule.class)
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn read_u8(&mut self) -> Result<u8> {
        match self.bytes.get(self.position) {
            Some(byte) => {
                self.position += 1;
                Ok(*byte)
            }
            None => Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: self.position + 1,
                available: self.bytes.len(),
            }),
        }
    }

    fn read_u16(&mut self) -> Result<u16> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }
}

/// Decoder for the supported 8086 subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct I8086Decoder {
    sign_extend_immediates: bool,
}

impl I8086Decoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sign-extend S=1 byte immediates into the full word. Off by default: the
    /// raw byte value is carried through unchanged.
    pub fn with_sign_extension(mut self, enabled: bool) -> Self {
        self.sign_extend_immediates = enabled;
        self
    }

    fn read_data(&self, reader: &mut ByteReader<'_>, word: bool) -> Result<Immediate> {
        if word {
            Ok(Immediate::word(reader.read_u16()?))
        } else {
            Ok(Immediate::byte(reader.read_u8()?))
        }
    }

    fn read_arithmetic_data(
        &self,
        reader: &mut ByteReader<'_>,
        word: bool,
        sign: bool,
    ) -> Result<Immediate> {
        if !word || !sign {
            return self.read_data(reader, word);
        }
        let byte = reader.read_u8()?;
        let value = if self.sign_extend_immediates {
            byte as i8 as i16 as u16
        } else {
            byte as u16
        };
        Ok(Immediate::word(value))
    }

    fn register_or_memory(
        &self,
        reader: &mut ByteReader<'_>,
        mode: u8,
        rm: u8,
        width: Width,
    ) -> Result<Operand> {
        let operand = match mode {
            0b11 => Operand::Register(RegisterId::from_fields(rm, width == Width::Word)),
            0b00 if rm == DIRECT_ADDRESS_RM => {
                let address = reader.read_u16()?;
                Operand::Memory(MemoryOperand::new(
                    EffectiveAddress::Direct(address),
                    0,
                    width,
                ))
            }
            0b00 => Operand::Memory(MemoryOperand::new(EffectiveAddress::base(rm), 0, width)),
            0b01 => {
                let displacement = reader.read_u8()? as i8 as i16;
                Operand::Memory(MemoryOperand::new(
                    EffectiveAddress::base(rm),
                    displacement,
                    width,
                ))
            }
            _ => {
                let displacement = reader.read_u16()? as i16;
                Operand::Memory(MemoryOperand::new(
                    EffectiveAddress::base(rm),
                    displacement,
                    width,
                ))
            }
        };
        Ok(operand)
    }

    // 1011 w reg, data, data if w
    fn immediate_to_register(
        &self,
        opcode: Opcode8,
        reader: &mut ByteReader<'_>,
    ) -> Result<Instruction> {
        let word = opcode.get_bit(3);
        let reg = opcode.get_bits(0, 3);
        let destination = Operand::Register(RegisterId::from_fields(reg, word));
        let data = self.read_data(reader, word)?;
        tracing::trace!("immediate to register | w={} reg={:03b}", word as u8, reg);
        Ok(Instruction::new(
            Mnemonic::Mov,
            destination,
            Operand::Immediate(data),
            reader.position(),
        ))
    }

    // 100000 s w | mod op r/m | disp | data | data if s:w=01
    // 110001 1 w | mod 000 r/m | disp | data | data if w
    fn immediate_to_register_memory(
        &self,
        opcode: Opcode8,
        reader: &mut ByteReader<'_>,
    ) -> Result<Instruction> {
        let word = opcode.get_bit(0);
        let sign = opcode.get_bit(1);
        let modrm = Opcode8::new(reader.read_u8()?);
        let mode = modrm.get_bits(6, 2);
        let op = modrm.get_bits(3, 3);
        let rm = modrm.get_bits(0, 3);

        let is_mov = opcode.top_bits(6) == IMMEDIATE_MOV;
        let mnemonic = if is_mov {
            Mnemonic::Mov
        } else {
            lookup(&IMMEDIATE_OPS, op).ok_or(DecodeError::UnsupportedEncoding {
                offset: 1,
                byte: modrm.value(),
            })?
        };

        let destination = self.register_or_memory(reader, mode, rm, Width::from_flag(word))?;
        let data = if is_mov {
            self.read_data(reader, word)?
        } else {
            self.read_arithmetic_data(reader, word, sign)?
        };
        tracing::trace!(
            "immediate to register/memory | s={} w={} mod={:02b} rm={:03b}",
            sign as u8,
            word as u8,
            mode,
            rm
        );
        Ok(Instruction::new(
            mnemonic,
            destination,
            Operand::Immediate(data),
            reader.position(),
        ))
    }

    // xxxxxxx w, data, data if w
    fn immediate_to_accumulator(
        &self,
        mnemonic: Mnemonic,
        opcode: Opcode8,
        reader: &mut ByteReader<'_>,
    ) -> Result<Instruction> {
        let word = opcode.get_bit(0);
        let destination = Operand::Register(RegisterId::from_fields(0, word));
        let data = self.read_data(reader, word)?;
        Ok(Instruction::new(
            mnemonic,
            destination,
            Operand::Immediate(data),
            reader.position(),
        ))
    }

    fn branch(&self, opcode: Opcode8, reader: &mut ByteReader<'_>) -> Result<Instruction> {
        let mnemonic = jump_mnemonic(opcode.value()).ok_or(DecodeError::UnsupportedEncoding {
            offset: 0,
            byte: opcode.value(),
        })?;
        let displacement = reader.read_u8()? as i8;
        Ok(Instruction::branch(
            mnemonic,
            displacement,
            reader.position(),
        ))
    }

    // xxxxxx d w | mod reg r/m | disp-lo | disp-hi
    fn register_memory(
        &self,
        opcode: Opcode8,
        reader: &mut ByteReader<'_>,
    ) -> Result<Instruction> {
        let mnemonic = lookup(&REGISTER_MEMORY_OPS, opcode.top_bits(6)).ok_or(
            DecodeError::UnsupportedEncoding {
                offset: 0,
                byte: opcode.value(),
            },
        )?;
        let direction = opcode.get_bit(1);
        let word = opcode.get_bit(0);
        let modrm = Opcode8::new(reader.read_u8()?);
        let mode = modrm.get_bits(6, 2);
        let reg = modrm.get_bits(3, 3);
        let rm = modrm.get_bits(0, 3);

        let register = Operand::Register(RegisterId::from_fields(reg, word));
        let other = self.register_or_memory(reader, mode, rm, Width::from_flag(word))?;
        let (destination, source) = if direction {
            (register, other)
        } else {
            (other, register)
        };
        tracing::trace!(
            "register/memory | d={} w={} mod={:02b} reg={:03b} rm={:03b}",
            direction as u8,
            word as u8,
            mode,
            reg,
            rm
        );
        Ok(Instruction::new(
            mnemonic,
            destination,
            source,
            reader.position(),
        ))
    }
}

impl DecodeOne for I8086Decoder {
    type Instruction = Instruction;

    fn decode_one(&self, bytes: &[u8]) -> Result<Self::Instruction> {
        let Some(&first) = bytes.first() else {
            return Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: 1,
                available: 0,
            });
        };
        let opcode = Opcode8::new(first);
        let rule = find_rule(opcode).ok_or(DecodeError::UnsupportedEncoding {
            offset: 0,
            byte: first,
        })?;

        let mut reader = ByteReader::new(bytes);
        reader.read_u8()?;
        let instruction = (rule.decode)(self, opcode, &mut reader)?;
        tracing::trace!(
            "{:?} | {} (len {})",
            rule.class,
            instruction,
            instruction.length
        );
        Ok(instruction)
    }
}

/// Decodes the instruction at the start of `bytes`, returning it with the
/// number of bytes it occupies.
pub fn decode_one(bytes: &[u8]) -> Result<(Instruction, usize)> {
    let instruction = I8086Decoder::new().decode_one(bytes)?;
    let len = instruction.length;
    Ok((instruction, len))
}

/// Decodes `bytes` front to back until it is exhausted.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Instruction>> {
    I8086Decoder::new().decode(bytes)
}
