use crate::cpu::Instruction;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Hash)]
pub enum DecodeError {
    #[error("unsupported encoding 0x{byte:02X} at offset {offset}")]
    UnsupportedEncoding { offset: usize, byte: u8 },
    #[error("truncated input at offset {offset}: instruction needs at least {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("zero-length instruction at offset {offset}")]
    ZeroLengthInstruction { offset: usize },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::UnsupportedEncoding { offset, .. } => *offset,
            DecodeError::TruncatedInput { offset, .. } => *offset,
            DecodeError::ZeroLengthInstruction { offset } => *offset,
        }
    }

    /// Shifts a slice-relative offset into the coordinates of the enclosing
    /// buffer.
    pub fn rebase(self, base: usize) -> Self {
        match self {
            DecodeError::UnsupportedEncoding { offset, byte } => DecodeError::UnsupportedEncoding {
                offset: base + offset,
                byte,
            },
            DecodeError::TruncatedInput {
                offset,
                needed,
                available,
            } => DecodeError::TruncatedInput {
                offset: base + offset,
                needed,
                available,
            },
            DecodeError::ZeroLengthInstruction { offset } => {
                DecodeError::ZeroLengthInstruction {
                    offset: base + offset,
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub trait DecodeOne {
    type Instruction: Instruction;

    /// Decodes the instruction at the start of `bytes`. Errors carry offsets
    /// relative to `bytes`.
    fn decode_one(&self, bytes: &[u8]) -> Result<Self::Instruction>;
}

pub trait Decode: DecodeOne {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Self::Instruction>>;
}

impl<D: DecodeOne + ?Sized> Decode for D {
    #[tracing::instrument(name = "decode", skip_all, fields(len = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Self::Instruction>> {
        let mut instructions = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let remaining = &bytes[offset..];
            let instruction = self
                .decode_one(remaining)
                .map_err(|err| err.rebase(offset))?;

            let len = instruction.len_bytes();
            if len == 0 {
                return Err(DecodeError::ZeroLengthInstruction { offset });
            }
            if len > remaining.len() {
                return Err(DecodeError::TruncatedInput {
                    offset,
                    needed: len,
                    available: remaining.len(),
                });
            }

            tracing::trace!("offset {} | {} bytes consumed", offset, len);
            instructions.push(instruction);
            offset += len;
        }
        tracing::info!(
            "decoded {} instructions from {} bytes",
            instructions.len(),
            bytes.len()
        );
        Ok(instructions)
    }
}
