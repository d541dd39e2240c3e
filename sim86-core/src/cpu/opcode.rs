use std::fmt;

/// A raw opcode (or ModRM-style operand byte) with bit-field accessors.
///
/// Bit indices count from the least-significant bit, so the 8086 `mod` field
/// of a ModRM byte is `get_bits(6, 2)` and the `r/m` field is `get_bits(0, 3)`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode8 {
    value: u8,
}

impl fmt::Debug for Opcode8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("0x{:02X}", self.value))
    }
}

impl Opcode8 {
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Extracts `width` bits starting at `lsb`. Out-of-range requests are
    /// clamped to the byte rather than rejected.
    pub fn get_bits(&self, lsb: u32, width: u32) -> u8 {
        let shifted = self.value.checked_shr(lsb).unwrap_or(0);
        let mask = ((1u16 << width.min(8)) - 1) as u8;
        shifted & mask
    }

    pub fn get_bit(&self, idx: u32) -> bool {
        self.get_bits(idx, 1) == 1
    }

    /// The `width` most-significant bits, e.g. `top_bits(4) == 0b1011` for a
    /// `mov` immediate-to-register opcode.
    pub fn top_bits(&self, width: u32) -> u8 {
        let width = width.min(8);
        self.get_bits(8 - width, width)
    }
}
