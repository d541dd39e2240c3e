pub mod decoder;
pub mod jump;
pub mod opcode;

/// Anything with an exact encoded size, which is what both the decode driver
/// and the jump resolver need to walk a byte stream as a sequence.
pub trait Instruction {
    fn len_bytes(&self) -> usize;
}
