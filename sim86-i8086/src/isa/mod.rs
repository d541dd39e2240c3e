pub mod instruction;
pub mod operand;
pub mod register;

pub use instruction::{Instruction, Mnemonic};
pub use operand::{EffectiveAddress, Immediate, MemoryOperand, Operand, Width};
pub use register::{RegisterId, RegisterPart, WordRegister};
