pub mod cpu;
pub mod decoder;
pub mod isa;
pub mod machine;

mod registers;

pub use crate::cpu::{
    run, CpuError, I8086Cpu, RunConfig, SignFlagPolicy, DEFAULT_STEP_LIMIT,
};
pub use crate::decoder::{classify, decode_all, decode_one, EncodingClass, I8086Decoder};
pub use crate::machine::{new_machine, MachineMemory, MachineState, MEMORY_SIZE};
pub use crate::registers::{Flags, Registers};
