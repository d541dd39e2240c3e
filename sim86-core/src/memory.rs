use std::cell::Cell;
use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Hash)]
pub enum MemoryError {
    #[error("access of {length} bytes at 0x{address:04X} is out of range")]
    OutOfRange { address: usize, length: usize },
}

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub bytes_read: usize,
    pub bytes_written: usize,
    pub num_reads: usize,
    pub num_writes: usize,
}

/// Flat, byte-addressable memory of `N` bytes. Multi-byte accessors are
/// little-endian.
#[derive(Clone)]
pub struct Memory<const N: usize> {
    buffer: Box<[u8]>,
    bytes_read: Cell<usize>,
    bytes_written: usize,
    num_reads: Cell<usize>,
    num_writes: usize,
}

impl<const N: usize> fmt::Debug for Memory<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("size", &N)
            .field("stats", &self.stats())
            .finish()
    }
}

// Contents only; access counters don't take part in equality.
impl<const N: usize> PartialEq for Memory<N> {
    fn eq(&self, other: &Self) -> bool {
        self.buffer == other.buffer
    }
}

impl<const N: usize> Eq for Memory<N> {}

impl<const N: usize> Default for Memory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Memory<N> {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; N].into_boxed_slice(),
            bytes_read: Cell::new(0),
            bytes_written: 0,
            num_reads: Cell::new(0),
            num_writes: 0,
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    fn check(address: usize, length: usize) -> Result<()> {
        match address.checked_add(length) {
            Some(end) if end <= N => Ok(()),
            _ => Err(MemoryError::OutOfRange { address, length }),
        }
    }

    pub fn read(&self, address: usize, length: usize) -> Result<&[u8]> {
        Self::check(address, length)?;
        self.bytes_read.set(self.bytes_read.get() + length);
        self.num_reads.set(self.num_reads.get() + 1);
        tracing::trace!("read request: {} bytes at 0x{:04X}", length, address);
        Ok(&self.buffer[address..address + length])
    }

    pub fn read_u8(&self, address: usize) -> Result<u8> {
        let slice = self.read(address, 1)?;
        Ok(slice[0])
    }

    pub fn read_u16(&self, address: usize) -> Result<u16> {
        let slice = self.read(address, 2)?;
        Ok(u16::from_le_bytes([slice[0], slice[1]]))
    }

    pub fn write(&mut self, address: usize, data: &[u8]) -> Result<()> {
        Self::check(address, data.len())?;
        self.bytes_written += data.len();
        self.num_writes += 1;
        tracing::trace!("write request: {} bytes at 0x{:04X}", data.len(), address);
        self.buffer[address..address + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn write_u8(&mut self, address: usize, value: u8) -> Result<()> {
        self.write(address, &[value])
    }

    pub fn write_u16(&mut self, address: usize, value: u16) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            bytes_read: self.bytes_read.get(),
            bytes_written: self.bytes_written,
            num_reads: self.num_reads.get(),
            num_writes: self.num_writes,
        }
    }
}
