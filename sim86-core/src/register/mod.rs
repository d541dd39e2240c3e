use num_traits::Unsigned;
use std::fmt;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register<T>
where
    T: Unsigned + Copy,
{
    value: T,
}

impl<T: Unsigned + Copy> Register<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn read(&self) -> T {
        self.value
    }

    pub fn write(&mut self, value: T) {
        self.value = value;
    }
}

pub type Reg16 = Register<u16>;
impl fmt::Debug for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("0x{:04X}", self.value))
    }
}

impl Reg16 {
    pub fn low(&self) -> u8 {
        (self.value & 0x00FF) as u8
    }

    pub fn high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Replaces the low byte, leaving the high byte untouched.
    pub fn write_low(&mut self, value: u8) {
        self.value = (self.value & 0xFF00) | value as u16;
    }

    /// Replaces the high byte, leaving the low byte untouched.
    pub fn write_high(&mut self, value: u8) {
        self.value = (self.value & 0x00FF) | ((value as u16) << 8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg16() {
        let mut reg = Reg16::new(0);
        assert_eq!(reg.read(), 0);
        reg.write(1);
        assert_eq!(reg.read(), 1);
        reg.write(u16::MAX);
        assert_eq!(reg.read(), u16::MAX);
        assert_eq!(format!("{:?}", reg), "0xFFFF");
    }

    #[test]
    fn test_reg16_halves() {
        let mut reg = Reg16::new(0x1234);
        assert_eq!(reg.low(), 0x34);
        assert_eq!(reg.high(), 0x12);
        reg.write_low(0xFF);
        assert_eq!(reg.read(), 0x12FF);
        reg.write_high(0x00);
        assert_eq!(reg.read(), 0x00FF);
        assert_eq!(reg.high(), 0);
    }
}
