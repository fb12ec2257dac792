use std::fmt;

/// A forward frame: `bits` wide, value held in the low bits of `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardFrame {
    pub bits: u8,
    pub data: u32,
}

impl ForwardFrame {
    pub fn new(bits: u8, data: u32) -> Self {
        Self { bits, data }
    }

    /// The 16-bit frame used by control gear: address byte then opcode/data byte.
    pub fn gear(address: u8, opcode: u8) -> Self {
        Self::new(16, u32::from(u16::from_be_bytes([address, opcode])))
    }

    /// Big-endian bytes of the frame; `None` unless the width is a whole number of bytes.
    pub fn pack(&self) -> Option<Vec<u8>> {
        if self.bits == 0 || self.bits % 8 != 0 || self.bits > 32 {
            return None;
        }
        let n = usize::from(self.bits / 8);
        Some(self.data.to_be_bytes()[4 - n..].to_vec())
    }
}

impl fmt::Display for ForwardFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = usize::from(self.bits).div_ceil(4);
        write!(f, "{}:{:0width$X}", self.bits, self.data, width = digits)
    }
}

/// A backward frame as reported by the gateway.
///
/// `ambiguous` marks the value the daemon reports when several devices
/// answered at once and the reply was garbled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardFrame {
    pub value: u8,
    pub ambiguous: bool,
}

impl BackwardFrame {
    pub fn new(value: u8) -> Self {
        Self {
            value,
            ambiguous: false,
        }
    }

    pub fn ambiguous(value: u8) -> Self {
        Self {
            value,
            ambiguous: true,
        }
    }

    /// Byte to interpret bit fields from. A garbled reply reads as all ones.
    pub fn bits(&self) -> u8 {
        if self.ambiguous { 0xFF } else { self.value }
    }
}
