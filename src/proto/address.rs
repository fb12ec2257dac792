use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const MAX_SHORT: u8 = 63;
pub const MAX_GROUP: u8 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("short address {0} out of range 0..=63")]
    Short(u8),
    #[error("group address {0} out of range 0..=15")]
    Group(u8),
    #[error("invalid address: {0}")]
    Parse(String),
}

/// Destination of a forward frame on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    Short(u8),
    Group(u8),
    Broadcast,
}

impl Address {
    pub fn short(a: u8) -> Result<Self, AddressError> {
        if a > MAX_SHORT {
            return Err(AddressError::Short(a));
        }
        Ok(Address::Short(a))
    }

    pub fn group(g: u8) -> Result<Self, AddressError> {
        if g > MAX_GROUP {
            return Err(AddressError::Group(g));
        }
        Ok(Address::Group(g))
    }

    /// Every short address on one bus, in order.
    pub fn all_short() -> impl Iterator<Item = Address> {
        (0..=MAX_SHORT).map(Address::Short)
    }

    /// Address byte with the selector bit set (ordinary command follows).
    pub fn command_byte(self) -> u8 {
        self.arc_power_byte() | 0x01
    }

    /// Address byte with the selector bit clear (direct arc power level follows).
    pub fn arc_power_byte(self) -> u8 {
        match self {
            Address::Short(a) => a << 1,
            Address::Group(g) => 0x80 | (g << 1),
            Address::Broadcast => 0xFE,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Short(a) => write!(f, "GearShort({a})"),
            Address::Group(g) => write!(f, "GearGroup({g})"),
            Address::Broadcast => f.write_str("GearBroadcast"),
        }
    }
}

/// Accepts `N` for a short address and `gN` for a group.
impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, is_group) = match s.strip_prefix(['g', 'G']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let n: u8 = digits
            .parse()
            .map_err(|_| AddressError::Parse(s.to_string()))?;
        if is_group {
            Address::group(n)
        } else {
            Address::short(n)
        }
    }
}
