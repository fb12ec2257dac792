//! Bus-level types: addresses, frames, commands and typed responses.

pub mod address;
pub mod command;
pub mod frame;
pub mod response;

pub use address::{Address, AddressError};
pub use command::Command;
pub use frame::{BackwardFrame, ForwardFrame};
pub use response::{EmergencyMode, FromResponse, GearStatus, Numeric, Response, YesNo};
