use std::fmt;

use super::address::Address;
use super::frame::{BackwardFrame, ForwardFrame};
use super::response::{Decoder, EmergencyMode, GearStatus, Numeric, Response, YesNo};

/// Device type carried by emergency lighting units.
pub const DEVICE_TYPE_EMERGENCY: u8 = 1;

// ---- Opcodes (second byte of a 16-bit gear frame) ----
const OFF: u8 = 0x00;
const UP: u8 = 0x01;
const DOWN: u8 = 0x02;
const RESET: u8 = 0x20;
const QUERY_STATUS: u8 = 0x90;
const QUERY_CONTROL_GEAR_PRESENT: u8 = 0x91;
const QUERY_DEVICE_TYPE: u8 = 0x99;
const QUERY_ACTUAL_LEVEL: u8 = 0xA0;
const QUERY_NEXT_DEVICE_TYPE: u8 = 0xA7;
const QUERY_EMERGENCY_MODE: u8 = 0xFA;

// ---- Special commands (first byte selects the command) ----
const ENABLE_DEVICE_TYPE: u8 = 0xC1;

/// One bus command as the gateway sees it.
#[derive(Clone)]
pub struct Command {
    label: String,
    frame: ForwardFrame,
    send_twice: bool,
    device_type: u8,
    decoder: Option<Decoder>,
}

impl Command {
    pub fn new(label: impl Into<String>, frame: ForwardFrame) -> Self {
        Self {
            label: label.into(),
            frame,
            send_twice: false,
            device_type: 0,
            decoder: None,
        }
    }

    pub fn with_send_twice(mut self) -> Self {
        self.send_twice = true;
        self
    }

    pub fn with_device_type(mut self, device_type: u8) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn frame(&self) -> ForwardFrame {
        self.frame
    }

    pub fn send_twice(&self) -> bool {
        self.send_twice
    }

    /// 0 when the command is common to all gear.
    pub fn device_type(&self) -> u8 {
        self.device_type
    }

    pub fn expects_response(&self) -> bool {
        self.decoder.is_some()
    }

    /// Runs the decoder; `None` for commands that do not expect an answer.
    pub fn decode(&self, frame: Option<BackwardFrame>) -> Option<Response> {
        self.decoder.map(|decode| decode(frame))
    }

    fn gear(name: &str, address: Address, opcode: u8) -> Self {
        Self::new(
            format!("{name}({address})"),
            ForwardFrame::gear(address.command_byte(), opcode),
        )
    }

    // ---- Level control ----

    /// Direct arc power control.
    pub fn dapc(address: Address, level: u8) -> Self {
        Self::new(
            format!("DAPC({address}, {level})"),
            ForwardFrame::gear(address.arc_power_byte(), level),
        )
    }

    pub fn off(address: Address) -> Self {
        Self::gear("Off", address, OFF)
    }

    pub fn up(address: Address) -> Self {
        Self::gear("Up", address, UP)
    }

    pub fn down(address: Address) -> Self {
        Self::gear("Down", address, DOWN)
    }

    // ---- Configuration ----

    pub fn reset(address: Address) -> Self {
        Self::gear("Reset", address, RESET).with_send_twice()
    }

    /// Makes the next command on the bus address the extended command set of `device_type`.
    pub fn enable_device_type(device_type: u8) -> Self {
        Self::new(
            format!("EnableDeviceType({device_type})"),
            ForwardFrame::gear(ENABLE_DEVICE_TYPE, device_type),
        )
    }

    // ---- Queries ----

    pub fn query_status(address: Address) -> Self {
        Self::gear("QueryStatus", address, QUERY_STATUS).with_decoder(GearStatus::decode)
    }

    pub fn query_control_gear_present(address: Address) -> Self {
        Self::gear("QueryControlGearPresent", address, QUERY_CONTROL_GEAR_PRESENT)
            .with_decoder(YesNo::decode)
    }

    pub fn query_device_type(address: Address) -> Self {
        Self::gear("QueryDeviceType", address, QUERY_DEVICE_TYPE).with_decoder(Numeric::decode)
    }

    pub fn query_next_device_type(address: Address) -> Self {
        Self::gear("QueryNextDeviceType", address, QUERY_NEXT_DEVICE_TYPE)
            .with_decoder(Numeric::decode)
    }

    pub fn query_actual_level(address: Address) -> Self {
        Self::gear("QueryActualLevel", address, QUERY_ACTUAL_LEVEL).with_decoder(Numeric::decode)
    }

    pub fn query_emergency_mode(address: Address) -> Self {
        Self::gear("QueryEmergencyMode", address, QUERY_EMERGENCY_MODE)
            .with_device_type(DEVICE_TYPE_EMERGENCY)
            .with_decoder(EmergencyMode::decode)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("label", &self.label)
            .field("frame", &self.frame)
            .field("send_twice", &self.send_twice)
            .field("device_type", &self.device_type)
            .field("expects_response", &self.expects_response())
            .finish()
    }
}
