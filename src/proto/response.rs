use super::frame::BackwardFrame;

/// Decodes the backward frame (if any) returned for one command.
pub type Decoder = fn(Option<BackwardFrame>) -> Response;

/// Typed result of a query command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    YesNo(YesNo),
    Numeric(Numeric),
    Status(GearStatus),
    EmergencyMode(EmergencyMode),
}

/// Implemented by each typed response so sequences can ask for the one they expect.
pub trait FromResponse: Sized {
    fn from_response(response: Response) -> Option<Self>;
}

macro_rules! typed_response {
    ($ty:ident, $variant:ident) => {
        impl $ty {
            pub fn decode(raw: Option<BackwardFrame>) -> Response {
                Response::$variant($ty { raw })
            }

            pub fn raw(&self) -> Option<BackwardFrame> {
                self.raw
            }

            /// No backward frame was received.
            pub fn is_empty(&self) -> bool {
                self.raw.is_none()
            }
        }

        impl FromResponse for $ty {
            fn from_response(response: Response) -> Option<Self> {
                match response {
                    Response::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! flags {
    ($ty:ident { $($name:ident = $bit:expr),+ $(,)? }) => {
        impl $ty {
            $(
                pub fn $name(&self) -> bool {
                    self.raw.is_some_and(|f| f.bits() & (1 << $bit) != 0)
                }
            )+
        }
    };
}

/// Answer to a yes/no query. Any frame means yes, including a garbled one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YesNo {
    raw: Option<BackwardFrame>,
}
typed_response!(YesNo, YesNo);

impl YesNo {
    pub fn value(&self) -> bool {
        self.raw.is_some()
    }
}

pub const MASK: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeric {
    raw: Option<BackwardFrame>,
}
typed_response!(Numeric, Numeric);

impl Numeric {
    /// The number received, if a clean frame arrived.
    pub fn value(&self) -> Option<u8> {
        self.raw.filter(|f| !f.ambiguous).map(|f| f.value)
    }

    pub fn is_mask(&self) -> bool {
        self.value() == Some(MASK)
    }
}

/// Reply to QueryStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GearStatus {
    raw: Option<BackwardFrame>,
}
typed_response!(GearStatus, Status);
flags!(GearStatus {
    control_gear_failure = 0,
    lamp_failure = 1,
    lamp_arc_power_on = 2,
    limit_error = 3,
    fade_running = 4,
    reset_state = 5,
    missing_short_address = 6,
    power_failure = 7,
});

/// Reply to QueryEmergencyMode (emergency units only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyMode {
    raw: Option<BackwardFrame>,
}
typed_response!(EmergencyMode, EmergencyMode);
flags!(EmergencyMode {
    rest_mode = 0,
    normal_mode = 1,
    emergency_mode = 2,
    extended_emergency_mode = 3,
    function_test = 4,
    duration_test = 5,
    hardwired_inhibit = 6,
    hardwired_switch = 7,
});
