// Wire codec for the gateway daemon.
//
// Request: [0x02, 0x00, frame_hi, frame_lo]
// Reply:   [version, status, value, pad]
use std::io::{Read, Write};

use tracing::trace;

use super::GatewayError;
use crate::proto::{BackwardFrame, Command, ForwardFrame, Response};

pub const MESSAGE_LEN: usize = 4;
pub const REQUEST_TYPE: u8 = 0x02;

pub const STATUS_NO_RESPONSE: u8 = 0;
pub const STATUS_RESPONSE: u8 = 1;
/// Several devices answered and the daemon saw a framing error. Means "yes".
pub const STATUS_AMBIGUOUS: u8 = 255;

/// Outcome of one exchange with the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionResult {
    NoResponse,
    ValidBackwardFrame(u8),
    AmbiguousBackwardFrame(u8),
}

impl TransactionResult {
    pub fn backward_frame(self) -> Option<BackwardFrame> {
        match self {
            TransactionResult::NoResponse => None,
            TransactionResult::ValidBackwardFrame(v) => Some(BackwardFrame::new(v)),
            TransactionResult::AmbiguousBackwardFrame(v) => Some(BackwardFrame::ambiguous(v)),
        }
    }
}

pub fn encode_request(frame: ForwardFrame) -> Result<[u8; MESSAGE_LEN], GatewayError> {
    match frame.pack().as_deref() {
        Some(&[hi, lo]) if frame.bits == 16 => Ok([REQUEST_TYPE, 0x00, hi, lo]),
        _ => Err(GatewayError::UnsupportedFrame { bits: frame.bits }),
    }
}

pub fn decode_reply(reply: [u8; MESSAGE_LEN]) -> Result<TransactionResult, GatewayError> {
    let [_version, status, value, _pad] = reply;
    match status {
        STATUS_NO_RESPONSE => Ok(TransactionResult::NoResponse),
        STATUS_RESPONSE => Ok(TransactionResult::ValidBackwardFrame(value)),
        STATUS_AMBIGUOUS => Ok(TransactionResult::AmbiguousBackwardFrame(STATUS_AMBIGUOUS)),
        other => Err(GatewayError::Status(other)),
    }
}

fn round_trip<S: Read + Write + ?Sized>(
    stream: &mut S,
    message: &[u8; MESSAGE_LEN],
) -> Result<[u8; MESSAGE_LEN], GatewayError> {
    stream.write_all(message)?;
    stream.flush()?;
    let mut reply = [0u8; MESSAGE_LEN];
    stream.read_exact(&mut reply)?;
    trace!(tx = ?message, rx = ?reply, "gateway exchange");
    Ok(reply)
}

/// Sends one command (twice if the command demands it) and decodes the final reply.
pub fn exchange<S: Read + Write + ?Sized>(
    stream: &mut S,
    command: &Command,
) -> Result<TransactionResult, GatewayError> {
    let message = encode_request(command.frame())?;
    let mut reply = round_trip(stream, &message)?;
    if command.send_twice() {
        // The first reply is superseded; only the repeated transmission counts.
        reply = round_trip(stream, &message)?;
    }
    decode_reply(reply)
}

/// Performs the full transaction for `command` on an open stream.
///
/// Commands belonging to a device type are preceded by EnableDeviceType on the
/// same stream; that exchange's result is discarded.
pub fn transact<S: Read + Write + ?Sized>(
    stream: &mut S,
    command: &Command,
) -> Result<Option<Response>, GatewayError> {
    // Reject unusable frames before anything reaches the wire.
    encode_request(command.frame())?;

    if command.device_type() != 0 {
        exchange(stream, &Command::enable_device_type(command.device_type()))?;
    }
    let result = exchange(stream, command)?;
    trace!(%command, ?result, "transaction complete");
    Ok(command.decode(result.backward_frame()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Address, GearStatus, Numeric, YesNo};
    use crate::test_support::MockStream;

    const A5: Address = Address::Short(5);

    fn reply(status: u8, value: u8) -> [u8; 4] {
        [2, status, value, 0]
    }

    #[test]
    fn request_layout() {
        let msg = encode_request(ForwardFrame::gear(0x0B, 0x91)).unwrap();
        assert_eq!(msg, [0x02, 0x00, 0x0B, 0x91]);
    }

    #[yare::parameterized(
        none_ignores_payload = { [7, 0, 0xAA, 0x55], TransactionResult::NoResponse },
        valid                = { [2, 1, 0x42, 0],    TransactionResult::ValidBackwardFrame(0x42) },
        valid_zero           = { [2, 1, 0x00, 0],    TransactionResult::ValidBackwardFrame(0x00) },
        ambiguous            = { [2, 255, 0x13, 0],  TransactionResult::AmbiguousBackwardFrame(255) },
    )]
    fn decode_status(reply: [u8; 4], expected: TransactionResult) {
        assert_eq!(decode_reply(reply).unwrap(), expected);
    }

    #[yare::parameterized(
        two   = { 2 },
        seven = { 7 },
        big   = { 254 },
    )]
    fn decode_unknown_status_fails(status: u8) {
        match decode_reply([2, status, 0, 0]) {
            Err(GatewayError::Status(s)) => assert_eq!(s, status),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[yare::parameterized(
        wide   = { ForwardFrame::new(24, 0x00FF_00) },
        odd    = { ForwardFrame::new(25, 0x1) },
        narrow = { ForwardFrame::new(8, 0x12) },
    )]
    fn wrong_frame_shape_writes_nothing(frame: ForwardFrame) {
        let mut stream = MockStream::with_replies(&[reply(1, 0)]);
        let cmd = Command::new("Odd", frame)
            .with_device_type(3)
            .with_decoder(YesNo::decode);
        match transact(&mut stream, &cmd) {
            Err(GatewayError::UnsupportedFrame { bits }) => assert_eq!(bits, frame.bits),
            other => panic!("expected frame error, got {other:?}"),
        }
        assert!(stream.written().is_empty());
    }

    #[test]
    fn single_exchange_decodes_value() {
        let mut stream = MockStream::with_replies(&[reply(1, 200)]);
        let resp = transact(&mut stream, &Command::query_actual_level(A5)).unwrap();
        assert_eq!(resp, Some(Numeric::decode(Some(BackwardFrame::new(200)))));
        assert_eq!(stream.messages(), vec![[0x02, 0x00, 0x0B, 0xA0]]);
        assert_eq!(stream.unread(), 0);
    }

    #[test]
    fn no_response_reaches_decoder_as_none() {
        let mut stream = MockStream::with_replies(&[reply(0, 0x99)]);
        let resp = transact(&mut stream, &Command::query_control_gear_present(A5)).unwrap();
        assert_eq!(resp, Some(YesNo::decode(None)));
    }

    #[test]
    fn ambiguous_reply_is_a_yes() {
        let mut stream = MockStream::with_replies(&[reply(255, 0)]);
        let resp = transact(&mut stream, &Command::query_control_gear_present(A5)).unwrap();
        match resp {
            Some(Response::YesNo(r)) => {
                assert!(r.value());
                assert_eq!(r.raw(), Some(BackwardFrame::ambiguous(255)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fire_and_forget_produces_nothing() {
        let mut stream = MockStream::with_replies(&[reply(1, 3)]);
        assert_eq!(transact(&mut stream, &Command::off(A5)).unwrap(), None);
        assert_eq!(stream.messages().len(), 1);
    }

    #[test]
    fn unknown_status_fails_transaction() {
        let mut stream = MockStream::with_replies(&[reply(7, 0)]);
        let err = transact(&mut stream, &Command::query_status(A5)).unwrap_err();
        assert!(matches!(err, GatewayError::Status(7)));
    }

    #[test]
    fn send_twice_uses_second_reply() {
        let mut stream = MockStream::with_replies(&[reply(1, 0x01), reply(1, 0x02)]);
        let cmd = Command::new("Twice", ForwardFrame::gear(0x0B, 0x90))
            .with_send_twice()
            .with_decoder(GearStatus::decode);
        let resp = transact(&mut stream, &cmd).unwrap();
        assert_eq!(resp, Some(GearStatus::decode(Some(BackwardFrame::new(0x02)))));
        assert_eq!(
            stream.messages(),
            vec![[0x02, 0x00, 0x0B, 0x90], [0x02, 0x00, 0x0B, 0x90]]
        );
        assert_eq!(stream.unread(), 0);
    }

    #[test]
    fn send_twice_ignores_first_reply_status() {
        let mut stream = MockStream::with_replies(&[reply(9, 0), reply(0, 0)]);
        let cmd = Command::reset(A5);
        assert_eq!(transact(&mut stream, &cmd).unwrap(), None);
        assert_eq!(stream.messages().len(), 2);
    }

    #[test]
    fn device_type_enabled_first_on_same_stream() {
        let mut stream = MockStream::with_replies(&[reply(0, 0), reply(1, 0b0001_0000)]);
        let cmd = Command::query_status(A5).with_device_type(3);
        let resp = transact(&mut stream, &cmd).unwrap();
        assert_eq!(
            stream.messages(),
            vec![[0x02, 0x00, 0xC1, 0x03], [0x02, 0x00, 0x0B, 0x90]]
        );
        assert_eq!(resp, Some(GearStatus::decode(Some(BackwardFrame::new(0x10)))));
    }

    #[test]
    fn device_type_enabled_once_before_repeated_command() {
        let mut stream = MockStream::with_replies(&[reply(0, 0), reply(0, 0), reply(0, 0)]);
        let cmd = Command::reset(A5).with_device_type(1);
        transact(&mut stream, &cmd).unwrap();
        assert_eq!(
            stream.messages(),
            vec![
                [0x02, 0x00, 0xC1, 0x01],
                [0x02, 0x00, 0x0B, 0x20],
                [0x02, 0x00, 0x0B, 0x20],
            ]
        );
    }

    #[test]
    fn short_reply_is_transport_error() {
        let mut stream = MockStream::with_bytes(&[2, 1]);
        let err = transact(&mut stream, &Command::query_status(A5)).unwrap_err();
        assert!(matches!(err, GatewayError::Io(_)));
    }
}
