use nom::bytes::streaming::take;
use nom::combinator::{cond, verify};
use nom::number::streaming::{be_u16, u8};
use nom::sequence::tuple;
use nom::Err::Incomplete;
use nom::IResult;
use snafu::Snafu;

use crate::consts::{CONTROL_LEN, FRAME_ID_CABLE, MSG_ACK};
use crate::types::{Frame, FrameData, MessageType, Route};
use crate::Checksum;

use core::convert::TryFrom;

type Buf = [u8];

/// Error returned by [`decode()`].
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The buffer ends before the frame does.
    #[snafu(display("Incomplete frame"))]
    Incomplete,
    /// The buffer doesn't start with a valid frame header for the route.
    #[snafu(display("Invalid frame"))]
    InvalidFrame,
    /// The frame is complete, but the checksums don't match.
    #[snafu(display("Frame checksum mismatch"))]
    ChecksumMismatch,
}

/// Decode one frame from the start of `buf`.
///
/// Unlike the [`Decoder`](crate::Decoder) the whole frame must be available, and
/// nothing is skipped: `buf` must begin with the frame id. Returns the frame and
/// the number of bytes it occupied.
///
/// # Example
/// ```
/// use fbus_proto::{decode, encode, Route};
/// let bytes = encode(0xD1, 1, 0x60, &[0x00, 0x01, 0x00, 0x03, 0x00]).unwrap();
/// let (frame, len) = decode(Route::TO_PHONE, &bytes).unwrap();
/// assert_eq!(len, bytes.len());
/// assert_eq!(frame.message_type(), 0xD1);
/// ```
/// # Errors
/// See [`DecodeError`].
pub fn decode(route: Route, buf: &[u8]) -> Result<(Frame, usize), DecodeError> {
    match raw_frame(route, buf) {
        Ok((rest, raw)) => {
            if Checksum::of(raw.covered).to_bytes() != raw.checksum {
                return Err(DecodeError::ChecksumMismatch);
            }
            let data = FrameData::try_from(raw.data).map_err(|_| DecodeError::InvalidFrame)?;
            let frame = Frame::from_parts(
                route,
                raw.message_type,
                raw.frames_to_go,
                raw.sequence,
                data,
            );
            Ok((frame, buf.len() - rest.len()))
        }
        Err(Incomplete(_)) => Err(DecodeError::Incomplete),
        Err(_) => Err(DecodeError::InvalidFrame),
    }
}

#[derive(Debug, PartialEq)]
struct RawFrame<'a> {
    message_type: MessageType,
    data: &'a Buf,
    frames_to_go: u8,
    sequence: u8,
    /// Everything the checksums are computed over
    covered: &'a Buf,
    checksum: [u8; 2],
}

fn raw_frame(route: Route, buf: &Buf) -> IResult<&Buf, RawFrame> {
    let (rest, (_id, _dest, _src, message_type)) = tuple((
        byte(FRAME_ID_CABLE),
        byte(route.dest),
        byte(route.src),
        any_byte,
    ))(buf)?;
    let (rest, length) = verify(length_field, |len: &u16| {
        if message_type == MSG_ACK {
            usize::from(*len) == CONTROL_LEN
        } else {
            (CONTROL_LEN..=0xFF).contains(&usize::from(*len))
        }
    })(rest)?;
    let data_len = usize::from(length) - CONTROL_LEN;
    let (rest, (data, frames_to_go, sequence, _pad)) =
        tuple((take(data_len), any_byte, any_byte, cond(data_len % 2 == 1, any_byte)))(rest)?;
    let covered = &buf[..buf.len() - rest.len()];
    let (rest, (checksum_odd, checksum_even)) = tuple((any_byte, any_byte))(rest)?;

    Ok((
        rest,
        RawFrame {
            message_type,
            data,
            frames_to_go,
            sequence,
            covered,
            checksum: [checksum_odd, checksum_even],
        },
    ))
}

fn any_byte(buf: &Buf) -> IResult<&Buf, u8> {
    u8(buf)
}

fn length_field(buf: &Buf) -> IResult<&Buf, u16> {
    be_u16(buf)
}

fn byte<'a>(expected: u8) -> impl Fn(&'a Buf) -> IResult<&'a Buf, u8> {
    move |buf| verify(any_byte, |b: &u8| *b == expected)(buf)
}
