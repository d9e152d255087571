//! This module defines the F-Bus frame and the range-checked types that
//! go into it, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use arrayvec::ArrayVec;
use core::convert::{TryFrom, TryInto};
use core::fmt;
use core::ops::Deref;

use crate::consts::{DEVICE_HOST, DEVICE_PHONE, MAX_DATA_LEN, MAX_FRAME_LEN, MSG_ACK};

/// Error type for this module
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid three bit sequence number.
    #[snafu(display("Invalid sequence number"))]
    InvalidSequence,
    /// The data block doesn't fit in a single frame.
    #[snafu(display("Payload of {} bytes exceeds the frame capacity", len))]
    PayloadTooLong { len: usize },
}

const fn invalid_sequence() -> InvalidSequenceSnafu {
    InvalidSequenceSnafu
}

/// Message type (opcode) of a frame.
pub type MessageType = u8;

/// Data block of a single frame.
pub type FrameData = ArrayVec<u8, MAX_DATA_LEN>;

/// A complete encoded frame, ready to be written to the transport.
pub type FrameBytes = ArrayVec<u8, MAX_FRAME_LEN>;

/// `SequenceNumber` is a range-checked \[0, 7\] rolling frame counter.
///
/// ## Example
/// ```
/// use fbus_proto::SequenceNumber;
/// let seq = SequenceNumber::new(7).unwrap();
/// assert_eq!(*seq.next(), 0);
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash, Default)]
#[repr(transparent)]
pub struct SequenceNumber(u8);

/// Create a new [`SequenceNumber`], panics if it is out of range.
pub const fn seq(s: u8) -> SequenceNumber {
    if s <= 7 {
        return SequenceNumber(s);
    }
    panic!("Invalid sequence number.")
}

impl SequenceNumber {
    pub const MASK: u8 = 0x07;

    /// Create a new sequence number, checking that it is in \[0, 7\].
    /// # Errors
    /// Returns [`Error::InvalidSequence`] if `sequence` is out of range.
    pub fn new(sequence: impl TryInto<u8>) -> Result<Self, Error> {
        let sequence = sequence.try_into().ok().with_context(invalid_sequence)?;
        ensure!(sequence <= Self::MASK, invalid_sequence());
        Ok(Self(sequence))
    }

    /// Extract the sequence number from a raw sequence byte, ignoring the flag bits.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & Self::MASK)
    }

    /// The following sequence number, wrapping from 7 to 0.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & Self::MASK)
    }
}

impl Deref for SequenceNumber {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u8> for SequenceNumber {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl TryFrom<u8> for SequenceNumber {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SequenceNumber> for u8 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

/// Destination and source device of a frame.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct Route {
    pub dest: u8,
    pub src: u8,
}

impl Route {
    /// Frames sent by the host to the phone.
    pub const TO_PHONE: Route = Route {
        dest: DEVICE_PHONE,
        src: DEVICE_HOST,
    };
    /// Frames sent by the phone to the host.
    pub const TO_HOST: Route = Route {
        dest: DEVICE_HOST,
        src: DEVICE_PHONE,
    };

    /// The route a reply to a frame on this route travels.
    pub const fn reverse(self) -> Route {
        Route {
            dest: self.src,
            src: self.dest,
        }
    }
}

/// Contents of an acknowledge frame: the message type and sequence number
/// of the frame being acknowledged.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct Ack {
    pub message_type: MessageType,
    pub sequence: SequenceNumber,
}

/// A decoded F-Bus frame.
///
/// For acknowledge frames the frames-to-go byte holds the acknowledged message
/// type and the sequence byte the acknowledged sequence number, see [`Frame::ack()`].
#[derive(PartialEq, Eq, Clone)]
pub struct Frame {
    route: Route,
    message_type: MessageType,
    frames_to_go: u8,
    sequence: u8,
    data: FrameData,
}

impl Frame {
    /// Build a frame from its parts.
    /// # Errors
    /// Returns [`Error::PayloadTooLong`] if `data` is longer than
    /// [`MAX_DATA_LEN`](crate::consts::MAX_DATA_LEN).
    pub fn new(
        route: Route,
        message_type: MessageType,
        frames_to_go: u8,
        sequence: u8,
        data: &[u8],
    ) -> Result<Self, Error> {
        let data = FrameData::try_from(data)
            .ok()
            .context(PayloadTooLongSnafu { len: data.len() })?;
        Ok(Self {
            route,
            message_type,
            frames_to_go,
            sequence,
            data,
        })
    }

    pub(crate) fn from_parts(
        route: Route,
        message_type: MessageType,
        frames_to_go: u8,
        sequence: u8,
        data: FrameData,
    ) -> Self {
        Self {
            route,
            message_type,
            frames_to_go,
            sequence,
            data,
        }
    }

    pub const fn route(&self) -> Route {
        self.route
    }

    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Number of frames remaining in a multi-frame message.
    pub const fn frames_to_go(&self) -> u8 {
        self.frames_to_go
    }

    /// The sequence byte as received, including any flag bits.
    pub const fn sequence_byte(&self) -> u8 {
        self.sequence
    }

    pub const fn sequence_number(&self) -> SequenceNumber {
        SequenceNumber::from_byte(self.sequence)
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub const fn is_ack(&self) -> bool {
        self.message_type == MSG_ACK
    }

    /// Returns what is acknowledged if this is an acknowledge frame.
    pub const fn ack(&self) -> Option<Ack> {
        if self.is_ack() {
            Some(Ack {
                message_type: self.frames_to_go,
                sequence: SequenceNumber::from_byte(self.sequence),
            })
        } else {
            None
        }
    }

    /// Encode the frame into its on-wire representation.
    pub fn to_bytes(&self) -> FrameBytes {
        crate::encoder::encode_frame(self)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {{ {:02X}->{:02X} type {:02X} ftg {} seq {:02X} data [",
            self.route.src, self.route.dest, self.message_type, self.frames_to_go, self.sequence
        )?;
        for (i, b) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        f.write_str("] }")
    }
}
