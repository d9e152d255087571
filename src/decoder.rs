//! Resumable, byte-at-a-time frame decoder. See [`Decoder`] for details.

use log::{debug, trace};

use crate::consts::{CONTROL_LEN, FRAME_ID_CABLE, FRAME_ID_IRDA, MSG_ACK};
use crate::types::{Frame, FrameData, MessageType, Route};
use crate::Checksum;

/// Result of feeding one byte to the [`Decoder`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FrameEvent {
    /// The byte was consumed, more data is needed to complete a frame.
    NeedData,
    /// A frame with valid checksums was received.
    Complete(Frame),
    /// A complete frame was received, but its checksums don't match. The frame is dropped.
    ChecksumFailed,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum State {
    FrameId,
    Dest,
    Src,
    MsgType,
    LengthHigh,
    LengthLow,
    Data,
    FramesToGo,
    Sequence,
    Pad,
    ChecksumOdd,
    ChecksumEven,
}

/// Incremental F-Bus frame decoder.
///
/// Bytes are fed one at a time with [`feed()`](Decoder::feed), so the decoder
/// can be resumed at any point when the transport runs out of data.
/// Bytes that can't start or continue a frame are dropped, and the decoder
/// resynchronizes on the next frame id.
///
/// # Example
///
/// ```
/// use fbus_proto::{encoder::encode_routed, Decoder, FrameEvent, Route};
///
/// let bytes = encode_routed(Route::TO_HOST, 0xD2, 1, 0x41, b"V 5.22").unwrap();
/// let mut decoder = Decoder::new();
/// let mut frame = None;
/// for byte in bytes {
///     if let FrameEvent::Complete(f) = decoder.feed(byte) {
///         frame = Some(f);
///     }
/// }
/// assert_eq!(frame.unwrap().data(), b"V 5.22");
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    route: Route,
    state: State,
    checksum: Checksum,
    message_type: MessageType,
    data_len: usize,
    data: FrameData,
    frames_to_go: u8,
    sequence: u8,
    checksum_odd: u8,
}

impl Decoder {
    /// Decoder for frames sent from the phone to the host.
    pub fn new() -> Self {
        Self::with_route(Route::TO_HOST)
    }

    /// Decoder accepting only frames on the given route.
    pub fn with_route(route: Route) -> Self {
        Self {
            route,
            state: State::FrameId,
            checksum: Checksum::new(),
            message_type: 0,
            data_len: 0,
            data: FrameData::new(),
            frames_to_go: 0,
            sequence: 0,
            checksum_odd: 0,
        }
    }

    pub const fn route(&self) -> Route {
        self.route
    }

    /// Returns true when the decoder is waiting for the start of a frame.
    pub fn is_idle(&self) -> bool {
        self.state == State::FrameId
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.state = State::FrameId;
        self.checksum = Checksum::new();
        self.data.clear();
    }

    /// Feed one byte from the transport to the decoder.
    pub fn feed(&mut self, byte: u8) -> FrameEvent {
        use State::*;

        match self.state {
            FrameId => {
                if byte == FRAME_ID_CABLE {
                    self.accept(byte, Dest);
                } else if byte == FRAME_ID_IRDA {
                    trace!("F-Bus infrared frame id ignored");
                }
            }
            Dest => {
                if byte == self.route.dest {
                    self.accept(byte, Src);
                } else {
                    self.resync(byte);
                }
            }
            Src => {
                if byte == self.route.src {
                    self.accept(byte, MsgType);
                } else {
                    self.resync(byte);
                }
            }
            MsgType => {
                self.message_type = byte;
                self.accept(byte, LengthHigh);
            }
            LengthHigh => {
                if byte == 0 {
                    self.accept(byte, LengthLow);
                } else {
                    self.resync(byte);
                }
            }
            LengthLow => {
                let length = usize::from(byte);
                let valid = if self.message_type == MSG_ACK {
                    length == CONTROL_LEN
                } else {
                    length >= CONTROL_LEN
                };
                if valid {
                    self.data_len = length - CONTROL_LEN;
                    let next = if self.data_len == 0 { FramesToGo } else { Data };
                    self.accept(byte, next);
                } else {
                    self.resync(byte);
                }
            }
            Data => {
                // data_len <= MAX_DATA_LEN, the push can't overflow
                self.data.push(byte);
                let next = if self.data.len() == self.data_len {
                    FramesToGo
                } else {
                    Data
                };
                self.accept(byte, next);
            }
            FramesToGo => {
                self.frames_to_go = byte;
                self.accept(byte, Sequence);
            }
            Sequence => {
                self.sequence = byte;
                let next = if self.data_len % 2 == 1 {
                    Pad
                } else {
                    ChecksumOdd
                };
                self.accept(byte, next);
            }
            Pad => self.accept(byte, ChecksumOdd),
            ChecksumOdd => {
                self.checksum_odd = byte;
                self.state = ChecksumEven;
            }
            ChecksumEven => return self.finish(byte),
        }
        FrameEvent::NeedData
    }

    fn accept(&mut self, byte: u8, next: State) {
        self.checksum.push(byte);
        self.state = next;
    }

    /// The current frame is invalid. Start over, checking if `byte` begins a new frame.
    fn resync(&mut self, byte: u8) {
        debug!(
            "F-Bus sync lost in state {:?} on byte {:#04x}",
            self.state, byte
        );
        self.reset();
        if byte == FRAME_ID_CABLE {
            self.accept(byte, State::Dest);
        }
    }

    fn finish(&mut self, checksum_even: u8) -> FrameEvent {
        let expected = self.checksum;
        let data = core::mem::take(&mut self.data);
        self.reset();

        if expected.to_bytes() != [self.checksum_odd, checksum_even] {
            debug!(
                "F-Bus checksum mismatch: got {:02X} {:02X}, expected {:02X} {:02X}",
                self.checksum_odd,
                checksum_even,
                expected.odd(),
                expected.even()
            );
            return FrameEvent::ChecksumFailed;
        }

        let frame = Frame::from_parts(
            self.route,
            self.message_type,
            self.frames_to_go,
            self.sequence,
            data,
        );
        trace!("F-Bus rx {:?}", frame);
        FrameEvent::Complete(frame)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
