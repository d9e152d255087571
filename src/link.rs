//! Host side of an F-Bus link. See [`Link`] for details.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use snafu::{ResultExt, Snafu};

use crate::consts::{DEFAULT_WAKEUP_COUNT, HW_SW_REQUEST, MSG_REQ_HWSW, MSG_SMS, WAKEUP_BYTE};
use crate::decoder::{Decoder, FrameEvent};
use crate::encoder::{encode, encode_ack};
use crate::types::{Ack, Error as TypeError, Frame, FrameBytes, MessageType, SequenceNumber};

/// Error type for the link layer.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Reading from or writing to the transport failed.
    #[snafu(display("Transport I/O error: {}", source))]
    Io { source: io::Error },
    /// The outgoing frame couldn't be encoded.
    #[snafu(display("Failed to encode frame: {}", source))]
    Encode { source: TypeError },
    /// The phone didn't acknowledge a frame.
    #[snafu(display(
        "No ACK for message type {:#04x} after {} attempts",
        message_type,
        attempts
    ))]
    AckTimeout {
        message_type: MessageType,
        attempts: u32,
    },
}

/// Byte oriented serial channel to the phone.
///
/// `bytes_available()` must not block. `read_byte()` is only called after
/// `bytes_available()` has returned a non-zero count.
pub trait Transport {
    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;
    fn read_byte(&mut self) -> io::Result<u8>;
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
    /// Block until all written data has been transmitted.
    fn flush(&mut self) -> io::Result<()>;

    /// Throw away all data waiting in the receive buffer.
    fn discard_input(&mut self) -> io::Result<()> {
        while self.bytes_available()? > 0 {
            self.read_byte()?;
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

/// Tunables for a [`Link`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Opcode of the hardware/software version request. Phone model dependent.
    pub hw_sw_request_type: MessageType,
    /// Bits or-ed into the sequence byte of every transmitted frame.
    pub sequence_flags: u8,
    /// Number of wake-up bytes sent by [`Link::initialize()`].
    pub wakeup_count: usize,
    /// How long [`Link::send_frame_confirmed()`] waits for each ACK.
    pub ack_timeout: Duration,
    /// Retransmissions before [`Link::send_frame_confirmed()`] gives up.
    pub max_retries: u32,
    /// Sleep between polls while waiting for an ACK.
    pub poll_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            hw_sw_request_type: MSG_REQ_HWSW,
            sequence_flags: 0x60,
            wakeup_count: DEFAULT_WAKEUP_COUNT,
            ack_timeout: Duration::from_millis(200),
            max_retries: 2,
            poll_interval: Duration::from_millis(5),
        }
    }
}

/// State of the receive slot of a [`Link`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PacketStatus {
    /// Nothing received.
    Empty,
    /// A frame is partially received.
    Receiving,
    /// A frame was received, but not yet acknowledged.
    New,
    /// A frame was received and acknowledged, and is waiting to be consumed.
    Ready,
    /// The last frame failed the checksum test and was dropped.
    ChecksumFailed,
}

/// Host side of the F-Bus protocol, driving a [`Transport`].
///
/// There is a single receive slot: a received frame has to be consumed with
/// [`take_frame()`](Link::take_frame) or [`clear_frame()`](Link::clear_frame)
/// before [`poll()`](Link::poll) reads any more data from the transport.
///
/// # Example
///
/// ```no_run
/// # fn open_port() -> Box<dyn fbus_proto::Transport> { unimplemented!() }
/// use fbus_proto::{Link, PacketStatus};
///
/// # fn main() -> Result<(), fbus_proto::link::Error> {
/// let mut link = Link::new(open_port());
/// link.initialize()?;
/// link.request_hw_sw_info()?;
/// loop {
///     if link.poll()? == PacketStatus::Ready {
///         let frame = link.take_frame().unwrap();
///         println!("{:?}", frame);
///         break;
///     }
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Link<T: Transport> {
    transport: T,
    config: LinkConfig,
    outgoing_sequence: SequenceNumber,
    decoder: Decoder,
    status: PacketStatus,
    frame: Option<Frame>,
    last_ack: Option<Ack>,
    checksum_failures: u32,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    pub fn with_config(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            config,
            outgoing_sequence: SequenceNumber::default(),
            decoder: Decoder::new(),
            status: PacketStatus::Empty,
            frame: None,
            last_ack: None,
            checksum_failures: 0,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send `count` wake-up bytes to synchronize the phone's receiver.
    pub fn reset_bus(&mut self, count: usize) -> Result<(), Error> {
        let wakeup = vec![WAKEUP_BYTE; count];
        self.transport.write_all(&wakeup).context(IoSnafu)?;
        self.transport.flush().context(IoSnafu)
    }

    /// Prepare the phone for communication and reset the link state.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.transport.discard_input().context(IoSnafu)?;
        self.reset_bus(self.config.wakeup_count)?;
        self.outgoing_sequence = SequenceNumber::default();
        self.decoder.reset();
        self.status = PacketStatus::Empty;
        self.frame = None;
        self.last_ack = None;
        debug!("F-Bus link initialized");
        Ok(())
    }

    /// Process all data currently available from the transport, without blocking.
    ///
    /// Received frames are acknowledged immediately. Stops reading when a
    /// frame becomes [`Ready`](PacketStatus::Ready).
    pub fn poll(&mut self) -> Result<PacketStatus, Error> {
        if self.status == PacketStatus::New {
            self.acknowledge()?;
        }

        while self.status != PacketStatus::Ready
            && self.transport.bytes_available().context(IoSnafu)? > 0
        {
            let byte = self.transport.read_byte().context(IoSnafu)?;
            match self.decoder.feed(byte) {
                FrameEvent::NeedData => {
                    self.status = if self.decoder.is_idle() {
                        PacketStatus::Empty
                    } else {
                        PacketStatus::Receiving
                    };
                }
                FrameEvent::Complete(frame) => self.frame_received(frame)?,
                FrameEvent::ChecksumFailed => {
                    self.checksum_failed();
                    self.status = PacketStatus::ChecksumFailed;
                }
            }
        }
        Ok(self.status)
    }

    /// Like [`poll()`](Link::poll), but when the receive slot is occupied
    /// keep reading for ACK frames. Other frames received meanwhile are
    /// dropped without an ACK, so the phone sends them again.
    fn poll_acks(&mut self) -> Result<(), Error> {
        if self.status != PacketStatus::Ready {
            self.poll()?;
            if self.status != PacketStatus::Ready {
                return Ok(());
            }
        }

        while self.transport.bytes_available().context(IoSnafu)? > 0 {
            let byte = self.transport.read_byte().context(IoSnafu)?;
            match self.decoder.feed(byte) {
                FrameEvent::NeedData => {}
                FrameEvent::Complete(frame) => match frame.ack() {
                    Some(ack) => self.ack_received(ack),
                    None => warn!(
                        "F-Bus frame type {:#04x} dropped, receive slot is full",
                        frame.message_type()
                    ),
                },
                FrameEvent::ChecksumFailed => self.checksum_failed(),
            }
        }
        Ok(())
    }

    fn frame_received(&mut self, frame: Frame) -> Result<(), Error> {
        if let Some(ack) = frame.ack() {
            self.ack_received(ack);
            self.status = PacketStatus::Empty;
            return Ok(());
        }
        self.frame = Some(frame);
        self.status = PacketStatus::New;
        self.acknowledge()
    }

    fn ack_received(&mut self, ack: Ack) {
        debug!(
            "F-Bus ACK for type {:#04x} seq {}",
            ack.message_type, *ack.sequence
        );
        self.last_ack = Some(ack);
    }

    fn checksum_failed(&mut self) {
        self.checksum_failures = self.checksum_failures.wrapping_add(1);
        warn!("F-Bus frame dropped, checksum mismatch");
    }

    fn acknowledge(&mut self) -> Result<(), Error> {
        let ack = self
            .frame
            .as_ref()
            .map(|frame| encode_ack(frame.message_type(), frame.sequence_byte()));
        if let Some(ack) = ack {
            self.write_frame(&ack)?;
        }
        self.status = PacketStatus::Ready;
        Ok(())
    }

    pub const fn status(&self) -> PacketStatus {
        self.status
    }

    /// The received frame, once it is ready.
    pub fn frame(&self) -> Option<&Frame> {
        match self.status {
            PacketStatus::Ready => self.frame.as_ref(),
            _ => None,
        }
    }

    /// Take the ready frame, emptying the receive slot.
    pub fn take_frame(&mut self) -> Option<Frame> {
        if self.status != PacketStatus::Ready {
            return None;
        }
        self.status = PacketStatus::Empty;
        self.frame.take()
    }

    /// Drop the ready frame.
    pub fn clear_frame(&mut self) {
        self.take_frame();
    }

    /// The most recent ACK received from the phone.
    pub const fn last_ack(&self) -> Option<Ack> {
        self.last_ack
    }

    pub fn take_ack(&mut self) -> Option<Ack> {
        self.last_ack.take()
    }

    /// Number of frames dropped because of checksum errors.
    pub const fn checksum_failures(&self) -> u32 {
        self.checksum_failures
    }

    /// The sequence number the next transmitted frame will get.
    pub const fn outgoing_sequence(&self) -> SequenceNumber {
        self.outgoing_sequence
    }

    /// Transmit a single frame message. Returns the sequence number it was sent with.
    ///
    /// Does not wait for the phone's ACK, it is picked up by a later [`poll()`](Link::poll).
    pub fn send_frame(
        &mut self,
        message_type: MessageType,
        data: &[u8],
    ) -> Result<SequenceNumber, Error> {
        let (sequence, bytes) = self.prepare_frame(message_type, data)?;
        self.write_frame(&bytes)?;
        Ok(sequence)
    }

    /// Transmit a frame and wait for the phone to acknowledge it,
    /// retransmitting it up to [`LinkConfig::max_retries`] times.
    ///
    /// A frame already waiting in the receive slot is kept. While it is
    /// there, only ACK frames are taken from the transport.
    pub fn send_frame_confirmed(
        &mut self,
        message_type: MessageType,
        data: &[u8],
    ) -> Result<SequenceNumber, Error> {
        let expected = |sequence| Ack {
            message_type,
            sequence,
        };
        let (sequence, bytes) = self.prepare_frame(message_type, data)?;
        let attempts = self.config.max_retries + 1;

        for attempt in 1..=attempts {
            if attempt > 1 {
                warn!(
                    "F-Bus no ACK for type {:#04x}, retransmitting ({}/{})",
                    message_type, attempt, attempts
                );
            }
            self.last_ack = None;
            self.write_frame(&bytes)?;

            let deadline = Instant::now() + self.config.ack_timeout;
            loop {
                self.poll_acks()?;
                if self.last_ack == Some(expected(sequence)) {
                    self.last_ack = None;
                    return Ok(sequence);
                }
                if Instant::now() >= deadline {
                    break;
                }
                thread::sleep(self.config.poll_interval);
            }
        }

        AckTimeoutSnafu {
            message_type,
            attempts,
        }
        .fail()
    }

    /// Ask the phone for its hardware and software versions.
    pub fn request_hw_sw_info(&mut self) -> Result<SequenceNumber, Error> {
        self.send_frame(self.config.hw_sw_request_type, &HW_SW_REQUEST)
    }

    /// Send an SMS submit message. `pdu` must already be encoded.
    pub fn send_sms(&mut self, pdu: &[u8]) -> Result<SequenceNumber, Error> {
        self.send_frame(MSG_SMS, pdu)
    }

    fn prepare_frame(
        &mut self,
        message_type: MessageType,
        data: &[u8],
    ) -> Result<(SequenceNumber, FrameBytes), Error> {
        let sequence = self.outgoing_sequence;
        let bytes = encode(
            message_type,
            1,
            self.config.sequence_flags | *sequence,
            data,
        )
        .context(EncodeSnafu)?;
        self.outgoing_sequence = sequence.next();
        Ok((sequence, bytes))
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), Error> {
        trace!("F-Bus tx {:02X?}", bytes);
        self.transport.write_all(bytes).context(IoSnafu)?;
        self.transport.flush().context(IoSnafu)
    }
}
