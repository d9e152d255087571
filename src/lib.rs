//! Sans-io implementation of the Nokia F-Bus serial protocol.
//!
//! The crate is split in two layers:
//!
//! * the frame codec ([`encoder`], [`Decoder`], [`decode()`]) which turns frames
//!   into bytes and back, without doing any I/O;
//! * the [`Link`](link::Link) driver (requires the `std` feature), which owns a
//!   [`Transport`](link::Transport), keeps the sequence number state and sends
//!   the acknowledge frames the phone expects.
//!
//! [`VersionInfo`] decodes the phone's answer to a version request.
//!
//! Every F-Bus frame looks like this on the wire:
//!
//! ```text
//! 1E dest src type 00 len <data..> frames_to_go seq [00] chk_odd chk_even
//! ```
//!
//! A pad byte is inserted when the data block has odd length, so that the
//! two checksum bytes always start at an even offset.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod consts;
pub mod decoder;
pub mod encoder;
#[cfg(feature = "std")]
pub mod link;
mod nom_parser;
pub mod types;
pub mod version;

pub use decoder::{Decoder, FrameEvent};
pub use encoder::{encode, encode_ack};
pub use nom_parser::{decode, DecodeError};
pub use types::{seq, Ack, Frame, FrameBytes, MessageType, Route, SequenceNumber};
pub use version::VersionInfo;

#[cfg(feature = "std")]
pub use link::{Link, LinkConfig, PacketStatus, Transport};

/// Running odd/even XOR checksum over a frame.
///
/// Bytes at even offsets (0, 2, 4, ...) are folded into the "odd" checksum and
/// bytes at odd offsets into the "even" checksum. The inverted naming matches
/// the protocol documentation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Checksum {
    odd: u8,
    even: u8,
    position: usize,
}

impl Checksum {
    pub const fn new() -> Self {
        Self {
            odd: 0,
            even: 0,
            position: 0,
        }
    }

    /// Checksum over a complete slice, starting at offset 0.
    pub fn of(data: &[u8]) -> Self {
        let mut checksum = Self::new();
        checksum.extend(data);
        checksum
    }

    pub fn push(&mut self, byte: u8) {
        if self.position % 2 == 0 {
            self.odd ^= byte;
        } else {
            self.even ^= byte;
        }
        self.position += 1;
    }

    pub fn extend(&mut self, data: &[u8]) {
        for byte in data {
            self.push(*byte);
        }
    }

    /// XOR of the bytes at even offsets.
    pub const fn odd(&self) -> u8 {
        self.odd
    }

    /// XOR of the bytes at odd offsets.
    pub const fn even(&self) -> u8 {
        self.even
    }

    /// The two checksum bytes, in transmission order.
    pub const fn to_bytes(&self) -> [u8; 2] {
        [self.odd, self.even]
    }

    /// Number of bytes covered so far.
    pub const fn len(&self) -> usize {
        self.position
    }

    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }
}
