//! Typed view of the phone's answer to a hardware/software version request.

use core::str;

use snafu::{OptionExt, ResultExt, Snafu};

use crate::consts::MSG_HWSW_REPLY;
use crate::types::{Frame, MessageType};

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The frame is not a version reply.
    #[snafu(display("Message type {:#04x} is not a version reply", message_type))]
    NotVersionReply { message_type: MessageType },
    /// The reply doesn't contain the version text.
    #[snafu(display("Version reply is missing the {} field", field))]
    MissingField { field: &'static str },
    /// A version field isn't valid text.
    #[snafu(display("Version reply field {} is not valid UTF-8", field))]
    InvalidText {
        field: &'static str,
        source: str::Utf8Error,
    },
}

/// Version information reported by the phone, borrowed from the reply frame.
///
/// The reply text starts with `V`, followed by newline separated fields:
///
/// ```text
/// V 05.22\n12-08-99\nNSE-3
/// ```
///
/// ## Example
/// ```
/// use fbus_proto::encoder::encode_routed;
/// use fbus_proto::{decode, Route, VersionInfo};
///
/// let bytes = encode_routed(Route::TO_HOST, 0xD2, 1, 0x40, b"\x01\x00\x03V 05.22\n12-08-99\nNSE-3").unwrap();
/// let (frame, _) = decode(Route::TO_HOST, &bytes).unwrap();
/// let info = VersionInfo::from_frame(&frame).unwrap();
/// assert_eq!(info.software, "05.22");
/// assert_eq!(info.date, "12-08-99");
/// assert_eq!(info.hardware, "NSE-3");
/// ```
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct VersionInfo<'a> {
    /// Software version, e.g. `05.22`.
    pub software: &'a str,
    /// Software date code, e.g. `12-08-99`.
    pub date: &'a str,
    /// Hardware type, e.g. `NSE-3`.
    pub hardware: &'a str,
}

impl<'a> VersionInfo<'a> {
    /// Parse the data of a version reply frame.
    /// # Errors
    /// Returns [`Error::NotVersionReply`] for any other message type.
    pub fn from_frame(frame: &'a Frame) -> Result<Self, Error> {
        let message_type = frame.message_type();
        if message_type != MSG_HWSW_REPLY {
            return NotVersionReplySnafu { message_type }.fail();
        }
        Self::from_data(frame.data())
    }

    /// Parse the version text out of the reply data. Bytes before the
    /// leading `V` are the command header and are skipped.
    pub fn from_data(data: &'a [u8]) -> Result<Self, Error> {
        let start = data
            .iter()
            .position(|b| *b == b'V')
            .context(MissingFieldSnafu { field: "software" })?;
        let mut lines = data[start + 1..].split(|b| *b == b'\n');

        let software = field(lines.next(), "software")?;
        let date = field(lines.next(), "date")?;
        let hardware = field(lines.next(), "hardware")?;
        Ok(Self {
            software,
            date,
            hardware,
        })
    }
}

fn field<'a>(line: Option<&'a [u8]>, name: &'static str) -> Result<&'a str, Error> {
    let line = line.context(MissingFieldSnafu { field: name })?;
    let text = str::from_utf8(line)
        .context(InvalidTextSnafu { field: name })?
        .trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        return MissingFieldSnafu { field: name }.fail();
    }
    Ok(text)
}
