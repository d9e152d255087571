//! Byte values with a fixed meaning on the F-Bus wire.

/// Frame id used on the serial cable.
pub const FRAME_ID_CABLE: u8 = 0x1E;
/// Frame id used on the infrared link. Frames carrying it are not accepted.
pub const FRAME_ID_IRDA: u8 = 0x1C;

/// Device id of the phone.
pub const DEVICE_PHONE: u8 = 0x00;
/// Device id of the host (PC or microcontroller).
pub const DEVICE_HOST: u8 = 0x0C;

/// Acknowledge frame.
pub const MSG_ACK: u8 = 0x7F;
/// Request hardware and software version information.
pub const MSG_REQ_HWSW: u8 = 0xD1;
/// Hardware and software version information, sent in reply to [`MSG_REQ_HWSW`].
pub const MSG_HWSW_REPLY: u8 = 0xD2;
/// SMS related functions.
pub const MSG_SMS: u8 = 0x02;

/// Data of the HW/SW request: the `00 01 00` command header, then the query itself.
pub const HW_SW_REQUEST: [u8; 5] = [0x00, 0x01, 0x00, 0x03, 0x00];

/// Synchronization byte sent repeatedly to wake the phone's F-Bus port.
pub const WAKEUP_BYTE: u8 = 0x55;
pub const DEFAULT_WAKEUP_COUNT: usize = 128;

/// Length of the header: frame id, dest, src, message type and two length bytes.
pub const HEADER_LEN: usize = 6;
/// The length field counts data plus the frames-to-go and sequence bytes.
pub const CONTROL_LEN: usize = 2;
/// Largest data block representable with a single length byte.
pub const MAX_DATA_LEN: usize = 0xFF - CONTROL_LEN;
/// header + data + control + pad + two checksum bytes
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_DATA_LEN + CONTROL_LEN + 1 + 2;
/// An ACK frame is always ten bytes long.
pub const ACK_FRAME_LEN: usize = HEADER_LEN + CONTROL_LEN + 2;
