//! Serialization of outgoing frames.

use crate::consts::{CONTROL_LEN, FRAME_ID_CABLE, MSG_ACK};
use crate::types::{Error, Frame, FrameBytes, FrameData, MessageType, Route};
use crate::Checksum;

/// Encode a frame sent from the host to the phone.
///
/// `sequence` is transmitted as is, flag bits included.
///
/// # Example
/// ```
/// let bytes = fbus_proto::encode(0xD1, 0x01, 0x60, &[0x00, 0x01, 0x00, 0x03, 0x00]).unwrap();
/// assert_eq!(
///     bytes.as_slice(),
///     &[0x1E, 0x00, 0x0C, 0xD1, 0x00, 0x07, 0x00, 0x01, 0x00, 0x03, 0x00, 0x01, 0x60, 0x00, 0x72, 0xD5]
/// );
/// ```
/// # Errors
/// Returns [`Error::PayloadTooLong`] if `data` doesn't fit in one frame.
pub fn encode(
    message_type: MessageType,
    frames_to_go: u8,
    sequence: u8,
    data: &[u8],
) -> Result<FrameBytes, Error> {
    encode_routed(Route::TO_PHONE, message_type, frames_to_go, sequence, data)
}

/// Like [`encode()`], with an explicit route.
pub fn encode_routed(
    route: Route,
    message_type: MessageType,
    frames_to_go: u8,
    sequence: u8,
    data: &[u8],
) -> Result<FrameBytes, Error> {
    let frame = Frame::new(route, message_type, frames_to_go, sequence, data)?;
    Ok(encode_frame(&frame))
}

/// Encode an acknowledge frame from the host to the phone.
pub fn encode_ack(acked_message_type: MessageType, acked_sequence: u8) -> FrameBytes {
    encode_ack_routed(Route::TO_PHONE, acked_message_type, acked_sequence)
}

/// Like [`encode_ack()`], with an explicit route.
pub fn encode_ack_routed(
    route: Route,
    acked_message_type: MessageType,
    acked_sequence: u8,
) -> FrameBytes {
    encode_frame(&Frame::from_parts(
        route,
        MSG_ACK,
        acked_message_type,
        acked_sequence & 0x07,
        FrameData::new(),
    ))
}

pub(crate) fn encode_frame(frame: &Frame) -> FrameBytes {
    let data = frame.data();
    let route = frame.route();
    // data is at most MAX_DATA_LEN long, so the length fits in one byte
    let length = (data.len() + CONTROL_LEN) as u8;

    let mut buf = FrameBytes::new();
    buf.push(FRAME_ID_CABLE);
    buf.push(route.dest);
    buf.push(route.src);
    buf.push(frame.message_type());
    buf.push(0x00);
    buf.push(length);
    buf.extend(data.iter().copied());
    buf.push(frame.frames_to_go());
    buf.push(frame.sequence_byte());
    if data.len() % 2 == 1 {
        buf.push(0x00);
    }
    let checksum = Checksum::of(&buf);
    buf.extend(checksum.to_bytes().iter().copied());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ACK_FRAME_LEN, MAX_DATA_LEN, MSG_REQ_HWSW, MSG_SMS};

    #[test]
    fn test_hwsw_request_capture() {
        let bytes = encode(MSG_REQ_HWSW, 0x01, 0x60, &[0x00, 0x01, 0x00, 0x03, 0x00]).unwrap();
        assert_eq!(
            bytes.as_slice(),
            &[
                0x1E, 0x00, 0x0C, 0xD1, 0x00, 0x07, 0x00, 0x01, 0x00, 0x03, 0x00, 0x01, 0x60, 0x00,
                0x72, 0xD5
            ]
        );
    }

    #[test]
    fn test_ack() {
        let ack = encode_ack(MSG_REQ_HWSW, 0x07);
        assert_eq!(ack.len(), ACK_FRAME_LEN);
        // 1E^0C^00^D1 and 00^7F^02^07
        assert_eq!(
            ack.as_slice(),
            &[0x1E, 0x00, 0x0C, 0x7F, 0x00, 0x02, 0xD1, 0x07, 0xC3, 0x7A]
        );

        // flag bits are stripped from the acknowledged sequence
        assert_eq!(encode_ack(MSG_REQ_HWSW, 0x47), ack);
    }

    #[test]
    fn test_padding() {
        for len in 0..=MAX_DATA_LEN {
            let data = [0xA5; MAX_DATA_LEN];
            let bytes = encode(MSG_SMS, 1, 0x40, &data[..len]).unwrap();
            let covered = bytes.len() - 2;
            assert_eq!(covered % 2, 0, "odd frame length for {} data bytes", len);
            assert_eq!(bytes[5] as usize, len + 2);
            assert_eq!(
                Checksum::of(&bytes[..covered]).to_bytes(),
                [bytes[covered], bytes[covered + 1]]
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let a = encode(MSG_SMS, 1, 0x42, b"hello").unwrap();
        let b = encode(MSG_SMS, 1, 0x42, b"hello").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_long() {
        let data = [0; MAX_DATA_LEN + 1];
        assert!(matches!(
            encode(MSG_SMS, 1, 0, &data),
            Err(Error::PayloadTooLong { .. })
        ));
    }

    #[test]
    fn test_routed() {
        let bytes = encode_routed(Route::TO_HOST, 0xD2, 1, 0x41, &[0x01, 0x02]).unwrap();
        assert_eq!(&bytes[..4], &[0x1E, 0x0C, 0x00, 0xD2]);
    }
}
