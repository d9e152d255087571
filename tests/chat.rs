mod common;

use std::thread;
use std::time::{Duration, Instant};

use fbus_proto::consts::{HW_SW_REQUEST, MSG_ACK, MSG_HWSW_REPLY, MSG_REQ_HWSW, MSG_SMS};
use fbus_proto::encoder::{encode_ack_routed, encode_routed};
use fbus_proto::link::Error;
use fbus_proto::{Decoder, FrameEvent, Link, LinkConfig, PacketStatus, Route, VersionInfo};

use common::sync::{Cable, HostEnd, PhoneEnd};

const VERSION_REPLY: &[u8] = b"V 05.22\n12-08-99\nNSE-3";

/// Acknowledges every frame from the host and answers HW/SW requests.
/// Frames of type `ignore_type` get no ACK, to exercise retransmission.
fn phone_main_loop(mut serial: PhoneEnd, ignore_type: Option<u8>) -> Vec<u8> {
    let mut decoder = Decoder::with_route(Route::TO_PHONE);
    let mut received = Vec::new();
    let mut sequence = 0u8;

    while let Ok(Some(byte)) = serial.read() {
        let frame = match decoder.feed(byte) {
            FrameEvent::Complete(frame) => frame,
            _ => continue,
        };
        received.push(frame.message_type());
        if frame.is_ack() || Some(frame.message_type()) == ignore_type {
            continue;
        }
        let route = frame.route().reverse();
        serial.write(&encode_ack_routed(
            route,
            frame.message_type(),
            frame.sequence_byte(),
        ));
        if frame.message_type() == MSG_REQ_HWSW {
            let reply = encode_routed(route, MSG_HWSW_REPLY, 1, 0x40 | sequence, VERSION_REPLY)
                .expect("Reply fits in a frame");
            sequence = (sequence + 1) & 0x07;
            serial.write(&reply);
        }
    }
    received
}

fn host_main_loop(serial: HostEnd) -> Result<Vec<u8>, Error> {
    let config = LinkConfig {
        wakeup_count: 55,
        ack_timeout: Duration::from_millis(50),
        max_retries: 1,
        ..LinkConfig::default()
    };
    let mut link = Link::with_config(serial, config);
    link.initialize()?;

    link.send_frame_confirmed(MSG_REQ_HWSW, &HW_SW_REQUEST)?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while link.poll()? != PacketStatus::Ready {
        assert!(Instant::now() < deadline, "No reply from phone");
        thread::sleep(Duration::from_millis(1));
    }
    let frame = link.take_frame().expect("Frame is ready");
    let info = VersionInfo::from_frame(&frame).expect("Valid version reply");
    assert_eq!(info.software, "05.22");
    assert_eq!(info.hardware, "NSE-3");

    // unacknowledged frames are sent max_retries + 1 times
    let err = link.send_frame_confirmed(MSG_SMS, b"pdu").unwrap_err();
    assert!(matches!(err, Error::AckTimeout { attempts: 2, .. }));

    Ok(frame.data().to_vec())
}

#[test]
fn chat() {
    let _ = env_logger::builder().is_test(true).try_init();

    let cable = Cable::new();
    let host_if = cable.host_end();
    let mut phone_if = cable.phone_end();
    phone_if.timeout = Duration::from_secs(10);

    let phone = thread::spawn(move || phone_main_loop(phone_if, Some(MSG_SMS)));
    let host = thread::spawn(move || host_main_loop(host_if));

    let reply = host
        .join()
        .expect("Join failed")
        .expect("Host returned an error");
    assert_eq!(reply, VERSION_REPLY);

    cable.disconnect();
    let received = phone.join().expect("Phone panicked");
    // request, ACK for the reply, then the SMS twice
    assert_eq!(
        received,
        vec![MSG_REQ_HWSW, MSG_ACK, MSG_SMS, MSG_SMS]
    );
}
