use std::error::Error;
use std::io::{self, Read};

use fbus_proto::{Decoder, FrameEvent, Route, VersionInfo};

/// Decode a raw F-Bus capture read from stdin and print every frame found.
///
/// Pass `--to-phone` to decode the host to phone direction.
fn dump_main_loop() -> Result<(), Box<dyn Error>> {
    let route = match std::env::args().nth(1).as_deref() {
        Some("--to-phone") => Route::TO_PHONE,
        None | Some("--to-host") => Route::TO_HOST,
        Some(arg) => return Err(format!("Unknown argument {}", arg).into()),
    };
    let mut decoder = Decoder::with_route(route);
    let mut frames = 0;
    let mut failures = 0;

    let mut buf = [0; 256];
    loop {
        let len = io::stdin().read(&mut buf)?;
        if len == 0 {
            break;
        }
        for byte in &buf[..len] {
            match decoder.feed(*byte) {
                FrameEvent::Complete(frame) => {
                    frames += 1;
                    match frame.ack() {
                        Some(ack) => println!(
                            "ACK type {:02X} seq {}",
                            ack.message_type, *ack.sequence
                        ),
                        None => println!("{:?}", frame),
                    }
                    if let Ok(info) = VersionInfo::from_frame(&frame) {
                        println!(
                            "   version {} date {} hardware {}",
                            info.software, info.date, info.hardware
                        );
                    }
                }
                FrameEvent::ChecksumFailed => {
                    failures += 1;
                    println!("-- checksum mismatch, frame dropped");
                }
                FrameEvent::NeedData => {}
            }
        }
    }
    if !decoder.is_idle() {
        println!("-- capture ends inside a frame");
    }
    println!("{} frames, {} checksum failures", frames, failures);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    dump_main_loop()
}
