use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serialport::{DataBits, Parity, SerialPort, StopBits};

use fbus_proto::consts::HW_SW_REQUEST;
use fbus_proto::{Link, PacketStatus, Transport, VersionInfo};

/// F-Bus runs at 115200 baud, 8N1.
struct Port(Box<dyn SerialPort>);

impl Transport for Port {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        Ok(self.0.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut buf = [0];
        self.0.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        Write::write_all(&mut self.0, data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Write::flush(&mut self.0)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let serial = serialport::new(&port, 115_200)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(100))
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;

    let mut link = Link::new(Port(serial));
    link.initialize()?;
    // give the phone time to settle after the wake-up sequence
    std::thread::sleep(Duration::from_millis(100));

    let opcode = link.config().hw_sw_request_type;
    link.send_frame_confirmed(opcode, &HW_SW_REQUEST)
        .context("Phone did not acknowledge the version request")?;

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if link.poll()? == PacketStatus::Ready {
            break;
        }
        if Instant::now() > deadline {
            bail!("No reply from the phone");
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    let frame = link.take_frame().context("Frame disappeared")?;
    log::debug!("Reply {:?}", frame);
    let info = VersionInfo::from_frame(&frame).context("Unexpected reply")?;
    println!("Software: {}", info.software);
    println!("Date:     {}", info.date);
    println!("Hardware: {}", info.hardware);
    Ok(())
}
