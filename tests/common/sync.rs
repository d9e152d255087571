use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use fbus_proto::Transport;

type LineT = Mutex<VecDeque<u8>>;

/// A serial cable between the host and a phone, usable from two threads.
#[derive(Default)]
pub struct Cable {
    to_host: LineT,
    to_phone: LineT,
    phone_data_available: Condvar,
    eof: AtomicBool,
}

impl Cable {
    pub fn new() -> Arc<Cable> {
        Default::default()
    }

    pub fn disconnect(&self) {
        self.eof.store(true, SeqCst);
        self.phone_data_available.notify_all();
    }

    pub fn is_disconnected(&self) -> bool {
        self.eof.load(SeqCst)
    }

    pub fn host_end(self: &Arc<Self>) -> HostEnd {
        HostEnd {
            cable: Arc::clone(self),
            do_write_error: false,
        }
    }

    pub fn phone_end(self: &Arc<Self>) -> PhoneEnd {
        PhoneEnd {
            cable: Arc::clone(self),
            timeout: Duration::from_millis(100),
        }
    }
}

/// Non-blocking host side of the cable.
pub struct HostEnd {
    cable: Arc<Cable>,
    pub do_write_error: bool,
}

impl Transport for HostEnd {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        Ok(self.cable.to_host.lock().expect("Read mutex is poisoned").len())
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        self.cable
            .to_host
            .lock()
            .expect("Read mutex is poisoned")
            .pop_front()
            .ok_or_else(|| Error::new(ErrorKind::WouldBlock, "IO read error: would block"))
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.do_write_error {
            self.do_write_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO write error"));
        }
        self.cable
            .to_phone
            .lock()
            .expect("Write mutex is poisoned")
            .extend(data.iter().copied());
        self.cable.phone_data_available.notify_all();
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Blocking phone side of the cable.
pub struct PhoneEnd {
    cable: Arc<Cable>,
    pub timeout: Duration,
}

impl PhoneEnd {
    /// Wait for the next byte from the host. Returns `Ok(None)` once the cable is disconnected.
    pub fn read(&mut self) -> std::io::Result<Option<u8>> {
        let rx = self.cable.to_phone.lock().expect("Read mutex is poisoned");
        let mut rx = self
            .cable
            .phone_data_available
            .wait_timeout_while(rx, self.timeout, |rx| {
                rx.is_empty() && !self.cable.eof.load(SeqCst)
            })
            .expect("Mutex lock failed")
            .0;
        if let Some(byte) = rx.pop_front() {
            Ok(Some(byte))
        } else if self.cable.eof.load(SeqCst) {
            Ok(None)
        } else {
            Err(Error::new(ErrorKind::TimedOut, "IO read timeout"))
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        self.cable
            .to_host
            .lock()
            .expect("Write mutex is poisoned")
            .extend(data.iter().copied());
    }
}
