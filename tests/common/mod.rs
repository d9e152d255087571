#![allow(dead_code)]

pub mod sync;

use std::cell::RefCell;
use std::io::{Error, ErrorKind};
use std::rc::Rc;

use fbus_proto::Transport;

/// Serial line with preloaded receive data, capturing everything written to it.
pub struct SerialInterface {
    rx: Vec<u8>,
    rx_pos: usize,
    pub tx: Vec<u8>,
    pub flushes: usize,
    do_read_error: bool,
    do_write_error: bool,
}

pub struct SerialIOPlane(Rc<RefCell<SerialInterface>>);

impl SerialIOPlane {
    pub fn new(serial_if: &Rc<RefCell<SerialInterface>>) -> SerialIOPlane {
        SerialIOPlane(serial_if.clone())
    }
}

impl SerialInterface {
    pub fn new(rx: &[u8]) -> Rc<RefCell<SerialInterface>> {
        Rc::new(RefCell::new(SerialInterface {
            rx: rx.to_vec(),
            rx_pos: 0,
            tx: Vec::new(),
            flushes: 0,
            do_read_error: false,
            do_write_error: false,
        }))
    }

    /// Make more data available for reading.
    pub fn receive(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }
}

impl Transport for SerialIOPlane {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        let inner = self.0.borrow();
        Ok(inner.rx.len() - inner.rx_pos)
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut inner = self.0.borrow_mut();
        if inner.do_read_error {
            inner.do_read_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO read error"));
        }
        let pos = inner.rx_pos;
        let byte = *inner
            .rx
            .get(pos)
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "read past end of data"))?;
        inner.rx_pos += 1;
        Ok(byte)
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        let mut inner = self.0.borrow_mut();
        if inner.do_write_error {
            inner.do_write_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "IO write error"))
        } else {
            inner.tx.extend_from_slice(data);
            Ok(())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.borrow_mut().flushes += 1;
        Ok(())
    }
}
