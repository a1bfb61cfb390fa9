use core::fmt;

use embedded_hal_nb::serial::{Error, ErrorKind, Read, Write};
use heapless::Deque;

use crate::frame::MAX_FRAME_LEN;
use crate::hal::{Event, Transceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError<E> {
    Serial(E),
    /// Frame does not fit the transmit queue, nothing was queued
    FrameTooLong { len: usize },
}

impl<E: Error> Error for SerialError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            SerialError::Serial(e) => e.kind(),
            SerialError::FrameTooLong { .. } => ErrorKind::Other,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SerialError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialError::Serial(e) => write!(f, "serial port error: {e:?}"),
            SerialError::FrameTooLong { len } => {
                write!(f, "frame of {len} bytes exceeds {MAX_FRAME_LEN}")
            }
        }
    }
}

/// Polled [`Transceiver`] over an `embedded-hal-nb` serial port.
///
/// Queued frame bytes are pushed out with non-blocking writes whenever the
/// link polls; a successful flush after the last byte is the transmit
/// completion. Otherwise one byte is read per event.
#[derive(Debug)]
pub struct SerialTransceiver<S> {
    serial: S,
    tx: Deque<u8, MAX_FRAME_LEN>,
    transmitting: bool,
}

impl<S: Read + Write> SerialTransceiver<S> {
    pub fn new(serial: S) -> SerialTransceiver<S> {
        SerialTransceiver {
            serial,
            tx: Deque::new(),
            transmitting: false,
        }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Bytes of the current frame not yet accepted by the port
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn release(self) -> S {
        self.serial
    }

    fn pump(&mut self) -> Option<Event> {
        while let Some(&byte) = self.tx.front() {
            match self.serial.write(byte) {
                Ok(()) => {
                    self.tx.pop_front();
                }
                Err(nb::Error::WouldBlock) => return None,
                Err(nb::Error::Other(e)) => return Some(self.abort(e.kind())),
            }
        }
        match self.serial.flush() {
            Ok(()) => {
                self.transmitting = false;
                Some(Event::TxComplete)
            }
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(e)) => Some(self.abort(e.kind())),
        }
    }

    fn abort(&mut self, kind: ErrorKind) -> Event {
        self.tx.clear();
        self.transmitting = false;
        Event::LineFault(kind)
    }
}

impl<S: Read + Write> Transceiver for SerialTransceiver<S> {
    type Error = SerialError<S::Error>;

    fn listen(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start_transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let len = frame.len();
        if len > MAX_FRAME_LEN {
            return Err(SerialError::FrameTooLong { len });
        }
        self.tx.clear();
        for &b in frame {
            self.tx
                .push_back(b)
                .map_err(|_| SerialError::FrameTooLong { len })?;
        }
        self.transmitting = true;
        Ok(())
    }

    fn next_event(&mut self) -> Option<Event> {
        if self.transmitting {
            if let Some(event) = self.pump() {
                return Some(event);
            }
        }
        match self.serial.read() {
            Ok(byte) => Some(Event::Received(byte)),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(e)) => Some(Event::LineFault(e.kind())),
        }
    }
}
