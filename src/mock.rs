extern crate std;

use core::cell::Cell;
use core::convert::Infallible;
use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal_nb::serial::{self, ErrorKind};

use crate::hal::{Carrier, Clock, Event, Transceiver};

#[derive(Debug)]
pub struct MockError;

impl serial::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
pub struct MockTransceiver {
    pub listening: bool,
    pub sent: Vec<Vec<u8>>,
    pub inbox: VecDeque<Event>,
    /// Queue `TxComplete` (and the next scripted reply) on every transmit
    pub auto_complete: bool,
    pub fail_transmit: bool,
    /// Byte delivered whenever the inbox is empty, a line that never goes quiet
    pub noise: Option<u8>,
    /// Events handed out by `next_event`
    pub delivered: usize,
    /// One entry per transmission; `None` answers with silence
    replies: VecDeque<Option<Vec<u8>>>,
}

impl MockTransceiver {
    pub fn queue_reply(&mut self, bytes: &[u8]) {
        self.replies.push_back(Some(bytes.to_vec()));
    }

    pub fn queue_silence(&mut self) {
        self.replies.push_back(None);
    }
}

impl Transceiver for MockTransceiver {
    type Error = MockError;

    fn listen(&mut self) -> Result<(), Self::Error> {
        self.listening = true;
        Ok(())
    }

    fn start_transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        if self.fail_transmit {
            return Err(MockError);
        }
        self.sent.push(frame.to_vec());
        if self.auto_complete {
            self.inbox.push_back(Event::TxComplete);
            if let Some(Some(reply)) = self.replies.pop_front() {
                self.inbox.extend(reply.into_iter().map(Event::Received));
            }
        }
        Ok(())
    }

    fn next_event(&mut self) -> Option<Event> {
        let event = self
            .inbox
            .pop_front()
            .or(self.noise.map(Event::Received))?;
        self.delivered += 1;
        Some(event)
    }
}

#[derive(Debug, Default)]
pub struct MockCarrier {
    pub on: bool,
    pub duty_percent: u8,
    pub starts: usize,
}

impl Carrier for MockCarrier {
    type Error = Infallible;

    fn configure(&mut self, duty_percent: u8) -> Result<(), Self::Error> {
        self.duty_percent = duty_percent;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.on = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.on = false;
        Ok(())
    }
}

/// Manually advanced clock, optionally moving `step` ms on every read
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u32>,
    step: u32,
}

impl MockClock {
    pub fn stepping(step: u32) -> MockClock {
        MockClock {
            now: Cell::new(0),
            step,
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}
