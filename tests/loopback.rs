use std::{cell::Cell, cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc};

use carrier_link::{Clock, Link, LinkConfig, NoCarrier, SerialTransceiver, Status};
use embedded_hal_nb::serial::{ErrorType, Read, Write};

type Line = Rc<RefCell<VecDeque<u8>>>;

#[derive(Debug)]
struct WirePort {
    tx: Line,
    rx: Line,
    /// xor applied to every outgoing byte at this index
    corrupt: Option<(usize, u8)>,
    written: usize,
}

fn wire() -> (WirePort, WirePort) {
    let ab = Line::default();
    let ba = Line::default();
    let port = |tx: &Line, rx: &Line| WirePort {
        tx: tx.clone(),
        rx: rx.clone(),
        corrupt: None,
        written: 0,
    };
    (port(&ab, &ba), port(&ba, &ab))
}

impl ErrorType for WirePort {
    type Error = Infallible;
}

impl Write for WirePort {
    fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
        let c = match self.corrupt {
            Some((index, mask)) if index == self.written => c ^ mask,
            _ => c,
        };
        self.written += 1;
        self.tx.borrow_mut().push_back(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl Read for WirePort {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
    }
}

#[derive(Debug, Default)]
struct TickClock(Cell<u32>);

impl TickClock {
    fn tick(&self) {
        self.0.set(self.0.get() + 1);
    }
}

impl Clock for TickClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

#[test]
fn request_and_reply_over_the_wire() {
    let (a, b) = wire();
    let clock = TickClock::default();
    let mut reply = [0u8; 16];
    let mut request = [0u8; 16];
    let mut requester = Link::new(SerialTransceiver::new(a), NoCarrier, &clock, LinkConfig::default());
    let mut responder = Link::new(SerialTransceiver::new(b), NoCarrier, &clock, LinkConfig::default());

    responder.start_receive(&mut request).unwrap();
    requester
        .start_send_and_receive(b"ping", Some(&mut reply), 3)
        .unwrap();

    let mut answered = false;
    for _ in 0..100 {
        requester.poll();
        responder.poll();
        if !answered && responder.status() == Status::Ok {
            assert_eq!(responder.received(), Some(&b"ping"[..]));
            responder.start_send(b"pong").unwrap();
            answered = true;
        }
        if requester.status() != Status::Busy {
            break;
        }
        clock.tick();
    }

    assert_eq!(requester.status(), Status::Ok);
    assert_eq!(requester.received(), Some(&b"pong"[..]));
    assert_eq!(requester.retries_remaining(), 3);
    assert_eq!(responder.status(), Status::Ok);
}

#[test]
fn silent_peer_exhausts_retransmissions() {
    let (a, b) = wire();
    let peer_line = b.rx.clone();
    let clock = TickClock::default();
    let mut reply = [0u8; 16];
    let mut requester = Link::new(SerialTransceiver::new(a), NoCarrier, &clock, LinkConfig::default());

    requester
        .start_send_and_receive(b"anyone?", Some(&mut reply), 2)
        .unwrap();
    for _ in 0..200 {
        requester.poll();
        if requester.status() != Status::Busy {
            break;
        }
        clock.tick();
    }

    assert_eq!(requester.status(), Status::Timeout);
    // first send plus two retransmissions, byte for byte identical
    let frame_len = 3 + b"anyone?".len();
    let sent: Vec<u8> = peer_line.borrow().iter().copied().collect();
    assert_eq!(sent.len(), 3 * frame_len);
    assert_eq!(sent[..frame_len], sent[frame_len..2 * frame_len]);
    assert_eq!(sent[..frame_len], sent[2 * frame_len..]);
}

#[test]
fn corrupted_payload_is_a_crc_error() {
    let (mut a, b) = wire();
    // flip a bit in the first payload byte
    a.corrupt = Some((3, 0x01));
    let clock = TickClock::default();
    let mut request = [0u8; 16];
    let mut sender = Link::new(SerialTransceiver::new(a), NoCarrier, &clock, LinkConfig::default());
    let mut receiver = Link::new(SerialTransceiver::new(b), NoCarrier, &clock, LinkConfig::default());

    receiver.start_receive(&mut request).unwrap();
    sender.start_send(b"data").unwrap();
    for _ in 0..10 {
        sender.poll();
        receiver.poll();
    }

    assert_eq!(sender.status(), Status::Ok);
    assert_eq!(receiver.status(), Status::CrcError);
    assert_eq!(receiver.received_len(), Some(4));
    assert_eq!(receiver.received(), Some(&b"eata"[..]));
}

#[test]
fn oversized_reply_is_a_protocol_error() {
    let (a, b) = wire();
    let clock = TickClock::default();
    let mut small = [0u8; 2];
    let mut sender = Link::new(SerialTransceiver::new(a), NoCarrier, &clock, LinkConfig::default());
    let mut receiver = Link::new(SerialTransceiver::new(b), NoCarrier, &clock, LinkConfig::default());

    receiver.start_receive(&mut small).unwrap();
    sender.start_send(b"too long").unwrap();
    for _ in 0..10 {
        sender.poll();
        receiver.poll();
    }

    assert_eq!(receiver.status(), Status::Error);
    assert_eq!(receiver.received(), None);
}
