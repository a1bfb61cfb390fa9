use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc, time::Instant};

use carrier_link::{
    Clock, DEFAULT_RETRANSMISSIONS, Link, LinkConfig, NoCarrier, SerialTransceiver, Status,
};
use embedded_hal_nb::serial::{ErrorType, Read, Write};

/// Requester and responder talking over an in-memory wire
fn main() {
    let (a, b) = wire();
    let clock = WallClock(Instant::now());

    let mut reply = [0u8; 64];
    let mut request = [0u8; 64];
    let mut requester = Link::new(SerialTransceiver::new(a), NoCarrier, &clock, LinkConfig::default());
    let mut responder = Link::new(SerialTransceiver::new(b), NoCarrier, &clock, LinkConfig::default());

    responder
        .start_receive(&mut request)
        .expect("responder is idle");
    requester
        .start_send_and_receive(b"ping", Some(&mut reply), DEFAULT_RETRANSMISSIONS)
        .expect("requester is idle");

    let mut answered = false;
    while requester.status() == Status::Busy {
        requester.poll();
        responder.poll();

        if !answered && responder.status() != Status::Busy {
            answered = true;
            match responder.received() {
                Some(req) if responder.status() == Status::Ok => {
                    println!("responder got {:?}", String::from_utf8_lossy(req));
                    if let Err(e) = responder.start_send(b"pong") {
                        println!("responder could not reply: {e}");
                    }
                }
                _ => println!("responder gave up: {:?}", responder.status()),
            }
        }
    }

    match (requester.status(), requester.received()) {
        (Status::Ok, Some(rep)) => println!("requester got {:?}", String::from_utf8_lossy(rep)),
        (status, _) => println!("requester failed: {status:?}"),
    }
}

struct WallClock(Instant);

impl Clock for WallClock {
    fn now_ms(&self) -> u32 {
        self.0.elapsed().as_millis() as u32
    }
}

type Line = Rc<RefCell<VecDeque<u8>>>;

/// One end of a full duplex in-memory line
#[derive(Debug)]
struct WirePort {
    tx: Line,
    rx: Line,
}

fn wire() -> (WirePort, WirePort) {
    let ab = Line::default();
    let ba = Line::default();
    (
        WirePort {
            tx: ab.clone(),
            rx: ba.clone(),
        },
        WirePort { tx: ba, rx: ab },
    )
}

impl ErrorType for WirePort {
    type Error = Infallible;
}

impl Write for WirePort {
    fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
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
