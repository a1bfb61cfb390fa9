use embedded_hal_nb::serial::{Error as _, ErrorKind};
use log::{debug, trace, warn};

use crate::Encode;
use crate::config::LinkConfig;
use crate::frame::{DecodeError, Frame, FrameDecoder, MAX_FRAME_LEN, Progress, RxBuffer};
use crate::hal::{Carrier, Clock, Event, Transceiver};
use crate::retry::RetryPolicy;

/// Events handled by one `poll`: a transmit completion plus a whole frame.
/// Anything beyond waits for the next call.
pub const MAX_EVENTS_PER_POLL: usize = MAX_FRAME_LEN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Transmitting,
    Receiving,
    /// Frame fully received, CRC check deferred to the next `poll`
    ReceivedAwaitingCrc,
}

/// Outcome of the most recent operation.
///
/// `Busy` is never latched, it is reported while the phase is not `Idle`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    Busy = 1,
    CrcError = 2,
    Error = 3,
    Timeout = 4,
}

/// Half-duplex request/response link over a carrier keyed transceiver.
///
/// The receive buffer of an operation is borrowed for `'a` and handed back
/// with [`Link::release_buffer`]. Hardware completions reach the link either
/// through [`Link::on_event`] or through the transceiver's event queue, which
/// [`Link::poll`] drains before it checks deadlines and CRCs.
#[derive(Debug)]
pub struct Link<'a, T, C, K> {
    transceiver: T,
    carrier: C,
    clock: K,
    pub(crate) phase: Phase,
    tx_frame: [u8; MAX_FRAME_LEN],
    tx_len: usize,
    pub(crate) rx: Option<FrameDecoder<'a>>,
    retry: RetryPolicy,
    pub(crate) status: Status,
}

impl<'a, T, C, K> Link<'a, T, C, K>
where
    T: Transceiver,
    C: Carrier,
    K: Clock,
{
    pub fn new(transceiver: T, carrier: C, clock: K, config: LinkConfig) -> Link<'a, T, C, K> {
        let mut link = Link {
            transceiver,
            carrier,
            clock,
            phase: Phase::Idle,
            tx_frame: [0; MAX_FRAME_LEN],
            tx_len: 0,
            rx: None,
            retry: RetryPolicy::new(config.byte_timeout_ms),
            status: Status::Ok,
        };
        if let Err(e) = link.carrier.configure(config.carrier_duty_percent) {
            warn!("carrier configure failed: {e:?}");
        }
        if let Err(e) = link.transceiver.listen() {
            warn!("transceiver listen failed: {:?}", e.kind());
        }
        link
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn retries_remaining(&self) -> u8 {
        self.retry.remaining()
    }

    /// Absolute tick at which the current reception times out
    pub fn deadline(&self) -> u32 {
        self.retry.deadline()
    }

    /// Wire bytes of the last staged request
    pub fn staged(&self) -> &[u8] {
        &self.tx_frame[..self.tx_len]
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    pub fn carrier(&self) -> &C {
        &self.carrier
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Stage `frame` and start sending it. With a reply buffer the link
    /// switches to receiving once the transmission completes.
    pub(crate) fn launch(
        &mut self,
        frame: Frame<'_>,
        reply: Option<&'a mut [u8]>,
        retransmissions: u8,
    ) {
        self.rx = reply.map(|buf| FrameDecoder::new(RxBuffer::new(buf)));
        self.retry.reset(retransmissions);
        match frame.encode(&mut self.tx_frame) {
            Ok(size) => self.tx_len = size,
            Err(e) => {
                warn!("staging failed: {e}");
                self.tx_len = 0;
                self.finish(Status::Error);
                return;
            }
        }
        self.transmit();
    }

    /// Wait for an inbound frame without sending anything first
    pub(crate) fn launch_receive(&mut self, buffer: &'a mut [u8]) {
        self.rx = Some(FrameDecoder::new(RxBuffer::new(buffer)));
        self.retry.reset(0);
        self.retry.arm(self.clock.now_ms());
        self.set_phase(Phase::Receiving);
    }

    /// Hold on to `buffer` for [`Link::release_buffer`] without exposing its
    /// old contents as a received frame
    pub(crate) fn park(&mut self, buffer: &'a mut [u8]) {
        self.rx = Some(FrameDecoder::new(RxBuffer::new(buffer)));
    }

    /// Deliver a hardware completion. Constant time: stores the byte, moves
    /// the phase or refreshes the deadline, nothing else.
    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::TxComplete => self.on_tx_complete(),
            Event::Received(byte) => self.on_received(byte),
            Event::LineFault(kind) => self.on_line_fault(kind),
        }
    }

    /// Drain up to [`MAX_EVENTS_PER_POLL`] pending hardware events, stopping
    /// early once a reception deadline has passed, then run the time driven
    /// transitions: deadline expiry with retransmission, and the deferred CRC
    /// check.
    /// Never blocks.
    pub fn poll(&mut self) {
        for _ in 0..MAX_EVENTS_PER_POLL {
            let Some(event) = self.transceiver.next_event() else {
                break;
            };
            self.on_event(event);
            // a noisy line must not hold off the deadline
            if self.phase == Phase::Receiving && self.retry.expired(self.clock.now_ms()) {
                break;
            }
        }

        match self.phase {
            Phase::Receiving => {
                if !self.retry.expired(self.clock.now_ms()) {
                    return;
                }
                if self.retry.take() {
                    debug!(
                        "reply deadline passed, retransmitting ({} left)",
                        self.retry.remaining()
                    );
                    self.transmit();
                } else {
                    self.finish(Status::Timeout);
                }
            }
            Phase::ReceivedAwaitingCrc => {
                let matches = self.rx.as_ref().is_some_and(|d| d.crc_matches());
                self.finish(if matches { Status::Ok } else { Status::CrcError });
            }
            Phase::Idle | Phase::Transmitting => {}
        }
    }

    fn on_tx_complete(&mut self) {
        if self.phase != Phase::Transmitting {
            return;
        }
        self.stop_carrier();
        match self.rx.as_mut() {
            None => self.finish(Status::Ok),
            Some(decoder) => {
                decoder.reset();
                self.retry.arm(self.clock.now_ms());
                self.set_phase(Phase::Receiving);
            }
        }
    }

    fn on_received(&mut self, byte: u8) {
        if self.phase != Phase::Receiving {
            return;
        }
        let Some(decoder) = self.rx.as_mut() else {
            return;
        };
        trace!("rx {byte:#04x}");
        match decoder.feed(byte) {
            // noise does not extend the deadline
            Ok(Progress::Ignored) => {}
            Ok(Progress::Continue) => self.retry.arm(self.clock.now_ms()),
            Ok(Progress::Complete) => {
                self.retry.arm(self.clock.now_ms());
                self.set_phase(Phase::ReceivedAwaitingCrc);
            }
            Err(DecodeError::LengthExceeded { declared, capacity }) => {
                warn!("frame length {declared} exceeds receive capacity {capacity}");
                decoder.reset();
                self.finish(Status::Error);
            }
        }
    }

    fn on_line_fault(&mut self, kind: ErrorKind) {
        if self.phase == Phase::Idle {
            debug!("line fault {kind:?} while idle");
            return;
        }
        warn!("line fault {kind:?} in {:?}", self.phase);
        if self.phase == Phase::Transmitting {
            self.stop_carrier();
        }
        if let Some(decoder) = self.rx.as_mut() {
            decoder.reset();
        }
        self.finish(Status::Error);
    }

    /// (Re)send the staged frame verbatim with the carrier keyed
    fn transmit(&mut self) {
        self.set_phase(Phase::Transmitting);
        if let Err(e) = self.carrier.start() {
            warn!("carrier start failed: {e:?}");
        }
        if let Err(e) = self
            .transceiver
            .start_transmit(&self.tx_frame[..self.tx_len])
        {
            warn!("transmission failed to start: {:?}", e.kind());
            self.stop_carrier();
            self.finish(Status::Error);
        }
    }

    fn stop_carrier(&mut self) {
        if let Err(e) = self.carrier.stop() {
            warn!("carrier stop failed: {e:?}");
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!("{:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    fn finish(&mut self, status: Status) {
        debug!("{:?} -> Idle, {status:?}", self.phase);
        self.phase = Phase::Idle;
        self.status = status;
    }
}
