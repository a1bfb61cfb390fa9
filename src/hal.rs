//! Collaborators the link is bound to: the byte transceiver, the carrier
//! keying signal and the millisecond clock.

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_nb::serial::{self, ErrorKind};

/// Hardware completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Last byte of the frame has physically left the line
    TxComplete,
    Received(u8),
    /// Overrun, framing error or similar reported by the transceiver
    LineFault(ErrorKind),
}

/// Byte oriented half-duplex transceiver.
///
/// Completions are handed to the link through [`Transceiver::next_event`],
/// in the order they happened. An interrupt driven implementation queues
/// them from its handler; the link drains the queue from `poll`.
pub trait Transceiver {
    type Error: serial::Error;

    /// Arm reception. Called once when the link is created, the transceiver
    /// keeps itself armed from then on.
    fn listen(&mut self) -> Result<(), Self::Error>;

    /// Begin an asynchronous transmission of `frame`. Completion is reported
    /// with [`Event::TxComplete`].
    fn start_transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Pop the oldest pending completion
    fn next_event(&mut self) -> Option<Event>;
}

impl<T: Transceiver + ?Sized> Transceiver for &mut T {
    type Error = T::Error;

    fn listen(&mut self) -> Result<(), Self::Error> {
        T::listen(self)
    }

    fn start_transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        T::start_transmit(self, frame)
    }

    fn next_event(&mut self) -> Option<Event> {
        T::next_event(self)
    }
}

/// Keyed periodic signal that powers the radio while transmitting.
pub trait Carrier {
    type Error: Debug;

    fn configure(&mut self, duty_percent: u8) -> Result<(), Self::Error>;
    fn start(&mut self) -> Result<(), Self::Error>;
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Carrier driven by a PWM channel
#[derive(Debug)]
pub struct PwmCarrier<P> {
    pwm: P,
    duty_percent: u8,
}

impl<P: SetDutyCycle> PwmCarrier<P> {
    pub fn new(pwm: P) -> PwmCarrier<P> {
        PwmCarrier {
            pwm,
            duty_percent: crate::config::DEFAULT_CARRIER_DUTY_PERCENT,
        }
    }

    pub fn duty_percent(&self) -> u8 {
        self.duty_percent
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

impl<P: SetDutyCycle> Carrier for PwmCarrier<P> {
    type Error = P::Error;

    fn configure(&mut self, duty_percent: u8) -> Result<(), Self::Error> {
        self.duty_percent = duty_percent.min(100);
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.pwm.set_duty_cycle_percent(self.duty_percent)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.pwm.set_duty_cycle_fully_off()
    }
}

/// For wired links with nothing to key
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCarrier;

impl Carrier for NoCarrier {
    type Error = Infallible;

    fn configure(&mut self, _duty_percent: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Monotonic millisecond tick source. The counter may wrap.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<K: Clock + ?Sized> Clock for &K {
    fn now_ms(&self) -> u32 {
        K::now_ms(self)
    }
}
