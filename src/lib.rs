#![no_std]

mod blocking;
pub mod checksum;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal;
pub mod link;
#[cfg(test)]
mod mock;
mod nonblocking;
pub mod retry;
pub mod serial;

pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use config::{DEFAULT_RETRANSMISSIONS, LinkConfig};
pub use error::LinkError;
pub use frame::{Frame, FrameDecoder, FrameError, FrameHeader, Payload, RxBuffer};
pub use hal::{Carrier, Clock, Event, NoCarrier, PwmCarrier, Transceiver};
pub use link::{Link, Phase, Status};
pub use serial::{SerialError, SerialTransceiver};
