//! Operations that start work and return at once. Progress is made by
//! calling [`Link::poll`]; the outcome is read back with [`Link::status`].

use crate::error::LinkError;
use crate::frame::Frame;
use crate::hal::{Carrier, Clock, Transceiver};
use crate::link::{Link, Phase, Status};

impl<'a, T, C, K> Link<'a, T, C, K>
where
    T: Transceiver,
    C: Carrier,
    K: Clock,
{
    /// Fire and forget. `Ok` is latched once the transmission completes.
    pub fn start_send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.start_send_and_receive(payload, None, 0)
    }

    /// Send a request and, with a `reply` buffer, wait for the response.
    ///
    /// The reply may be at most `reply.len()` bytes (clamped to 255). If no
    /// byte arrives within one byte period the request is resent, up to
    /// `retransmissions` times.
    pub fn start_send_and_receive(
        &mut self,
        payload: &[u8],
        reply: Option<&'a mut [u8]>,
        retransmissions: u8,
    ) -> Result<(), LinkError> {
        self.ensure_idle()?;
        if retransmissions > 0 && reply.is_none() {
            return Err(LinkError::InvalidArgument);
        }
        let frame = Frame::new(payload).map_err(|_| LinkError::PayloadTooLong {
            length: payload.len(),
        })?;
        self.launch(frame, reply, retransmissions);
        Ok(())
    }

    /// Responder side: wait for an inbound frame without sending first.
    /// Times out after one byte period of silence.
    pub fn start_receive(&mut self, buffer: &'a mut [u8]) -> Result<(), LinkError> {
        self.ensure_idle()?;
        self.launch_receive(buffer);
        Ok(())
    }

    /// `Busy` while an operation is in flight, otherwise the latched outcome
    /// of the last one.
    pub fn status(&self) -> Status {
        match self.phase {
            Phase::Idle => self.status,
            _ => Status::Busy,
        }
    }

    /// Payload length from the header of the last received frame. Only
    /// meaningful after `Ok` or `CrcError`.
    pub fn received_len(&self) -> Option<usize> {
        self.received().map(<[u8]>::len)
    }

    /// Payload of the last received frame after `Ok` or `CrcError`
    pub fn received(&self) -> Option<&[u8]> {
        if !matches!(self.status(), Status::Ok | Status::CrcError) {
            return None;
        }
        let decoder = self.rx.as_ref()?;
        decoder.is_complete().then(|| decoder.payload())
    }

    /// Hand back the receive buffer of the finished operation.
    /// `None` while busy or when the operation had no buffer.
    pub fn release_buffer(&mut self) -> Option<&'a mut [u8]> {
        if self.phase != Phase::Idle {
            return None;
        }
        self.rx.take().map(|decoder| decoder.into_buffer())
    }

    fn ensure_idle(&self) -> Result<(), LinkError> {
        match self.phase {
            Phase::Idle => Ok(()),
            _ => Err(LinkError::Busy),
        }
    }
}
