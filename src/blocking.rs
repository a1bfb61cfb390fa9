//! Operations that run to a terminal status before returning.
//!
//! There is no suspension primitive underneath: these spin on
//! [`Link::poll`], so they rely on the timeout/retry policy to finish.

use crate::error::LinkError;
use crate::frame::Payload;
use crate::hal::{Carrier, Clock, Transceiver};
use crate::link::{Link, Status};

impl<'a, T, C, K> Link<'a, T, C, K>
where
    T: Transceiver,
    C: Carrier,
    K: Clock,
{
    /// Send `payload` and wait for the transmission to complete
    pub fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.start_send(payload)?;
        match self.wait() {
            Status::Ok => Ok(()),
            status => Err(status.into()),
        }
    }

    /// Send a request and wait for the reply. Returns the reply length; the
    /// bytes are available through [`Link::received`] or, with the buffer
    /// itself, [`Link::release_buffer`].
    pub fn send_and_receive(
        &mut self,
        payload: &[u8],
        reply: &'a mut [u8],
        retransmissions: u8,
    ) -> Result<usize, LinkError> {
        self.start_send_and_receive(payload, Some(reply), retransmissions)?;
        match self.wait() {
            Status::Ok => Ok(self.received_len().unwrap_or(0)),
            status => Err(status.into()),
        }
    }

    /// Responder side of [`Link::send_and_receive`]: wait for a request in
    /// `buffer`, let `handler` build the reply from the request payload and
    /// send it back. `None` from the handler sends nothing.
    ///
    /// `buffer` can be taken back with [`Link::release_buffer`] afterwards,
    /// whatever the outcome.
    pub fn receive_and_reply<F>(&mut self, buffer: &'a mut [u8], handler: F) -> Result<(), LinkError>
    where
        F: FnOnce(&[u8]) -> Option<Payload>,
    {
        self.start_receive(buffer)?;
        match self.wait() {
            Status::Ok => {}
            status => return Err(status.into()),
        }

        let reply = handler(self.received().unwrap_or(&[]));
        let buffer = self.release_buffer();
        let result = match reply {
            Some(reply) => self.send(&reply),
            None => Err(LinkError::Declined),
        };
        if let Some(buffer) = buffer {
            self.park(buffer);
        }
        result
    }

    fn wait(&mut self) -> Status {
        loop {
            self.poll();
            match self.status() {
                Status::Busy => continue,
                status => return status,
            }
        }
    }
}
