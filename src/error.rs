use core::fmt;

use crate::link::Status;

/// Why a link operation was rejected or did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Another operation is still in flight. Nothing was changed.
    Busy,
    /// Retransmissions requested without a reply buffer
    InvalidArgument,
    PayloadTooLong { length: usize },
    /// Operation ran to a terminal status other than `Ok`
    Failed(Status),
    /// Responder handler produced no reply
    Declined,
}

impl From<Status> for LinkError {
    fn from(value: Status) -> Self {
        match value {
            Status::Busy => LinkError::Busy,
            status => LinkError::Failed(status),
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Busy => write!(f, "link busy"),
            LinkError::InvalidArgument => write!(f, "retransmissions need a reply buffer"),
            LinkError::PayloadTooLong { length } => {
                write!(f, "payload of {length} bytes does not fit a frame")
            }
            LinkError::Failed(status) => write!(f, "operation failed: {status:?}"),
            LinkError::Declined => write!(f, "no reply produced"),
        }
    }
}
