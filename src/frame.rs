use core::fmt;

use log::trace;

use crate::{Decode, Encode, checksum};

/// First byte of every frame
pub const MAGIC: u8 = 0x55;
/// Magic: 1, Length: 1, CRC: 1
pub const HEADER_LEN: usize = 3;
/// length field is a u8, so max amount of payload is u8::MAX (255)
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Owned reply payload, sized for the largest frame.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u8,
    pub crc: u8,
}

impl FrameHeader {
    pub fn bytes(&self) -> [u8; HEADER_LEN] {
        [MAGIC, self.length, self.crc]
    }
}

/// A frame borrowing its payload.
///
/// Wire layout: `[magic][length][crc][payload; length]`, no escaping.
/// The CRC covers the payload only.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    header: FrameHeader,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Frame<'a>, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong {
                found: payload.len(),
            });
        }
        let header = FrameHeader {
            length: payload.len() as u8,
            crc: checksum::compute(payload),
        };
        Ok(Frame { header, payload })
    }

    pub fn header(&self) -> FrameHeader {
        self.header
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Length on the wire including the header
    pub fn size(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

/// Error type for encoding and decoding whole Frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    MissingMagic { found: u8 },
    PayloadTooLong { found: usize },
    EncodeBufferTooSmall { expected: usize, found: usize },
    DecodeBufferTooSmall { expected_at_least: usize, found: usize },
    CrcMismatch { calculated: u8, found: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MissingMagic { found } => write!(f, "missing magic, found {found:#04x}"),
            FrameError::PayloadTooLong { found } => {
                write!(f, "payload of {found} bytes exceeds {MAX_PAYLOAD_LEN}")
            }
            FrameError::EncodeBufferTooSmall { expected, found } => {
                write!(f, "encode buffer too small: need {expected}, have {found}")
            }
            FrameError::DecodeBufferTooSmall {
                expected_at_least,
                found,
            } => write!(
                f,
                "decode buffer too small: need at least {expected_at_least}, have {found}"
            ),
            FrameError::CrcMismatch { calculated, found } => {
                write!(f, "crc mismatch: calculated {calculated:#04x}, found {found:#04x}")
            }
        }
    }
}

impl Encode for Frame<'_> {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let size = self.size();
        if buffer.len() < size {
            return Err(FrameError::EncodeBufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        buffer[..HEADER_LEN].copy_from_slice(&self.header.bytes());
        buffer[HEADER_LEN..size].copy_from_slice(self.payload);
        Ok(size)
    }
}

impl<'a> Decode<'a> for Frame<'a> {
    type Error = FrameError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::DecodeBufferTooSmall {
                expected_at_least: HEADER_LEN,
                found: data.len(),
            });
        }
        if data[0] != MAGIC {
            return Err(FrameError::MissingMagic { found: data[0] });
        }
        let header = FrameHeader {
            length: data[1],
            crc: data[2],
        };
        let size = HEADER_LEN + header.length as usize;
        if data.len() < size {
            return Err(FrameError::DecodeBufferTooSmall {
                expected_at_least: size,
                found: data.len(),
            });
        }
        let payload = &data[HEADER_LEN..size];
        let calculated = checksum::compute(payload);
        if calculated != header.crc {
            return Err(FrameError::CrcMismatch {
                calculated,
                found: header.crc,
            });
        }
        Ok(Frame { header, payload })
    }
}

/// Fatal outcome of feeding a byte to a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    LengthExceeded { declared: u8, capacity: u8 },
}

/// Non-fatal outcome of feeding a byte to a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Byte was not the magic and was dropped. Decoder stays armed.
    Ignored,
    Continue,
    /// All payload bytes are in. The CRC has not been checked.
    Complete,
}

/// Caller supplied receive storage.
///
/// The declared frame length is validated against `capacity` exactly once,
/// and every payload write afterwards is bounded by that accepted length.
#[derive(Debug)]
pub struct RxBuffer<'a> {
    buf: &'a mut [u8],
    capacity: u8,
    accepted: Option<u8>,
}

impl<'a> RxBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> RxBuffer<'a> {
        let capacity = buf.len().min(MAX_PAYLOAD_LEN) as u8;
        RxBuffer {
            buf,
            capacity,
            accepted: None,
        }
    }

    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Frame length accepted from the header, if one has been parsed
    pub fn accepted(&self) -> Option<u8> {
        self.accepted
    }

    fn accept(&mut self, declared: u8) -> Result<(), DecodeError> {
        if declared > self.capacity {
            return Err(DecodeError::LengthExceeded {
                declared,
                capacity: self.capacity,
            });
        }
        self.accepted = Some(declared);
        Ok(())
    }

    fn put(&mut self, index: usize, byte: u8) {
        match self.accepted {
            Some(len) if index < len as usize => self.buf[index] = byte,
            _ => {}
        }
    }

    fn discard(&mut self) {
        self.accepted = None;
    }

    /// Payload bytes covered by the accepted length
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.accepted.unwrap_or(0) as usize]
    }

    pub fn into_inner(self) -> &'a mut [u8] {
        self.buf
    }
}

/// Incremental frame parser, fed one byte at a time.
///
/// Header fields are consumed in order (magic, length, crc) and the payload
/// is stored at its offset in the [`RxBuffer`]. Once inside a frame the
/// decoder does not resynchronize.
#[derive(Debug)]
pub struct FrameDecoder<'a> {
    buffer: RxBuffer<'a>,
    received: usize,
    crc: u8,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(buffer: RxBuffer<'a>) -> FrameDecoder<'a> {
        FrameDecoder {
            buffer,
            received: 0,
            crc: 0,
        }
    }

    /// Forget any partial frame and wait for a magic byte again
    pub fn reset(&mut self) {
        self.received = 0;
        self.crc = 0;
        self.buffer.discard();
    }

    pub fn feed(&mut self, byte: u8) -> Result<Progress, DecodeError> {
        match self.received {
            0 => {
                if byte != MAGIC {
                    trace!("ignoring {byte:#04x} while waiting for magic");
                    return Ok(Progress::Ignored);
                }
            }
            1 => self.buffer.accept(byte)?,
            2 => self.crc = byte,
            n => self.buffer.put(n - HEADER_LEN, byte),
        }
        self.received += 1;

        if self.is_complete() {
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Continue)
        }
    }

    /// Bytes consumed so far, header included
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        match self.buffer.accepted() {
            Some(len) if self.received >= HEADER_LEN => {
                self.received - HEADER_LEN >= len as usize
            }
            _ => false,
        }
    }

    pub fn header(&self) -> Option<FrameHeader> {
        if self.received < HEADER_LEN {
            return None;
        }
        self.buffer.accepted().map(|length| FrameHeader {
            length,
            crc: self.crc,
        })
    }

    pub fn capacity(&self) -> u8 {
        self.buffer.capacity()
    }

    pub fn payload(&self) -> &[u8] {
        self.buffer.payload()
    }

    /// Compare the received CRC field against the payload. Cost is linear in
    /// the payload length, so this belongs in the poll path, never in `feed`.
    pub fn crc_matches(&self) -> bool {
        self.is_complete() && checksum::compute(self.payload()) == self.crc
    }

    pub fn into_buffer(self) -> &'a mut [u8] {
        self.buffer.into_inner()
    }
}
