use crc::{CRC_8_NRSC_5, Crc};

/// Poly 0x31, initial accumulator 0xFF, no reflection, no final xor.
/// Table driven: each byte folds through `table[acc ^ byte]`.
pub static CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Checksum over a frame payload. The header is never included.
///
/// An empty payload leaves the accumulator untouched, so `compute(&[]) == 0xFF`.
pub fn compute(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}
