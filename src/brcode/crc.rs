//! CRC-16/CCITT-FALSE checksum for BR Code payloads.
//!
//! The BR Code trailer is `6304` followed by four upper-case hex digits:
//! the CRC-16/CCITT-FALSE (polynomial `0x1021`, initial value `0xFFFF`, no
//! reflection, no final xor) of every preceding byte, including the `6304`
//! tag-length header itself.

use crate::error::{PixError, Result};

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// Computes the CRC-16/CCITT-FALSE of `data`.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
        }
    }
    crc
}

/// Renders the checksum of `payload` as four upper-case, zero-padded hex
/// digits — the form a BR Code carries in its trailer.
///
/// `payload` is everything up to and including the `6304` header.
///
/// # Examples
///
/// ```
/// use pix_brcode::brcode::crc::checksum;
///
/// assert_eq!(checksum("123456789"), "29B1");
/// ```
#[must_use]
pub fn checksum(payload: &str) -> String {
    format!("{:04X}", crc16(payload.as_bytes()))
}

/// Verifies a full BR Code string against its trailing CRC.
///
/// The last four characters are the expected value; the check value is
/// computed over everything before them. Comparison is exact, so a
/// lower-case trailer is rejected.
///
/// # Errors
///
/// Returns [`PixError::InvalidCrc`] when the input is shorter than a CRC
/// trailer or the computed value differs from the expected one.
pub fn verify(input: &str) -> Result<()> {
    if input.len() < 4 || !input.is_char_boundary(input.len() - 4) {
        return Err(PixError::InvalidCrc);
    }
    let (payload, expected) = input.split_at(input.len() - 4);
    if checksum(payload) == expected {
        Ok(())
    } else {
        Err(PixError::InvalidCrc)
    }
}
