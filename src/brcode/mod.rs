//! BR Code decoding: CRC check, TLV parse and schema validation.
//!
//! A BR Code is the TLV payload carried by a PIX QR code. Decoding runs in
//! three stages:
//!
//! 1. [`crc::verify`] checks the CRC-16/CCITT-FALSE trailer and fails fast
//!    before any structural work.
//! 2. The TLV parser walks the `TT LL V` records, mapping tags to canonical
//!    field names and recursing into the template tags (`26`, `62`, `80`).
//! 3. [`BrCode::from_tlv`] validates the mapping against the BR Code schema
//!    and classifies the result.
//!
//! # Examples
//!
//! ```
//! use pix_brcode::brcode::{decode_to_brcode, BrCodeKind, DecodeOptions};
//!
//! # fn example() -> pix_brcode::Result<()> {
//! let payload = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-\
//!                4266554400005204000053039865802BR5913Fulano de Tal6008BRASILIA\
//!                62070503***63041D3D";
//! let brcode = decode_to_brcode(payload, &DecodeOptions::default())?;
//!
//! assert_eq!(brcode.kind(), BrCodeKind::Static);
//! assert_eq!(brcode.crc, "1D3D");
//! # Ok(())
//! # }
//! ```

pub mod crc;
pub mod model;
mod tlv;

pub use model::{AdditionalDataFieldTemplate, BrCode, BrCodeKind, MerchantAccountInformation};
pub use tlv::{TlvMap, TlvValue};

use crate::error::Result;

/// Options recognized by [`decode`] and [`decode_to_brcode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// When set, tags outside the BR Code schema are silently skipped.
    /// When unset (the default), an unknown tag fails the decode.
    pub strict_validation: bool,
}

/// Decodes a BR Code string into its nested field mapping.
///
/// The CRC trailer is verified first; the TLV structure is only parsed for
/// payloads that pass the integrity check.
///
/// # Errors
///
/// - [`PixError::InvalidCrc`](crate::PixError::InvalidCrc) when the trailer
///   does not match
/// - [`PixError::SizeNotAnInteger`](crate::PixError::SizeNotAnInteger) /
///   [`PixError::InvalidTagLengthValue`](crate::PixError::InvalidTagLengthValue)
///   for malformed records
/// - [`PixError::UnknownTag`](crate::PixError::UnknownTag) for tags outside
///   the schema, unless `strict_validation` is set
pub fn decode(input: &str, options: &DecodeOptions) -> Result<TlvMap> {
    crc::verify(input)?;
    tlv::parse(input, options.strict_validation)
}

/// Decodes a BR Code string into the validated [`BrCode`] model.
///
/// # Errors
///
/// Everything [`decode`] returns, plus
/// [`PixError::Validation`](crate::PixError::Validation) with the full set
/// of field problems when the mapping does not satisfy the BR Code schema.
pub fn decode_to_brcode(input: &str, options: &DecodeOptions) -> Result<BrCode> {
    let map = decode(input, options)?;
    BrCode::from_tlv(&map)
}
