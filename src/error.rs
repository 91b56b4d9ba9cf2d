//! Error types for PIX BR Code decoding and dynamic payment loading.
//!
//! All errors implement the standard [`std::error::Error`] trait via
//! [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Transport** ([`PixError::Http`], [`PixError::HttpStatusNotSuccess`]):
//!   failures while fetching the JWS or the JWKS
//! - **Decode** ([`PixError::InvalidCrc`], [`PixError::SizeNotAnInteger`],
//!   [`PixError::InvalidTagLengthValue`], [`PixError::UnknownTag`],
//!   [`PixError::InvalidJwksContents`], [`PixError::MalformedJws`]):
//!   structurally broken inputs
//! - **Schema** ([`PixError::Validation`]): per-field problems collected by
//!   the BR Code, JWS header, JWKS and payment validators
//! - **Key/Trust** ([`PixError::X5cMustHaveMoreThanOneCert`] and friends):
//!   a key failed the certificate trust policy
//! - **Verification** ([`PixError::CertificateExpired`],
//!   [`PixError::InvalidTokenSigningAlgorithm`],
//!   [`PixError::SignatureInvalid`]): the key is known but the token fails
//!
//! No error is recovered inside the pipeline; everything bubbles to the
//! caller of [`load_pix`](crate::loader::load_pix) or
//! [`decode`](crate::brcode::decode).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type alias for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, PixError>;

/// Per-field validation messages accumulated by a schema cast.
///
/// A single cast reports every problem it found rather than stopping at the
/// first one, so a malformed BR Code or payment document produces one error
/// with the complete field list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against a field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// Returns true when no field has a recorded message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the messages recorded for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Iterates over `(field, messages)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Converts the accumulated set into a result: `value` if empty,
    /// [`PixError::Validation`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] carrying `self` when any field has a
    /// recorded message.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(PixError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors produced while decoding BR Codes or loading dynamic PIX payments.
///
/// Variants map one-to-one onto the failure modes of the decode pipeline and
/// the JWS trust policy, so callers can branch on the exact check that
/// failed.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum PixError {
    /// HTTP request failed at the transport level.
    ///
    /// Wraps [`reqwest::Error`]: timeouts, DNS failures, TLS errors and
    /// connection resets all surface here unchanged.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The PSP answered with a status outside `200..300`.
    #[error("HTTP request returned status {0}")]
    HttpStatusNotSuccess(u16),

    /// The BR Code trailer does not match the CRC-16/CCITT-FALSE of the
    /// payload. Checked before any structural parse.
    #[error("BR Code CRC check failed")]
    InvalidCrc,

    /// A TLV length field is not a two-digit decimal number.
    #[error("TLV length is not an integer")]
    SizeNotAnInteger,

    /// A TLV record is truncated: fewer than four characters remain, or the
    /// value is shorter than its declared length.
    #[error("truncated or malformed TLV record")]
    InvalidTagLengthValue,

    /// A tag outside the BR Code schema was found while
    /// `strict_validation` is off.
    #[error("unknown BR Code tag {0:?}")]
    UnknownTag(String),

    /// One or more fields failed schema validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The JWKS endpoint body is not a JSON object.
    #[error("JWKS document is not a JSON object")]
    InvalidJwksContents,

    /// The JWS is not a well-formed compact serialization
    /// (`header.payload.signature` with base64url parts).
    #[error("JWS compact serialization is malformed")]
    MalformedJws,

    /// The `x5c` chain has fewer than two certificates. PSPs publish the
    /// full chain including its anchor, so a lone leaf is rejected.
    #[error("x5c must carry more than one certificate")]
    X5cMustHaveMoreThanOneCert,

    /// An `x5c` entry is not valid base64.
    #[error("x5c entry is not valid base64")]
    InvalidCertEncoding,

    /// A certificate is not valid DER.
    #[error("certificate is not valid DER")]
    InvalidCertificateEncoding,

    /// The chain failed path validation: a link does not chain by name or
    /// signature, or the anchor is not self-signed.
    #[error("certificate chain failed path validation")]
    CertificateChainInvalid,

    /// The key's `x5t` does not equal the SHA-1 thumbprint of the leaf
    /// certificate.
    #[error("key thumbprint and leaf certificate differ")]
    KeyThumbprintAndLeafCertificateDiffer,

    /// The key declared in the JWKS does not equal the public key inside
    /// the leaf certificate.
    #[error("key from leaf certificate differs from the declared key")]
    KeyFromLeafCertificateDiffer,

    /// Neither the certificate subject CN nor its SAN dNSName equals the
    /// `jku` authority.
    #[error("certificate subject and jku URI authority differ")]
    CertificateSubjectAndJkuUriAuthorityDiffers,

    /// The JWKS validated but contains no key matching the header's
    /// `(x5t, kid)`.
    #[error("key not found in jku")]
    KeyNotFoundInJku,

    /// The leaf certificate's validity window starts in the future.
    #[error("certificate is not yet valid")]
    CertificateNotYetValid,

    /// The leaf certificate's validity window has ended.
    #[error("certificate has expired")]
    CertificateExpired,

    /// The header's `alg` is incompatible with the validated key's type.
    #[error("token signing algorithm is not valid for the key")]
    InvalidTokenSigningAlgorithm,

    /// The JWS signature does not verify under the validated key.
    #[error("JWS signature verification failed")]
    SignatureInvalid,
}

impl PixError {
    /// Builds a [`PixError::Validation`] with a single field message.
    pub(crate) fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }
}
