//! JWS compact-serialization handling (RFC 7515).
//!
//! A compact JWS is `base64url(header).base64url(payload).base64url(sig)`.
//! This module splits the token, peeks the protected header without
//! verification, and exposes the exact byte ranges the verifier needs. The
//! signing input is the raw `header.payload` text — re-encoding it would
//! invalidate signatures over non-canonical base64.

pub mod algorithm;
pub mod header;
pub mod jwks;
pub mod verify;

pub use algorithm::JwsAlgorithm;
pub use header::JwsHeader;
pub use jwks::{Jwk, Jwks};

use serde_json::Value;

use crate::error::{PixError, Result};

/// A compact JWS split into its three base64url parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactJws<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> CompactJws<'a> {
    /// Splits a compact serialization into header, payload and signature.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::MalformedJws`] unless the token has exactly three
    /// non-empty dot-separated parts.
    pub fn split(token: &'a str) -> Result<Self> {
        let mut parts = token.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(payload), Some(signature), None)
                if !header.is_empty() && !signature.is_empty() =>
            {
                Ok(Self { header, payload, signature })
            }
            _ => Err(PixError::MalformedJws),
        }
    }

    /// The `header.payload` text covered by the signature.
    #[must_use]
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }

    /// Decodes the protected header into JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::MalformedJws`] when the part is not base64url or
    /// not JSON.
    pub fn header_value(&self) -> Result<Value> {
        decode_json_part(self.header)
    }

    /// Decodes the payload into JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::MalformedJws`] when the part is not base64url or
    /// not JSON.
    pub fn payload_value(&self) -> Result<Value> {
        decode_json_part(self.payload)
    }

    /// Decodes the raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::MalformedJws`] when the part is not base64url.
    pub fn signature(&self) -> Result<Vec<u8>> {
        decode_part(self.signature)
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, part)
        .map_err(|_| PixError::MalformedJws)
}

fn decode_json_part(part: &str) -> Result<Value> {
    let bytes = decode_part(part)?;
    serde_json::from_slice(&bytes).map_err(|_| PixError::MalformedJws)
}
