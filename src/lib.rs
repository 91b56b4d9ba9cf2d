//! PIX BR Code validation and dynamic payment loading.
//!
//! A Rust library for Brazil's instant-payment system ("PIX"): it decodes
//! and validates BR Code QR payloads and, for dynamic codes, securely
//! fetches and verifies the signed payment document from the payment
//! service provider (PSP).
//!
//! # What this crate does
//!
//! - **BR Code decoding**: TLV parsing with a CRC-16/CCITT-FALSE integrity
//!   check, schema validation, and classification into static,
//!   dynamic-immediate and dynamic-with-due-date codes
//! - **JWS verification**: RFC 7515/7517 compact JWS and JWKS handling
//!   under the central bank's trust policy (certificate chain validation,
//!   thumbprint binding, `jku` host binding, algorithm whitelist)
//! - **Key caching**: a process-wide read-mostly store of validated keys so
//!   repeated payment loads skip re-fetching and re-validating key material
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │   QR scanner   │
//! └───────┬────────┘
//!         │ BR Code payload
//! ┌───────▼────────────────────────────────────────┐
//! │            pix-brcode (this crate)             │
//! │  ┌────────────┐   static    ┌──────────────┐   │
//! │  │  decoder   │────────────►│   BrCode     │   │
//! │  │ (CRC+TLV)  │             └──────────────┘   │
//! │  └─────┬──────┘                                │
//! │        │ dynamic URL                           │
//! │  ┌─────▼──────┐  JWS+JWKS   ┌──────────────┐   │
//! │  │  loader    │────────────►│  PixPayment  │   │
//! │  │ (verify)   │  key store  └──────────────┘   │
//! │  └─────┬──────┘                                │
//! └────────┼───────────────────────────────────────┘
//!          │ HTTPS
//! ┌────────▼────────┐
//! │       PSP       │
//! └─────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Decode a static BR Code
//!
//! ```
//! use pix_brcode::{decode_to_brcode, BrCodeKind, DecodeOptions};
//!
//! # fn example() -> pix_brcode::Result<()> {
//! let payload = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-\
//!                4266554400005204000053039865802BR5913Fulano de Tal6008BRASILIA\
//!                62070503***63041D3D";
//!
//! let brcode = decode_to_brcode(payload, &DecodeOptions::default())?;
//! assert_eq!(brcode.kind(), BrCodeKind::Static);
//! assert_eq!(
//!     brcode.merchant_account_information.chave.as_deref(),
//!     Some("123e4567-e12b-12d1-a456-426655440000"),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Load a dynamic PIX payment
//!
//! ```no_run
//! use pix_brcode::{decode_to_brcode, load_pix, DecodeOptions};
//!
//! # async fn example(payload: &str) -> pix_brcode::Result<()> {
//! let brcode = decode_to_brcode(payload, &DecodeOptions::default())?;
//!
//! if let Some(url) = brcode.payment_url() {
//!     let client = pix_brcode::loader::create_http_client()?;
//!     let payment = load_pix(&client, &url).await?;
//!     println!("amount: {}", payment.valor.original);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`brcode`]: CRC check, TLV decoding and the [`BrCode`] model
//! - [`jws`]: compact JWS handling, header/JWKS validation, signature
//!   verification
//! - [`keystore`]: the validated-key store and its trust pipeline
//! - [`payment`]: the [`PixPayment`] model and CPF/CNPJ validation
//! - [`loader`]: the dynamic-load orchestrator and its HTTP seam
//! - [`error`]: the error taxonomy
//!
//! # Security Considerations
//!
//! The trust pipeline enforces, in order: certificate-chain path
//! validation, SHA-1 thumbprint binding between the JWK and its leaf
//! certificate, host binding between the certificate subject and the `jku`
//! authority, and equality between the declared key and the certificate
//! key. The signature verifier is constructed from the header's declared
//! algorithm, with `none` and the HMAC family rejected before any network
//! traffic happens. Skipping any one of these checks is a known attack
//! vector against PIX wallets; none of them is optional.
//!
//! # Concurrency
//!
//! Decoding and validation are pure synchronous functions. The only shared
//! state is the validated-key store, which readers snapshot without
//! blocking writers. Concurrent [`load_pix`] calls against the same PSP
//! may duplicate a JWKS fetch under a cold cache; every such fetch is fully
//! re-validated, so the race is benign.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod brcode;
pub mod error;
pub mod jws;
pub mod keystore;
pub mod loader;
pub mod payment;

pub use brcode::{decode, decode_to_brcode, BrCode, BrCodeKind, DecodeOptions, TlvMap, TlvValue};
pub use error::{FieldErrors, PixError, Result};
pub use jws::{Jwk, Jwks, JwsAlgorithm, JwsHeader};
pub use keystore::{KeyStore, ValidatedKey};
pub use loader::{load_pix, load_pix_with_store, PixHttpClient};
pub use payment::PixPayment;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify public API is accessible
        let _ = std::marker::PhantomData::<PixError>;
        let _ = std::marker::PhantomData::<BrCode>;
        let _ = std::marker::PhantomData::<PixPayment>;
    }
}
