//! Certificate-chain processing for JWKS keys.
//!
//! A PSP publishes its `x5c` leaf-first with the trust anchor included, so
//! the chain must have at least two entries. Path validation reverses the
//! list, requires the head to be self-signed, and walks back down checking
//! name chaining and signatures at every link. The leaf then has to satisfy
//! three bindings before its key is trusted:
//!
//! 1. its SHA-1 thumbprint equals the key's `x5t`,
//! 2. its subject CN or SAN dNSName equals the `jku` authority,
//! 3. its public key equals the key declared in the JWK.
//!
//! Binding 3 is what stops a JWKS from declaring one key while chaining a
//! certificate for another; binding 2 ties the chain to the PSP's
//! registered host rather than to any CA-signed endpoint.

use chrono::{DateTime, Utc};
use sha1::{Digest as _, Sha1};
use url::Url;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::{PixError, Result};
use crate::jws::verify::{DeclaredKey, EcCurve};

/// Metadata extracted from a validated leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCertificate {
    /// The DER bytes, kept for re-inspection.
    pub der: Vec<u8>,
    /// SHA-1 thumbprint, url-base64 without padding (the `x5t` form).
    pub thumbprint: String,
    /// Subject Common Name, when present.
    pub subject_common_name: Option<String>,
    /// Subject Alternative Name dNSName entries.
    pub san_dns_names: Vec<String>,
    /// Start of the validity window (UTC).
    pub not_before: DateTime<Utc>,
    /// End of the validity window (UTC).
    pub not_after: DateTime<Utc>,
}

/// Base64-decodes an `x5c` list into DER entries, leaf first.
///
/// # Errors
///
/// - [`PixError::InvalidCertEncoding`] for undecodable entries
/// - [`PixError::X5cMustHaveMoreThanOneCert`] when fewer than two
///   certificates are present
pub(crate) fn decode_x5c(x5c: &[String]) -> Result<Vec<Vec<u8>>> {
    let chain = x5c
        .iter()
        .map(|entry| {
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, entry)
                .map_err(|_| PixError::InvalidCertEncoding)
        })
        .collect::<Result<Vec<_>>>()?;
    if chain.len() < 2 {
        return Err(PixError::X5cMustHaveMoreThanOneCert);
    }
    Ok(chain)
}

/// Validates the certification path of a leaf-first DER chain.
///
/// The reversed chain's head is the trust anchor: it must be self-signed.
/// Every following certificate must chain to its predecessor by name and by
/// signature.
///
/// # Errors
///
/// - [`PixError::InvalidCertificateEncoding`] when an entry is not DER
/// - [`PixError::CertificateChainInvalid`] when a link fails
pub(crate) fn validate_path(chain: &[Vec<u8>]) -> Result<()> {
    let mut parsed = Vec::with_capacity(chain.len());
    for der in chain.iter().rev() {
        let (_, certificate) = X509Certificate::from_der(der)
            .map_err(|_| PixError::InvalidCertificateEncoding)?;
        parsed.push(certificate);
    }

    let anchor = parsed.first().ok_or(PixError::CertificateChainInvalid)?;
    if anchor.subject().to_string() != anchor.issuer().to_string() {
        return Err(PixError::CertificateChainInvalid);
    }
    anchor
        .verify_signature(None)
        .map_err(|_| PixError::CertificateChainInvalid)?;

    for pair in parsed.windows(2) {
        let (parent, child) = (&pair[0], &pair[1]);
        if child.issuer().to_string() != parent.subject().to_string() {
            return Err(PixError::CertificateChainInvalid);
        }
        child
            .verify_signature(Some(&parent.tbs_certificate.subject_pki))
            .map_err(|_| PixError::CertificateChainInvalid)?;
    }

    Ok(())
}

/// Extracts the leaf's public key in [`DeclaredKey`] form for the
/// key-consistency check.
///
/// # Errors
///
/// Returns [`PixError::InvalidCertificateEncoding`] when the SPKI cannot be
/// parsed or uses a key type outside EC/RSA.
pub(crate) fn leaf_public_key(leaf_der: &[u8]) -> Result<DeclaredKey> {
    let (_, certificate) = X509Certificate::from_der(leaf_der)
        .map_err(|_| PixError::InvalidCertificateEncoding)?;
    let spki = certificate.public_key();
    match spki.parsed().map_err(|_| PixError::InvalidCertificateEncoding)? {
        PublicKey::RSA(rsa) => Ok(DeclaredKey::rsa(rsa.modulus, rsa.exponent)),
        PublicKey::EC(point) => {
            let oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|oid| oid.to_id_string())
                .ok_or(PixError::InvalidCertificateEncoding)?;
            let crv = [EcCurve::P256, EcCurve::P384, EcCurve::P521]
                .into_iter()
                .find(|curve| curve.oid() == oid)
                .ok_or(PixError::InvalidCertificateEncoding)?;
            let data = point.data();
            // Uncompressed SEC1 point: 0x04 || x || y.
            let size = crv.field_size();
            if data.len() != 1 + 2 * size || data[0] != 0x04 {
                return Err(PixError::InvalidCertificateEncoding);
            }
            Ok(DeclaredKey::Ec {
                crv,
                x: data[1..=size].to_vec(),
                y: data[1 + size..].to_vec(),
            })
        }
        _ => Err(PixError::InvalidCertificateEncoding),
    }
}

/// Checks the leaf's thumbprint and host bindings and extracts its
/// metadata.
///
/// # Errors
///
/// - [`PixError::KeyThumbprintAndLeafCertificateDiffer`] when the SHA-1
///   thumbprint does not equal `x5t`
/// - [`PixError::CertificateSubjectAndJkuUriAuthorityDiffers`] when neither
///   the subject CN nor a SAN dNSName equals the `jku` authority
/// - [`PixError::InvalidCertificateEncoding`] for unparseable material
pub(crate) fn check_leaf(leaf_der: &[u8], x5t: &str, jku: &Url) -> Result<LeafCertificate> {
    let (_, certificate) = X509Certificate::from_der(leaf_der)
        .map_err(|_| PixError::InvalidCertificateEncoding)?;

    let thumbprint = thumbprint_sha1(leaf_der);
    if thumbprint != x5t {
        return Err(PixError::KeyThumbprintAndLeafCertificateDiffer);
    }

    let subject_common_name = certificate
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned);

    let mut san_dns_names = Vec::new();
    for extension in certificate.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = extension.parsed_extension() {
            for name in &san.general_names {
                if let GeneralName::DNSName(dns) = name {
                    san_dns_names.push((*dns).to_owned());
                }
            }
        }
    }

    let authority = jku.authority();
    let cn_matches = subject_common_name.as_deref() == Some(authority);
    let san_matches = san_dns_names.iter().any(|dns| dns == authority);
    if !cn_matches && !san_matches {
        return Err(PixError::CertificateSubjectAndJkuUriAuthorityDiffers);
    }

    let not_before = DateTime::<Utc>::from_timestamp(certificate.validity().not_before.timestamp(), 0)
        .ok_or(PixError::InvalidCertificateEncoding)?;
    let not_after = DateTime::<Utc>::from_timestamp(certificate.validity().not_after.timestamp(), 0)
        .ok_or(PixError::InvalidCertificateEncoding)?;

    Ok(LeafCertificate {
        der: leaf_der.to_vec(),
        thumbprint,
        subject_common_name,
        san_dns_names,
        not_before,
        not_after,
    })
}

/// SHA-1 thumbprint in the `x5t` rendering: url-base64, no padding.
#[must_use]
pub fn thumbprint_sha1(der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(der);
    base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        hasher.finalize(),
    )
}
