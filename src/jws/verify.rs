//! JWS signature verification against raw JWK parameters.
//!
//! The verifier is constructed from the header's `alg` and the validated
//! key's algebraic parameters only — never from anything else inside the
//! token — so an attacker cannot steer verification toward a weaker
//! algorithm than the one the header names.

use rsa::{pkcs1v15, pss, BigUint, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier;

use crate::error::{FieldErrors, PixError, Result};
use crate::jws::algorithm::JwsAlgorithm;
use crate::jws::jwks::Jwk;

/// Elliptic curves the PSP scheme accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256 (`secp256r1`).
    P256,
    /// NIST P-384 (`secp384r1`).
    P384,
    /// NIST P-521 (`secp521r1`).
    P521,
}

impl EcCurve {
    /// Parses the JWK `crv` name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            _ => None,
        }
    }

    /// Size of one affine coordinate in bytes.
    #[must_use]
    pub fn field_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// The curve's OID in dotted-decimal form, as carried by an SPKI.
    #[must_use]
    pub fn oid(self) -> &'static str {
        match self {
            Self::P256 => "1.2.840.10045.3.1.7",
            Self::P384 => "1.3.132.0.34",
            Self::P521 => "1.3.132.0.35",
        }
    }
}

/// Public key material taken from a JWK's algebraic parameters.
///
/// Values are normalized at construction (RSA integers lose leading zero
/// octets, EC coordinates are exact field size) so structural equality is
/// the key-consistency comparison the trust pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredKey {
    /// An RSA public key.
    Rsa {
        /// Modulus, big-endian, no leading zeros.
        n: Vec<u8>,
        /// Public exponent, big-endian, no leading zeros.
        e: Vec<u8>,
    },
    /// An EC public key.
    Ec {
        /// The named curve.
        crv: EcCurve,
        /// Affine x coordinate, exactly [`EcCurve::field_size`] bytes.
        x: Vec<u8>,
        /// Affine y coordinate, exactly [`EcCurve::field_size`] bytes.
        y: Vec<u8>,
    },
}

impl DeclaredKey {
    /// Builds the declared key from a structurally validated JWK.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] for undecodable or mis-sized
    /// parameters.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let mut errors = FieldErrors::new();
        match jwk.kty.as_str() {
            "RSA" => {
                let n = decode_param(jwk.n.as_deref(), "n", &mut errors);
                let e = decode_param(jwk.e.as_deref(), "e", &mut errors);
                match (n, e) {
                    (Some(n), Some(e)) if errors.is_empty() => errors.into_result(Self::Rsa {
                        n: strip_leading_zeros(&n),
                        e: strip_leading_zeros(&e),
                    }),
                    _ => Err(PixError::Validation(errors)),
                }
            }
            "EC" => {
                let crv = match jwk.crv.as_deref().and_then(EcCurve::from_name) {
                    Some(crv) => Some(crv),
                    None => {
                        errors.push("crv", "is not a supported curve");
                        None
                    }
                };
                let x = decode_param(jwk.x.as_deref(), "x", &mut errors);
                let y = decode_param(jwk.y.as_deref(), "y", &mut errors);
                if let (Some(crv), Some(x), Some(y)) = (crv, x.as_ref(), y.as_ref()) {
                    let size = crv.field_size();
                    if x.len() != size {
                        errors.push("x", "has the wrong length for the curve");
                    }
                    if y.len() != size {
                        errors.push("y", "has the wrong length for the curve");
                    }
                }
                match (crv, x, y) {
                    (Some(crv), Some(x), Some(y)) if errors.is_empty() => {
                        errors.into_result(Self::Ec { crv, x, y })
                    }
                    _ => Err(PixError::Validation(errors)),
                }
            }
            _ => Err(PixError::field("kty", "must be EC or RSA")),
        }
    }

    /// Builds an already-normalized RSA key.
    #[must_use]
    pub(crate) fn rsa(n: &[u8], e: &[u8]) -> Self {
        Self::Rsa { n: strip_leading_zeros(n), e: strip_leading_zeros(e) }
    }

    /// True when the algorithm's family matches this key's type.
    ///
    /// EC keys permit `ES256/ES384/ES512`; RSA keys permit the `RS` and
    /// `PS` families.
    #[must_use]
    pub fn permits(&self, alg: JwsAlgorithm) -> bool {
        match self {
            Self::Rsa { .. } => alg.is_rsa(),
            Self::Ec { .. } => alg.is_ec(),
        }
    }
}

/// Verifies a JWS signature over `signing_input` with the given algorithm
/// and key.
///
/// # Errors
///
/// - [`PixError::InvalidTokenSigningAlgorithm`] when the algorithm family
///   does not match the key type, or an EC algorithm names a different
///   curve than the key carries
/// - [`PixError::SignatureInvalid`] for undecodable key material, malformed
///   signatures, and genuine verification failures
pub fn verify(
    signing_input: &[u8],
    signature: &[u8],
    alg: JwsAlgorithm,
    key: &DeclaredKey,
) -> Result<()> {
    match (alg, key) {
        (JwsAlgorithm::RS256, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(rsa_public_key(n, e)?);
            let signature =
                pkcs1v15::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::RS384, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pkcs1v15::VerifyingKey::<Sha384>::new(rsa_public_key(n, e)?);
            let signature =
                pkcs1v15::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::RS512, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pkcs1v15::VerifyingKey::<Sha512>::new(rsa_public_key(n, e)?);
            let signature =
                pkcs1v15::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::PS256, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pss::VerifyingKey::<Sha256>::new(rsa_public_key(n, e)?);
            let signature =
                pss::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::PS384, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pss::VerifyingKey::<Sha384>::new(rsa_public_key(n, e)?);
            let signature =
                pss::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::PS512, DeclaredKey::Rsa { n, e }) => {
            let verifying_key = pss::VerifyingKey::<Sha512>::new(rsa_public_key(n, e)?);
            let signature =
                pss::Signature::try_from(signature).map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::ES256, DeclaredKey::Ec { crv: EcCurve::P256, x, y }) => {
            if x.len() != 32 || y.len() != 32 {
                return Err(PixError::SignatureInvalid);
            }
            let point = p256::EncodedPoint::from_affine_coordinates(
                p256::FieldBytes::from_slice(x),
                p256::FieldBytes::from_slice(y),
                false,
            );
            let verifying_key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| PixError::SignatureInvalid)?;
            let signature = p256::ecdsa::Signature::from_slice(signature)
                .map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::ES384, DeclaredKey::Ec { crv: EcCurve::P384, x, y }) => {
            if x.len() != 48 || y.len() != 48 {
                return Err(PixError::SignatureInvalid);
            }
            let point = p384::EncodedPoint::from_affine_coordinates(
                p384::FieldBytes::from_slice(x),
                p384::FieldBytes::from_slice(y),
                false,
            );
            let verifying_key = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| PixError::SignatureInvalid)?;
            let signature = p384::ecdsa::Signature::from_slice(signature)
                .map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        (JwsAlgorithm::ES512, DeclaredKey::Ec { crv: EcCurve::P521, x, y }) => {
            if x.len() != 66 || y.len() != 66 {
                return Err(PixError::SignatureInvalid);
            }
            let point = p521::EncodedPoint::from_affine_coordinates(
                p521::FieldBytes::from_slice(x),
                p521::FieldBytes::from_slice(y),
                false,
            );
            let verifying_key = p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| PixError::SignatureInvalid)?;
            let signature = p521::ecdsa::Signature::from_slice(signature)
                .map_err(|_| PixError::SignatureInvalid)?;
            verifying_key
                .verify(signing_input, &signature)
                .map_err(|_| PixError::SignatureInvalid)
        }
        _ => Err(PixError::InvalidTokenSigningAlgorithm),
    }
}

fn rsa_public_key(n: &[u8], e: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
        .map_err(|_| PixError::SignatureInvalid)
}

fn decode_param(
    value: Option<&str>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<Vec<u8>> {
    let Some(value) = value else {
        errors.push(field, "is required");
        return None;
    };
    match base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, value) {
        Ok(bytes) => Some(bytes),
        Err(_) => {
            errors.push(field, "is not valid url-base64");
            None
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}
