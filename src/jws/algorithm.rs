//! JWS signing algorithm whitelist.
//!
//! PIX payment documents are signed with asymmetric JWS algorithms only.
//! `none` and the HMAC family are rejected outright: a shared-secret MAC
//! cannot prove the PSP's identity, and accepting one would let an attacker
//! "sign" a payload with the public key material itself.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Header `alg` values the PSP trust scheme forbids.
pub const REJECTED_ALGORITHMS: [&str; 4] = ["none", "HS256", "HS384", "HS512"];

/// A supported asymmetric JWS signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JwsAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// RSASSA-PSS with SHA-256.
    PS256,
    /// RSASSA-PSS with SHA-384.
    PS384,
    /// RSASSA-PSS with SHA-512.
    PS512,
    /// ECDSA over P-256 with SHA-256.
    ES256,
    /// ECDSA over P-384 with SHA-384.
    ES384,
    /// ECDSA over P-521 with SHA-512.
    ES512,
}

impl JwsAlgorithm {
    /// Every algorithm this crate can verify.
    pub const SUPPORTED: [JwsAlgorithm; 9] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// The header string for this algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    /// True for the ECDSA family.
    #[must_use]
    pub fn is_ec(self) -> bool {
        matches!(self, Self::ES256 | Self::ES384 | Self::ES512)
    }

    /// True for both RSA families (PKCS#1 v1.5 and PSS).
    #[must_use]
    pub fn is_rsa(self) -> bool {
        !self.is_ec()
    }
}

impl fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwsAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_supported_names_have_length_five() {
        for alg in JwsAlgorithm::SUPPORTED {
            assert_eq!(alg.as_str().len(), 5, "{alg}");
        }
    }

    #[test]
    fn test_rejected_values_do_not_parse() {
        for value in REJECTED_ALGORITHMS {
            assert!(value.parse::<JwsAlgorithm>().is_err(), "{value}");
        }
    }

    #[test]
    fn test_roundtrip_parse() {
        for alg in JwsAlgorithm::SUPPORTED {
            assert_eq!(alg.as_str().parse::<JwsAlgorithm>(), Ok(alg));
        }
    }

    #[test]
    fn test_family_split() {
        assert!(JwsAlgorithm::ES256.is_ec());
        assert!(JwsAlgorithm::RS512.is_rsa());
        assert!(JwsAlgorithm::PS384.is_rsa());
        assert!(!JwsAlgorithm::PS384.is_ec());
    }
}
