//! Protected JWS header validation.
//!
//! The PSP trust scheme requires four header parameters: `jku` (where the
//! signing JWKS lives), `kid` and `x5t` (which key inside it), and `alg`.
//! The header is validated before any key material is fetched, so a token
//! asking for a forbidden algorithm or a non-HTTPS key URL never causes
//! network traffic.

use serde_json::Value;
use url::Url;

use crate::error::{FieldErrors, PixError, Result};
use crate::jws::algorithm::{JwsAlgorithm, REJECTED_ALGORITHMS};

/// A validated protected JWS header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsHeader {
    /// Signing algorithm; whitelisted asymmetric algorithms only.
    pub alg: JwsAlgorithm,
    /// JWKS URL, normalized to carry an `https` scheme.
    pub jku: Url,
    /// Key identifier inside the JWKS.
    pub kid: String,
    /// SHA-1 thumbprint of the signing certificate (url-base64, no padding).
    pub x5t: String,
}

impl JwsHeader {
    /// Casts a decoded JSON header object, collecting every field problem.
    ///
    /// `jku` values without a scheme get `https://` prepended before the
    /// scheme check, so `psp.br/certs` normalizes while `http://psp.br`
    /// stays rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] with the accumulated field errors.
    pub fn cast(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PixError::field("header", "must be a JSON object"));
        };
        let mut errors = FieldErrors::new();

        let alg = match object.get("alg").and_then(Value::as_str) {
            Some(raw) if raw.len() != 5 => {
                errors.push("alg", "must be five characters");
                None
            }
            Some(raw) if REJECTED_ALGORITHMS.contains(&raw) => {
                errors.push("alg", "is not an accepted signing algorithm");
                None
            }
            Some(raw) => match raw.parse::<JwsAlgorithm>() {
                Ok(alg) => Some(alg),
                Err(()) => {
                    errors.push("alg", "is not a supported signing algorithm");
                    None
                }
            },
            None => {
                errors.push("alg", "is required");
                None
            }
        };

        let jku = match object.get("jku").and_then(Value::as_str) {
            Some(raw) => match normalize_jku(raw) {
                Ok(url) => Some(url),
                Err(message) => {
                    errors.push("jku", message);
                    None
                }
            },
            None => {
                errors.push("jku", "is required");
                None
            }
        };

        let kid = required_string(object, "kid", &mut errors);
        let x5t = required_string(object, "x5t", &mut errors);

        match (alg, jku, kid, x5t) {
            (Some(alg), Some(jku), Some(kid), Some(x5t)) if errors.is_empty() => {
                errors.into_result(Self { alg, jku, kid, x5t })
            }
            _ => Err(PixError::Validation(errors)),
        }
    }

    /// Peeks and casts the protected header of a compact JWS without
    /// verifying the signature.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::MalformedJws`] when the token is not a three-part
    /// compact serialization, plus everything [`JwsHeader::cast`] returns.
    pub fn from_compact(token: &str) -> Result<Self> {
        let compact = crate::jws::CompactJws::split(token)?;
        Self::cast(&compact.header_value()?)
    }
}

/// Prepends `https://` to scheme-less values, then requires `https`.
fn normalize_jku(raw: &str) -> std::result::Result<Url, &'static str> {
    let candidate = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|_| "is not a valid URL")?;
    if url.scheme() == "https" {
        Ok(url)
    } else {
        Err("scheme must be https")
    }
}

fn required_string(
    object: &serde_json::Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match object.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Some(value.to_owned()),
        Some(_) => {
            errors.push(field, "must not be empty");
            None
        }
        None => {
            errors.push(field, "is required");
            None
        }
    }
}
