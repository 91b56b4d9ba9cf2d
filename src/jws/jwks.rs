//! JWKS document validation (RFC 7517).
//!
//! The JWKS fetched from a header's `jku` is cast field-by-field before any
//! key reaches the trust pipeline. Per-key checks are structural only — the
//! expensive certificate work happens in the key store — but they are
//! strict: a key without its algebraic parameters, with write-capable
//! `key_ops`, or with an HMAC `alg` never gets that far.

use serde_json::Value;

use crate::error::{FieldErrors, PixError, Result};
use crate::jws::algorithm::JwsAlgorithm;

/// Key types the PSP scheme accepts.
const SUPPORTED_KTY: [&str; 2] = ["EC", "RSA"];

/// A single JSON Web Key, structurally validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwk {
    /// Key type: `"EC"` or `"RSA"`.
    pub kty: String,
    /// Key identifier.
    pub kid: String,
    /// SHA-1 thumbprint of the leaf certificate (url-base64, no padding).
    pub x5t: String,
    /// Certificate chain, leaf first, standard base64 DER.
    pub x5c: Vec<String>,
    /// Permitted operations; only `"verify"` is accepted.
    pub key_ops: Vec<String>,
    /// Intended use, when published.
    pub use_: Option<String>,
    /// Declared algorithm, when published; must be a supported one.
    pub alg: Option<JwsAlgorithm>,
    /// SHA-256 thumbprint, when published.
    pub x5t_s256: Option<String>,
    /// Certificate URL, when published.
    pub x5u: Option<String>,
    /// RSA modulus (url-base64), required for RSA keys.
    pub n: Option<String>,
    /// RSA public exponent (url-base64), required for RSA keys.
    pub e: Option<String>,
    /// EC curve name, required for EC keys.
    pub crv: Option<String>,
    /// EC x coordinate (url-base64), required for EC keys.
    pub x: Option<String>,
    /// EC y coordinate (url-base64), required for EC keys.
    pub y: Option<String>,
}

impl Jwk {
    /// Casts one JSON key object, collecting every field problem.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] with the accumulated field errors.
    pub fn cast(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PixError::field("key", "must be a JSON object"));
        };
        let mut errors = FieldErrors::new();

        let kty = match object.get("kty").and_then(Value::as_str) {
            Some(kty) if SUPPORTED_KTY.contains(&kty) => Some(kty.to_owned()),
            Some(_) => {
                errors.push("kty", "must be EC or RSA");
                None
            }
            None => {
                errors.push("kty", "is required");
                None
            }
        };

        let kid = required_string(object, "kid", &mut errors);
        let x5t = required_string(object, "x5t", &mut errors);

        let x5c = match object.get("x5c") {
            Some(Value::Array(entries)) if !entries.is_empty() => {
                let mut chain = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry.as_str() {
                        Some(der) => chain.push(der.to_owned()),
                        None => {
                            errors.push("x5c", "entries must be strings");
                            break;
                        }
                    }
                }
                Some(chain)
            }
            Some(Value::Array(_)) => {
                errors.push("x5c", "must not be empty");
                None
            }
            Some(_) => {
                errors.push("x5c", "must be an array");
                None
            }
            None => {
                errors.push("x5c", "is required");
                None
            }
        };

        let key_ops = match object.get("key_ops") {
            Some(Value::Array(entries)) => {
                let ops: Vec<String> = entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
                if ops.len() != entries.len() || ops.iter().any(|op| op != "verify") {
                    errors.push("key_ops", "only the verify operation is accepted");
                    None
                } else {
                    Some(ops)
                }
            }
            Some(_) => {
                errors.push("key_ops", "must be an array");
                None
            }
            None => {
                errors.push("key_ops", "is required");
                None
            }
        };

        let alg = match object.get("alg").and_then(Value::as_str) {
            Some(raw) => match raw.parse::<JwsAlgorithm>() {
                Ok(alg) => Some(Some(alg)),
                Err(()) => {
                    errors.push("alg", "is not a supported signing algorithm");
                    None
                }
            },
            None => Some(None),
        };

        let use_ = optional_string(object, "use");
        let x5t_s256 = optional_string(object, "x5t#S256");
        let x5u = optional_string(object, "x5u");
        let n = optional_string(object, "n");
        let e = optional_string(object, "e");
        let crv = optional_string(object, "crv");
        let x = optional_string(object, "x");
        let y = optional_string(object, "y");

        match kty.as_deref() {
            Some("EC") => {
                for (field, value) in [("crv", &crv), ("x", &x), ("y", &y)] {
                    if value.is_none() {
                        errors.push(field, "is required for EC keys");
                    }
                }
            }
            Some("RSA") => {
                for (field, value) in [("n", &n), ("e", &e)] {
                    if value.is_none() {
                        errors.push(field, "is required for RSA keys");
                    }
                }
            }
            _ => {}
        }

        match (kty, kid, x5t, x5c, key_ops, alg) {
            (Some(kty), Some(kid), Some(x5t), Some(x5c), Some(key_ops), Some(alg))
                if errors.is_empty() =>
            {
                errors.into_result(Self {
                    kty,
                    kid,
                    x5t,
                    x5c,
                    key_ops,
                    use_,
                    alg,
                    x5t_s256,
                    x5u,
                    n,
                    e,
                    crv,
                    x,
                    y,
                })
            }
            _ => Err(PixError::Validation(errors)),
        }
    }
}

/// A validated JSON Web Key Set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwks {
    /// The keys, in publication order.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Casts a JWKS document.
    ///
    /// The top-level `keys` array is required and must hold at least one
    /// key; each key is cast through [`Jwk::cast`].
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] when `keys` is missing or empty, or
    /// the first key-level error set encountered.
    pub fn cast(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PixError::InvalidJwksContents);
        };
        let keys = match object.get("keys") {
            Some(Value::Array(entries)) if !entries.is_empty() => entries,
            Some(Value::Array(_)) => {
                return Err(PixError::field("keys", "must not be empty"));
            }
            _ => return Err(PixError::field("keys", "is required")),
        };
        let keys = keys.iter().map(Jwk::cast).collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
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

fn optional_string(object: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rsa_key() -> Value {
        json!({
            "kty": "RSA",
            "kid": "key-1",
            "x5t": "dGh1bWJwcmludA",
            "x5c": ["bGVhZg", "cm9vdA"],
            "key_ops": ["verify"],
            "alg": "RS256",
            "n": "sXchZvVb",
            "e": "AQAB"
        })
    }

    fn ec_key() -> Value {
        json!({
            "kty": "EC",
            "kid": "key-2",
            "x5t": "dGh1bWJwcmludA",
            "x5c": ["bGVhZg", "cm9vdA"],
            "key_ops": ["verify"],
            "crv": "P-256",
            "x": "eA",
            "y": "eQ"
        })
    }

    #[test]
    fn test_cast_rsa_key() {
        let key = Jwk::cast(&rsa_key()).unwrap();
        assert_eq!(key.kty, "RSA");
        assert_eq!(key.alg, Some(JwsAlgorithm::RS256));
        assert_eq!(key.x5c.len(), 2);
    }

    #[test]
    fn test_cast_ec_key() {
        let key = Jwk::cast(&ec_key()).unwrap();
        assert_eq!(key.kty, "EC");
        assert_eq!(key.crv.as_deref(), Some("P-256"));
    }

    #[test]
    fn test_ec_key_requires_curve_parameters() {
        let mut value = ec_key();
        value.as_object_mut().unwrap().remove("y");
        let Err(PixError::Validation(errors)) = Jwk::cast(&value) else {
            panic!("expected validation error");
        };
        assert!(errors.get("y").is_some());
    }

    #[test]
    fn test_rsa_key_requires_modulus_and_exponent() {
        let mut value = rsa_key();
        value.as_object_mut().unwrap().remove("n");
        value.as_object_mut().unwrap().remove("e");
        let Err(PixError::Validation(errors)) = Jwk::cast(&value) else {
            panic!("expected validation error");
        };
        assert!(errors.get("n").is_some());
        assert!(errors.get("e").is_some());
    }

    #[test]
    fn test_oct_kty_is_rejected() {
        let mut value = rsa_key();
        value["kty"] = json!("oct");
        assert!(Jwk::cast(&value).is_err());
    }

    #[test]
    fn test_sign_key_ops_is_rejected() {
        let mut value = rsa_key();
        value["key_ops"] = json!(["verify", "sign"]);
        assert!(Jwk::cast(&value).is_err());
    }

    #[test]
    fn test_hmac_alg_is_rejected() {
        let mut value = rsa_key();
        value["alg"] = json!("HS256");
        assert!(Jwk::cast(&value).is_err());
    }

    #[test]
    fn test_empty_x5c_is_rejected() {
        let mut value = rsa_key();
        value["x5c"] = json!([]);
        assert!(Jwk::cast(&value).is_err());
    }

    #[test]
    fn test_jwks_requires_keys() {
        assert!(Jwks::cast(&json!({})).is_err());
        assert!(Jwks::cast(&json!({ "keys": [] })).is_err());
        assert!(matches!(
            Jwks::cast(&json!("nope")),
            Err(PixError::InvalidJwksContents)
        ));
    }

    #[test]
    fn test_jwks_casts_all_keys() {
        let jwks = Jwks::cast(&json!({ "keys": [rsa_key(), ec_key()] })).unwrap();
        assert_eq!(jwks.keys.len(), 2);
    }
}
