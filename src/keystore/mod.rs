//! Validated-key store: the process-wide JWKS trust cache.
//!
//! The store maps a `jku` to the set of keys that survived the full trust
//! pipeline, keyed by `(x5t, kid)`. It is read-mostly: every dynamic PIX
//! load queries it, while writes only happen when a JWKS is (re)fetched.
//! Readers clone an [`Arc`] snapshot of the inner map under a short read
//! guard; [`KeyStore::process_keys`] validates the whole batch first and
//! then swaps the inner map in one write, so concurrent writers race to a
//! last-write-wins outcome and a failed batch leaves the store untouched.
//!
//! # Trust pipeline (per key, abort on first failure)
//!
//! 1. build the declared key from the JWK's algebraic parameters,
//! 2. base64-decode the `x5c` chain; require at least two certificates
//!    (the PSP publishes its anchor alongside, diverging from the usual
//!    RFC 7515 §4.7 reading where the root is omitted),
//! 3. validate the certification path with the last entry as anchor,
//! 4. bind the leaf: SHA-1 thumbprint equals `x5t`, subject CN or SAN
//!    dNSName equals the `jku` authority,
//! 5. require the declared key to equal the leaf certificate's key,
//! 6. only then install the batch under the `jku`.

mod chain;

pub use chain::{thumbprint_sha1, LeafCertificate};

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{PixError, Result};
use crate::jws::header::JwsHeader;
use crate::jws::jwks::Jwk;
use crate::jws::verify::DeclaredKey;

/// A key that passed the full trust pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedKey {
    /// The declared public key; this is what signatures verify against.
    pub jwk: DeclaredKey,
    /// The leaf certificate the key was bound to.
    pub certificate: LeafCertificate,
    /// The raw JWKS record the key came from.
    pub raw: Jwk,
}

type InnerMap = HashMap<(String, String), Arc<ValidatedKey>>;

static GLOBAL: LazyLock<KeyStore> = LazyLock::new(KeyStore::new);

/// Process-wide cache of validated keys, keyed by `jku`.
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    inner: Arc<RwLock<HashMap<String, Arc<InnerMap>>>>,
}

impl KeyStore {
    /// Creates an empty, independent store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used by
    /// [`load_pix`](crate::loader::load_pix).
    #[must_use]
    pub fn global() -> &'static KeyStore {
        &GLOBAL
    }

    /// Looks up the key a JWS header points at, by
    /// `(jku, x5t, kid)`.
    #[must_use]
    pub fn lookup(&self, header: &JwsHeader) -> Option<Arc<ValidatedKey>> {
        let snapshot = {
            let guard = self.inner.read().ok()?;
            guard.get(header.jku.as_str()).cloned()
        };
        snapshot?.get(&(header.x5t.clone(), header.kid.clone())).cloned()
    }

    /// Number of `jku` entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// True when no `jku` has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the trust pipeline over a validated JWKS and installs the batch
    /// under `jku`.
    ///
    /// All-or-nothing: the first key that fails any step aborts the whole
    /// batch and the previous entry for `jku` (if any) stays in place. On
    /// success the new batch atomically replaces it.
    ///
    /// # Errors
    ///
    /// Any of the key/trust errors documented on
    /// [`PixError`](crate::PixError).
    #[instrument(skip(self, keys), fields(jku = %jku, keys = keys.len()))]
    pub fn process_keys(&self, keys: &[Jwk], jku: &Url) -> Result<()> {
        let mut batch = InnerMap::with_capacity(keys.len());
        for jwk in keys {
            let validated = validate_key(jwk, jku).map_err(|error| {
                warn!(kid = %jwk.kid, %error, "JWKS key failed the trust pipeline");
                error
            })?;
            batch.insert((jwk.x5t.clone(), jwk.kid.clone()), Arc::new(validated));
        }

        debug!(keys = batch.len(), "installing validated key batch");
        let batch = Arc::new(batch);
        let mut guard = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(jku.as_str().to_owned(), batch);
        Ok(())
    }
}

/// The per-key trust pipeline, steps 1–5.
fn validate_key(jwk: &Jwk, jku: &Url) -> Result<ValidatedKey> {
    let declared = DeclaredKey::from_jwk(jwk)?;

    let chain = chain::decode_x5c(&jwk.x5c)?;
    chain::validate_path(&chain)?;

    let leaf_der = chain.first().ok_or(PixError::X5cMustHaveMoreThanOneCert)?;
    let certificate = chain::check_leaf(leaf_der, &jwk.x5t, jku)?;

    let chain_key = chain::leaf_public_key(leaf_der)?;
    if declared != chain_key {
        return Err(PixError::KeyFromLeafCertificateDiffer);
    }

    Ok(ValidatedKey { jwk: declared, certificate, raw: jwk.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::algorithm::JwsAlgorithm;

    fn header(jku: &str, x5t: &str, kid: &str) -> JwsHeader {
        JwsHeader {
            alg: JwsAlgorithm::RS256,
            jku: Url::parse(jku).unwrap(),
            kid: kid.to_owned(),
            x5t: x5t.to_owned(),
        }
    }

    #[test]
    fn test_lookup_on_empty_store() {
        let store = KeyStore::new();
        assert!(store.is_empty());
        assert!(store
            .lookup(&header("https://psp.br/certs", "thumb", "kid"))
            .is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = KeyStore::new();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.inner, &clone.inner));
    }

    #[test]
    fn test_failed_batch_leaves_store_untouched() {
        let store = KeyStore::new();
        let jku = Url::parse("https://psp.br/certs").unwrap();
        // A key whose x5c is not even base64 fails at step 2.
        let jwk = Jwk {
            kty: "RSA".to_owned(),
            kid: "kid".to_owned(),
            x5t: "thumb".to_owned(),
            x5c: vec!["!!".to_owned(), "!!".to_owned()],
            key_ops: vec!["verify".to_owned()],
            use_: None,
            alg: None,
            x5t_s256: None,
            x5u: None,
            n: Some("AQAB".to_owned()),
            e: Some("AQAB".to_owned()),
            crv: None,
            x: None,
            y: None,
        };
        assert!(matches!(
            store.process_keys(&[jwk], &jku),
            Err(PixError::InvalidCertEncoding)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_global_store_is_shared() {
        assert!(Arc::ptr_eq(
            &KeyStore::global().inner,
            &KeyStore::global().inner
        ));
    }
}
