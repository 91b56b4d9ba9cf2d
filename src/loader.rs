//! Dynamic PIX loading: fetch, trust and verify a signed payment document.
//!
//! [`load_pix`] drives the whole pipeline for a dynamic BR Code URL:
//!
//! 1. GET the payment URL; the body is a compact JWS.
//! 2. Peek the protected header (no verification yet) and validate it.
//! 3. Resolve the signing key in the [`KeyStore`] by `(jku, x5t, kid)`.
//!    On a miss, GET the `jku`, validate the JWKS, run
//!    [`KeyStore::process_keys`] and look up again.
//! 4. Check the leaf certificate's validity window (inclusive, UTC).
//! 5. Check the header algorithm against the key type; the verifier is
//!    built from the header's `alg`, never inferred from the key.
//! 6. Verify the signature.
//! 7. Cast the payload into a [`PixPayment`].
//!
//! Every step short-circuits. A JWKS that fails validation never touches
//! the store, so a broken refresh cannot evict previously trusted keys.
//!
//! The HTTP side lives behind [`PixHttpClient`], a two-method view of a GET
//! (status + body). [`reqwest::Client`] implements it for production;
//! tests substitute a canned client. Timeouts and connection pooling
//! belong to the client, not to this module.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::{PixError, Result};
use crate::jws::{self, CompactJws, JwsHeader};
use crate::keystore::KeyStore;
use crate::payment::PixPayment;

/// Timeout for HTTP requests to PSPs in seconds.
///
/// Long enough for a PSP to assemble and sign the payment document, short
/// enough that a wallet UI is not left hanging.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A minimal HTTP GET: status code plus raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for statuses in `200..300`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP capability the loader needs: a GET returning status and body.
///
/// Transport-level failures map to [`PixError::Http`]; non-2xx responses
/// are returned as values and classified by the loader.
pub trait PixHttpClient: Send + Sync {
    /// Performs a GET against `url`.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl PixHttpClient for reqwest::Client {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = reqwest::Client::get(self, url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Creates a `reqwest` client tuned for PSP traffic.
///
/// Configuration: 30-second total timeout, 10-second connect timeout,
/// connection pooling per host.
///
/// # Errors
///
/// Returns [`PixError::Http`] if client configuration fails.
pub fn create_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(PixError::Http)
}

/// Loads and verifies a dynamic PIX payment using the process-wide key
/// store.
///
/// # Errors
///
/// See [`load_pix_with_store`].
pub async fn load_pix<C: PixHttpClient>(client: &C, url: &str) -> Result<PixPayment> {
    load_pix_with_store(client, KeyStore::global(), url).await
}

/// Loads and verifies a dynamic PIX payment against a specific key store.
///
/// # Errors
///
/// - [`PixError::Http`] / [`PixError::HttpStatusNotSuccess`] from either GET
/// - [`PixError::MalformedJws`] / [`PixError::Validation`] for a broken
///   token or header
/// - [`PixError::InvalidJwksContents`] and the key/trust errors from
///   [`KeyStore::process_keys`] on a cache miss
/// - [`PixError::CertificateNotYetValid`] / [`PixError::CertificateExpired`]
///   outside the leaf validity window
/// - [`PixError::InvalidTokenSigningAlgorithm`] for an algorithm/key
///   mismatch, [`PixError::SignatureInvalid`] for a bad signature
/// - [`PixError::Validation`] for a payload that is not a valid payment
#[instrument(skip(client, store))]
pub async fn load_pix_with_store<C: PixHttpClient>(
    client: &C,
    store: &KeyStore,
    url: &str,
) -> Result<PixPayment> {
    let response = client.get(url).await?;
    if !response.is_success() {
        return Err(PixError::HttpStatusNotSuccess(response.status));
    }
    let token = String::from_utf8(response.body).map_err(|_| PixError::MalformedJws)?;
    let token = token.trim().to_owned();

    let header = JwsHeader::from_compact(&token)?;

    let key = match store.lookup(&header) {
        Some(key) => {
            debug!(jku = %header.jku, kid = %header.kid, "validated key found in store");
            key
        }
        None => {
            info!(jku = %header.jku, "key not cached, fetching JWKS");
            fetch_and_process_jwks(client, store, &header).await?;
            store.lookup(&header).ok_or(PixError::KeyNotFoundInJku)?
        }
    };

    let now = Utc::now();
    if now < key.certificate.not_before {
        return Err(PixError::CertificateNotYetValid);
    }
    if now > key.certificate.not_after {
        return Err(PixError::CertificateExpired);
    }

    if !key.jwk.permits(header.alg) {
        warn!(alg = %header.alg, "header algorithm does not match key type");
        return Err(PixError::InvalidTokenSigningAlgorithm);
    }

    let compact = CompactJws::split(&token)?;
    let signature = compact.signature()?;
    jws::verify::verify(compact.signing_input().as_bytes(), &signature, header.alg, &key.jwk)?;

    PixPayment::cast(&compact.payload_value()?)
}

/// Cache-miss path: fetch the JWKS named by the header and install it.
async fn fetch_and_process_jwks<C: PixHttpClient>(
    client: &C,
    store: &KeyStore,
    header: &JwsHeader,
) -> Result<()> {
    let response = client.get(header.jku.as_str()).await?;
    if !response.is_success() {
        return Err(PixError::HttpStatusNotSuccess(response.status));
    }
    let value: serde_json::Value =
        serde_json::from_slice(&response.body).map_err(|_| PixError::InvalidJwksContents)?;
    if !value.is_object() {
        return Err(PixError::InvalidJwksContents);
    }
    let jwks = jws::Jwks::cast(&value)?;
    debug!(jku = %header.jku, keys = jwks.keys.len(), "jwks_refresh");
    store.process_keys(&jwks.keys, &header.jku)
}
