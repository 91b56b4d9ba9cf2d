//! End-to-end dynamic PIX loading against canned PSP endpoints.
//!
//! Each test mints a certificate chain, publishes a JWKS for it, signs the
//! payment document and drives `load_pix_with_store` through a canned HTTP
//! client — exercising the full trust pipeline with no network.

mod common;

use serde_json::json;

use common::{assert_err, ec_chain, rsa_chain, valid_payment, StaticClient};
use pix_brcode::keystore::KeyStore;
use pix_brcode::{load_pix_with_store, JwsHeader, PixError};

const PAYMENT_URL: &str = "https://somepixpsp.br/pix/v2/11111111-1111-1111-1111-111111111111";
const JKU: &str = "https://somepixpsp.br/pix/v2/certs";
const KID: &str = "key-1";

#[tokio::test]
async fn test_rs256_happy_path_populates_store() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token.clone())
        .route(JKU, 200, chain.jwks(KID).to_string());
    let store = KeyStore::new();

    let payment = load_pix_with_store(&client, &store, PAYMENT_URL).await.unwrap();

    assert_eq!(payment.chave, "123e4567-e12b-12d1-a456-426655440000");
    assert_eq!(payment.valor.original.to_string(), "123.45");
    assert!(payment.info_adicionais.is_empty());

    // The key is cached under (jku, x5t, kid) and bound to the leaf's
    // SHA-1 thumbprint.
    let header = JwsHeader::from_compact(&token).unwrap();
    let cached = store.lookup(&header).expect("key must be cached after a load");
    assert_eq!(cached.certificate.thumbprint, chain.x5t());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_second_load_skips_the_jwks_fetch() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let mut client = StaticClient::new()
        .route(PAYMENT_URL, 200, token.clone())
        .route(JKU, 200, chain.jwks(KID).to_string());
    let store = KeyStore::new();

    load_pix_with_store(&client, &store, PAYMENT_URL).await.unwrap();

    // With the JWKS route gone, only the cache can satisfy the second load.
    client.remove(JKU);
    let payment = load_pix_with_store(&client, &store, PAYMENT_URL).await.unwrap();
    assert_eq!(payment.txid, "fc9a4366ff1d2bdb8e3bbc4fec12fd06");
}

#[tokio::test]
async fn test_es256_happy_path() {
    let chain = ec_chain("somepixpsp.br");
    let token = chain.sign_es256(
        &json!({ "alg": "ES256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    let payment = load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL)
        .await
        .unwrap();
    assert_eq!(payment.valor.original.to_string(), "123.45");
}

#[tokio::test]
async fn test_algorithm_mismatch_for_rsa_key() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    // Header claims ES256 while the JWKS key is RSA.
    let token = chain.sign_rs256(
        &json!({ "alg": "ES256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::InvalidTokenSigningAlgorithm,
    );
}

#[tokio::test]
async fn test_tampered_payload_fails_signature() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    // Swap the payload for a differently-priced one, keeping the signature.
    let mut tampered_payment = valid_payment();
    tampered_payment["valor"] = json!({ "original": "0.01" });
    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        serde_json::to_vec(&tampered_payment).unwrap(),
    );
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, forged)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::SignatureInvalid,
    );
}

#[tokio::test]
async fn test_expired_certificate() {
    let chain = rsa_chain("somepixpsp.br", 2019, 2020);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::CertificateExpired,
    );
}

#[tokio::test]
async fn test_not_yet_valid_certificate() {
    let chain = rsa_chain("somepixpsp.br", 2045, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::CertificateNotYetValid,
    );
}

#[tokio::test]
async fn test_certificate_host_binding() {
    // The leaf names a different host than the jku authority.
    let chain = rsa_chain("otherpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::CertificateSubjectAndJkuUriAuthorityDiffers,
    );
}

#[tokio::test]
async fn test_thumbprint_binding() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let bogus_x5t = "AAAAAAAAAAAAAAAAAAAAAAAAAAA";
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": bogus_x5t }),
        &valid_payment(),
    );
    let mut jwks = chain.jwks(KID);
    jwks["keys"][0]["x5t"] = json!(bogus_x5t);
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, jwks.to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::KeyThumbprintAndLeafCertificateDiffer,
    );
}

#[tokio::test]
async fn test_declared_key_must_match_chain_key() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    // Declare the CA's key while chaining the leaf certificate.
    let other_key = {
        use rsa::pkcs8::DecodePrivateKey as _;
        rsa::RsaPrivateKey::from_pkcs8_pem(common::CA_KEY_PEM).unwrap()
    };
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks_with(KID, &other_key.to_public_key()).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::KeyFromLeafCertificateDiffer,
    );
}

#[tokio::test]
async fn test_kid_missing_from_jwks() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": "unknown-kid", "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::KeyNotFoundInJku,
    );
}

#[tokio::test]
async fn test_lone_leaf_chain_is_rejected() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let mut jwks = chain.jwks(KID);
    let leaf_only = jwks["keys"][0]["x5c"][0].clone();
    jwks["keys"][0]["x5c"] = json!([leaf_only]);
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, jwks.to_string());

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::X5cMustHaveMoreThanOneCert,
    );
}

#[tokio::test]
async fn test_payment_endpoint_error_status() {
    let client = StaticClient::new().route(PAYMENT_URL, 500, "boom");
    match load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await {
        Err(PixError::HttpStatusNotSuccess(500)) => {}
        other => panic!("expected HttpStatusNotSuccess(500), got {other:?}"),
    }
}

#[tokio::test]
async fn test_jwks_endpoint_error_status() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new().route(PAYMENT_URL, 200, token);

    // The JKU route answers 404.
    match load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await {
        Err(PixError::HttpStatusNotSuccess(404)) => {}
        other => panic!("expected HttpStatusNotSuccess(404), got {other:?}"),
    }
}

#[tokio::test]
async fn test_jwks_body_must_be_an_object() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, "[1, 2, 3]");

    assert_err(
        load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await,
        &PixError::InvalidJwksContents,
    );
}

#[tokio::test]
async fn test_hmac_token_is_rejected_before_any_key_fetch() {
    let header = base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        serde_json::to_vec(&json!({
            "alg": "HS256", "jku": JKU, "kid": KID, "x5t": "thumb"
        }))
        .unwrap(),
    );
    let token = format!("{header}.e30.c2ln");
    // No JWKS route on purpose: header validation must fail first.
    let client = StaticClient::new().route(PAYMENT_URL, 200, token);

    match load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await {
        Err(PixError::Validation(errors)) => assert!(errors.get("alg").is_some()),
        other => panic!("expected a header validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_payment_payload_is_a_validation_error() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let mut payment = valid_payment();
    payment["txid"] = json!("short");
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &payment,
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token)
        .route(JKU, 200, chain.jwks(KID).to_string());

    match load_pix_with_store(&client, &KeyStore::new(), PAYMENT_URL).await {
        Err(PixError::Validation(errors)) => assert!(errors.get("txid").is_some()),
        other => panic!("expected a payment validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_keys() {
    let chain = rsa_chain("somepixpsp.br", 2020, 2049);
    let token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": KID, "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let client = StaticClient::new()
        .route(PAYMENT_URL, 200, token.clone())
        .route(JKU, 200, chain.jwks(KID).to_string());
    let store = KeyStore::new();
    load_pix_with_store(&client, &store, PAYMENT_URL).await.unwrap();

    // A second token pointing at a key the (now broken) JWKS cannot supply
    // fails, but the previously validated key stays cached.
    let other_token = chain.sign_rs256(
        &json!({ "alg": "RS256", "jku": JKU, "kid": "rotated", "x5t": chain.x5t() }),
        &valid_payment(),
    );
    let broken = StaticClient::new()
        .route(PAYMENT_URL, 200, other_token)
        .route(JKU, 200, "not json");
    assert!(load_pix_with_store(&broken, &store, PAYMENT_URL).await.is_err());

    let header = JwsHeader::from_compact(&token).unwrap();
    assert!(store.lookup(&header).is_some(), "original key must survive");
}
