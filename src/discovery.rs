// This project was developed with assistance from GitHub Copilot
// JWKS document rendering from the valid keys in the store

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rsa::traits::PublicKeyParts;

use crate::db::KeyStore;
use crate::error::Result;
use crate::types::{JsonWebKey, JwksResponse, SigningKey};

impl JsonWebKey {
    /// Public half of a stored key. Private material never leaves this function.
    pub fn from_signing_key(key: &SigningKey) -> Self {
        let public_key = key.public_key();

        let n_bytes = public_key.n().to_bytes_be();
        let e_bytes = public_key.e().to_bytes_be();

        JsonWebKey {
            kty: "RSA".to_string(),
            kid: key.kid_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(&n_bytes),
            e: URL_SAFE_NO_PAD.encode(&e_bytes),
        }
    }
}

/// Build the JWKS document from every currently valid key.
pub fn publish(store: &KeyStore) -> Result<JwksResponse> {
    publish_at(store, Utc::now())
}

pub fn publish_at(store: &KeyStore, now: DateTime<Utc>) -> Result<JwksResponse> {
    let keys: Vec<JsonWebKey> = store
        .find_all_valid_at(now)?
        .iter()
        .map(JsonWebKey::from_signing_key)
        .collect();

    tracing::debug!(count = keys.len(), "published JWKS");
    Ok(JwksResponse { keys })
}
