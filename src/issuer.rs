// This project was developed with assistance from GitHub Copilot
// JWT issuance with valid or deliberately expired keys

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rsa::pkcs1::EncodeRsaPrivateKey;

use crate::db::KeyStore;
use crate::error::{JwksError, Result};
use crate::types::{Claims, SigningKey};

pub const DEFAULT_ISSUER: &str = "jwks-server";
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Issues RS256 tokens signed by a key selected from the store.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    issuer: String,
    lifetime: Duration,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        TokenIssuer::new(DEFAULT_ISSUER, Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
    }
}

impl TokenIssuer {
    pub fn new(issuer: impl Into<String>, lifetime: Duration) -> Self {
        TokenIssuer {
            issuer: issuer.into(),
            lifetime,
        }
    }

    pub fn issue(&self, store: &KeyStore, subject: &str, use_expired_key: bool) -> Result<String> {
        self.issue_at(store, subject, use_expired_key, Utc::now())
    }

    /// The token's `exp` is always `now + lifetime`, even when the signing key
    /// itself has already expired.
    pub fn issue_at(
        &self,
        store: &KeyStore,
        subject: &str,
        use_expired_key: bool,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let key = if use_expired_key {
            store.find_expired_at(now)?
        } else {
            store.find_valid_at(now)?
        };

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        let token = sign(&key, &claims)?;
        tracing::info!(
            kid = key.kid,
            expired_key = use_expired_key,
            sub = subject,
            "issued token"
        );
        Ok(token)
    }
}

fn sign(key: &SigningKey, claims: &Claims) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid_string());

    let der = key
        .private_key
        .to_pkcs1_der()
        .map_err(|e| JwksError::Signing(e.to_string()))?;
    let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

    encode(&header, claims, &encoding_key).map_err(|e| JwksError::Signing(e.to_string()))
}
