// This project was developed with assistance from GitHub Copilot
// Data structures for the JWKS server

use std::fmt;

use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

/// RSA signing key as persisted in the `keys` table
#[derive(Clone)]
pub struct SigningKey {
    pub kid: i64,                   // Key ID (AUTOINCREMENT row id)
    pub private_key: RsaPrivateKey, // RSA private key
    pub expires_at: DateTime<Utc>,  // Expiry timestamp
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Which side of its expiry a key is looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Expired,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Valid => f.write_str("valid"),
            Validity::Expired => f.write_str("expired"),
        }
    }
}

/// JSON Web Key structure for JWKS response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String, // Key type (RSA)
    pub kid: String, // Key ID
    #[serde(rename = "use")]
    pub key_use: String, // Key usage (sig for signature)
    pub alg: String, // Algorithm (RS256)
    pub n: String,   // Modulus (base64url)
    pub e: String,   // Exponent (base64url)
}

/// JWKS response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JsonWebKey>,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String, // Issuer
    pub sub: String, // Subject
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expires at
}

/// Auth endpoint response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Query parameters for auth endpoint
#[derive(Debug, Default)]
pub struct AuthQuery {
    pub expired: Option<String>,
}

impl AuthQuery {
    /// Build from raw query pairs. A repeated `expired` keeps its first value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let expired = pairs
            .iter()
            .find(|(name, _)| name == "expired")
            .map(|(_, value)| value.clone());
        AuthQuery { expired }
    }

    /// Interprets `expired` the way Go's `strconv.ParseBool` does; anything
    /// unrecognised counts as false.
    pub fn wants_expired(&self) -> bool {
        matches!(
            self.expired.as_deref(),
            Some("1" | "t" | "T" | "true" | "TRUE" | "True")
        )
    }
}
