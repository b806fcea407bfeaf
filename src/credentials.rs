// This project was developed with assistance from GitHub Copilot
// Resolves the token subject from Basic-Auth or a JSON login body

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::AUTHORIZATION,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::error::JwksError;

/// Where the subject came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    BasicAuth,
    JsonBody,
}

/// Normalized caller identity handed to the token issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub value: String,
    pub source: CredentialSource,
}

/// JSON login body. Only the username is read; any password is ignored.
#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    username: String,
}

/// Username and password from an `Authorization` header using the Basic
/// scheme. The scheme name is matched case-insensitively.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim_start()).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (username, password) = pair.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}

fn subject_from_body(body: &[u8]) -> Result<Subject, JwksError> {
    let login: LoginBody = serde_json::from_slice(body)
        .map_err(|_| JwksError::Input("Invalid authentication method!".to_string()))?;

    if login.username.is_empty() {
        return Err(JwksError::Input("missing username".to_string()));
    }

    Ok(Subject {
        value: login.username,
        source: CredentialSource::JsonBody,
    })
}

impl<S> FromRequest<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = JwksError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Basic-Auth wins; a malformed or empty header falls back to the body
        let basic_username = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic_auth)
            .map(|(username, _)| username)
            .filter(|username| !username.is_empty());

        if let Some(username) = basic_username {
            return Ok(Subject {
                value: username,
                source: CredentialSource::BasicAuth,
            });
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| JwksError::Input(e.body_text()))?;
        subject_from_body(&body)
    }
}
