//! JWT request signing for the BadgeKit API.
//!
//! BadgeKit authenticates every request with an HS256 JSON Web Token sent as
//! `Authorization: JWT token="<jwt>"`. The token binds the request method
//! and path (query string included) and, for requests with a body, a SHA-256
//! hash of that body.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::http::HttpMethod;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret and key name used to sign requests.
///
/// The secret is the one configured on the BadgeKit API server for this
/// client; `key` tells the server which secret to verify against.
#[derive(Clone)]
pub struct Credentials {
    secret: String,
    key: String,
    ttl: Duration,
}

impl Credentials {
    pub const DEFAULT_KEY: &'static str = "master";
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            key: Self::DEFAULT_KEY.to_string(),
            ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Lifetime of each token, counted from the moment it is signed.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Builds the claims for one request, signed at `now`.
    pub fn claims(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        now: SystemTime,
    ) -> Claims {
        let issued = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        Claims {
            key: self.key.clone(),
            exp: (issued + self.ttl).as_secs(),
            method: method.as_str().to_string(),
            path: path.to_string(),
            body: body.map(BodyHash::of),
        }
    }

    /// Value of the `Authorization` header for one request.
    pub fn authorization(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        now: SystemTime,
    ) -> Result<String, ApiError> {
        let token = sign(&self.claims(method, path, body, now), &self.secret)?;
        Ok(format!("JWT token=\"{token}\""))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret", &"<redacted>")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Claims carried by a BadgeKit request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub key: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyHash {
    pub alg: String,
    pub hash: String,
}

impl BodyHash {
    pub fn of(body: &str) -> Self {
        Self {
            alg: "sha256".to_string(),
            hash: format!("{:x}", Sha256::digest(body.as_bytes())),
        }
    }
}

#[derive(Serialize)]
struct Header {
    typ: &'static str,
    alg: &'static str,
}

/// Encodes and signs `claims` as a compact HS256 JWT.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    let header = serde_json::to_vec(&Header {
        typ: "JWT",
        alg: "HS256",
    })
    .map_err(|e| ApiError::Encode(e.to_string()))?;
    let payload = serde_json::to_vec(claims).map_err(|e| ApiError::Encode(e.to_string()))?;

    let signing_input = format!("{}.{}", BASE64URL.encode(header), BASE64URL.encode(payload));
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Encode(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{signing_input}.{}", BASE64URL.encode(signature)))
}
