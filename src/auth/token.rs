use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use model::entities::user::Role;

use crate::error::AuthFailure;

/// Claims embedded in an issued token.
///
/// The role is a cached copy of the stored role at issuance time. It is
/// never trusted on its own: the auth middleware re-checks it against
/// the live user record on every request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id, as a string per JWT convention
    pub sub: String,
    /// Role at issuance time
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Mints and validates the signed, time-limited credentials asserting a
/// user's identity and role. One server-held secret; no per-user keys
/// and no refresh mechanism - expiry requires a fresh login.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token for the given user and role.
    pub fn issue(&self, user_id: i32, role: Role) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verifies signature, shape and expiry, returning the embedded
    /// claims. Verification is idempotent: the same invalid token fails
    /// the same way every time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                    AuthFailure::MalformedToken
                }
                _ => AuthFailure::InvalidToken,
            })
    }
}
