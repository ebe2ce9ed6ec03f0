use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gh_session";
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Session claims: the household identity, issue time, and a 30-day
/// expiry derived from it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub hid: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(household_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            hid: household_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_MAX_AGE_DAYS)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("session encode failed: {e}"))
}

/// Decode and signature-check a session token. Any failure — malformed,
/// bad signature, past the 30-day lifetime — is a plain `Err`; callers
/// treat all of them as "no session".
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("session decode failed: {e}"))
}
