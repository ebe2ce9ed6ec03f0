use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::session::{self, SESSION_COOKIE};
use crate::error::AppError;
use crate::state::SharedState;

/// The authenticated household for a request. Resolved from the session
/// cookie, with a bearer-header fallback for the narrow window right
/// after OTP verification where some mobile web clients have not yet
/// committed the cookie.
#[derive(Debug, Clone)]
pub struct AuthHousehold {
    pub household_id: Uuid,
}

impl FromRequestParts<SharedState> for AuthHousehold {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let mut token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

        if token.is_none() {
            if let Some(header) = parts.headers.get("authorization") {
                if let Ok(value) = header.to_str() {
                    if let Some(bearer) = value.strip_prefix("Bearer ") {
                        token = Some(bearer.trim().to_string());
                    }
                }
            }
        }

        let Some(token) = token else {
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        };

        // Any decode failure is treated as "no session", not distinguished.
        let claims = session::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))?;

        Ok(AuthHousehold {
            household_id: claims.hid,
        })
    }
}
