use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::http::header::{CACHE_CONTROL, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthHousehold;
use crate::auth::otp::{hash_token, is_valid_account_code, mask_email};
use crate::auth::session::{Claims, SESSION_COOKIE, SESSION_MAX_AGE_DAYS, encode_token};
use crate::codes;
use crate::db;
use crate::error::AppError;
use crate::models::Household;
use crate::routes::enforce_rate_limit;
use crate::state::SharedState;

const OTP_TTL_HOURS: i64 = 24;

#[derive(Deserialize)]
pub struct StartAuthBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct StartAccountBody {
    #[serde(rename = "accountNumber")]
    pub account_number: String,
}

#[derive(Deserialize)]
pub struct VerifyBody {
    #[serde(rename = "pendingId")]
    pub pending_id: String,
    pub code: String,
}

fn no_store() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers
}

fn session_jar(state: &SharedState, token: &str) -> CookieJar {
    let production = state.config.is_production();
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        // Cross-site attributes are relaxed in production so the session
        // survives installed mobile web apps served from another origin.
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .max_age(time::Duration::days(SESSION_MAX_AGE_DAYS))
        .build();
    CookieJar::new().add(cookie)
}

fn clear_session_jar() -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(cookie)
}

fn member_summaries(members: &[crate::models::Member]) -> Vec<Value> {
    members
        .iter()
        .map(|m| json!({ "id": m.id, "name": m.name }))
        .collect()
}

/// Session payload shared by verify and account login: cookie plus an
/// echoed `session_token` for clients that have not committed the cookie
/// yet.
async fn session_response(
    state: &SharedState,
    household: &Household,
) -> Result<(CookieJar, HeaderMap, Json<Value>), AppError> {
    let token = encode_token(&Claims::new(household.id), &state.config.jwt_secret)
        .map_err(AppError::Internal)?;

    let members = db::members::list_by_household(&state.pool, household.id).await?;

    Ok((
        session_jar(state, &token),
        no_store(),
        Json(json!({
            "ok": true,
            "session_token": token,
            "householdId": household.id,
            "ownerEmail": household.owner_email,
            "members": member_summaries(&members),
            "householdCode": household.household_code,
        })),
    ))
}

async fn issue_otp(
    state: &SharedState,
    household: &Household,
) -> Result<Json<Value>, AppError> {
    let code = codes::generate_otp();
    let expires_at = Utc::now() + Duration::hours(OTP_TTL_HOURS);
    db::households::set_pending_verification(
        &state.pool,
        household.id,
        &hash_token(&code),
        expires_at,
    )
    .await?;

    state
        .mailer
        .send_verification_code(household.owner_email.clone(), code);

    Ok(Json(json!({
        "pendingId": household.id,
        "to": mask_email(&household.owner_email),
    })))
}

/// Begin OTP verification for an email, creating the household on first
/// contact.
pub async fn start(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<StartAuthBody>,
) -> Result<Json<Value>, AppError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }

    let existing = db::households::find_by_owner_email(&state.pool, &email).await?;
    if let Some(existing) = &existing {
        if existing.email_verified_at.is_some() {
            return Err(AppError::Conflict(
                "An account with this email already exists. Please sign in instead."
                    .to_string(),
            ));
        }
        // Unverified household: let the owner retry verification.
    }

    if !state.otp_limiter.check(&format!("{}:{email}", addr.ip())) {
        return Err(AppError::RateLimited(
            "Too many requests. Please wait before retrying.".to_string(),
        ));
    }

    let household = match existing {
        Some(h) => h,
        None => {
            let code = codes::allocate_household_code(&state.pool).await?;
            db::households::create(&state.pool, &email, &code).await?
        }
    };

    issue_otp(&state, &household).await
}

/// Begin OTP verification from an account code. A uniform success-shaped
/// body is returned for unknown codes so account numbers cannot be
/// enumerated.
pub async fn start_account(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<StartAccountBody>,
) -> Result<Json<Value>, AppError> {
    let account_number = body.account_number.trim().to_uppercase();
    if !is_valid_account_code(&account_number) {
        return Err(AppError::UnprocessableEntity(
            "Account number must be exactly 5 characters from A-Z and 2-9".to_string(),
        ));
    }

    let Some(household) = db::households::find_by_code(&state.pool, &account_number).await?
    else {
        return Ok(Json(json!({
            "message": "If an account exists with this number, a verification code will be sent to the registered email."
        })));
    };

    if !state
        .otp_limiter
        .check(&format!("{}:{account_number}", addr.ip()))
    {
        return Err(AppError::RateLimited(
            "Too many requests. Please wait before retrying.".to_string(),
        ));
    }

    issue_otp(&state, &household).await
}

/// Direct account-code login without an OTP round trip. A deliberately
/// lower-friction path for front-desk use.
pub async fn login_account(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<StartAccountBody>,
) -> Result<(CookieJar, HeaderMap, Json<Value>), AppError> {
    enforce_rate_limit(&state, "login-account", addr.ip(), 10, 60)?;

    let account_number = body.account_number.trim().to_uppercase();
    if !is_valid_account_code(&account_number) {
        return Err(AppError::UnprocessableEntity(
            "Account number must be exactly 5 characters from A-Z and 2-9".to_string(),
        ));
    }

    let household = db::households::find_by_code(&state.pool, &account_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    tracing::info!(household_id = %household.id, "account-code login");
    session_response(&state, &household).await
}

pub async fn verify(
    State(state): State<SharedState>,
    Json(body): Json<VerifyBody>,
) -> Result<(CookieJar, HeaderMap, Json<Value>), AppError> {
    let pending_id: Uuid = body
        .pending_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid pendingId".to_string()))?;

    let household = db::households::find_by_id(&state.pool, pending_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let Some((expected_hash, expires_at)) = household.pending_verification() else {
        return Err(AppError::BadRequest("No pending verification".to_string()));
    };
    if Utc::now() > expires_at {
        return Err(AppError::BadRequest("Code expired".to_string()));
    }
    if hash_token(body.code.trim()) != expected_hash {
        return Err(AppError::Unauthorized("Invalid code".to_string()));
    }

    db::households::mark_verified(&state.pool, household.id).await?;
    tracing::info!(household_id = %household.id, "email verified");

    session_response(&state, &household).await
}

pub async fn logout() -> (CookieJar, Json<Value>) {
    (
        clear_session_jar(),
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// Lightweight session probe for app bootstrap.
pub async fn session_probe(
    auth: AuthHousehold,
    State(state): State<SharedState>,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let household = db::households::find_by_id(&state.pool, auth.household_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    Ok((
        no_store(),
        Json(json!({
            "ok": true,
            "householdId": household.id,
            "email": household.owner_email,
        })),
    ))
}

/// Authoritative household snapshot so clients can reconcile any stale
/// local session data.
pub async fn reconcile_session(
    auth: AuthHousehold,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let household = db::households::find_by_id(&state.pool, auth.household_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let members = db::members::list_by_household(&state.pool, household.id).await?;

    Ok(Json(json!({
        "householdId": household.id,
        "ownerEmail": household.owner_email,
        "householdCode": household.household_code,
        "members": members
            .iter()
            .map(|m| json!({ "id": m.id, "name": m.name, "email": m.email }))
            .collect::<Vec<_>>(),
        "timestamp": Utc::now(),
    })))
}
