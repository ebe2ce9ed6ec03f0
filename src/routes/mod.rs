pub mod admin;
pub mod auth;
pub mod checkins;
pub mod family;
pub mod households;
pub mod members;

use std::net::IpAddr;

use axum::Json;
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        // Auth & households (v1)
        .route("/v1/auth/session", get(auth::session_probe))
        .route("/v1/auth/reconcile-session", post(auth::reconcile_session))
        .route("/v1/auth/start", post(auth::start))
        .route("/v1/auth/start-account", post(auth::start_account))
        .route("/v1/auth/login-account", post(auth::login_account))
        .route("/v1/auth/verify", post(auth::verify))
        .route("/v1/auth/logout", post(auth::logout))
        .route("/v1/households/me", get(households::me))
        .route("/v1/households/members", post(households::create_member))
        .route(
            "/v1/households/attach-member",
            post(households::attach_member),
        )
        // Check-in
        .route("/checkin", post(checkins::checkin_by_email))
        .route("/checkin/by-name", post(checkins::checkin_by_name))
        .route("/checkin-by-barcode", post(checkins::checkin_by_barcode))
        // Members
        .route("/member", post(members::create))
        .route("/member/register-only", post(members::register_only))
        .route("/member/lookup-by-name", post(members::lookup_by_name))
        .route(
            "/member/lookup-by-barcode/{barcode}",
            get(members::lookup_by_barcode),
        )
        .route(
            "/member/{key}",
            get(members::get_by_email)
                .put(members::update)
                .delete(members::hard_delete),
        )
        .route("/member/{key}/stats", get(members::stats))
        .route("/member/{key}/restore", post(members::restore))
        .route("/member/{key}/soft", delete(members::soft_delete))
        .route("/members", get(members::list))
        // Family
        .route("/family/register", post(family::register))
        .route("/family/members/{email}", get(family::members))
        .route("/family/checkin", post(family::checkin))
        .route(
            "/family/checkin-status/{email}",
            get(family::checkin_status),
        )
        .route("/family/add-members", post(family::add_members))
        .route("/family/{email}", delete(family::delete_family))
        // Admin & reporting
        .route("/admin/checkins/today", get(admin::today))
        .route("/admin/checkins/range", get(admin::range))
        .route("/admin/checkins/stats", get(admin::stats))
        .route("/admin/checkin/member", post(admin::checkin_member))
        .route("/admin/checkin/{checkin_id}", delete(admin::delete_checkin))
        .route(
            "/admin/household/{account_code}",
            get(admin::household_by_code),
        )
        .route("/health", get(health))
}

/// Per-IP fixed-window limit for an endpoint class; 429 with a retry hint
/// when exceeded.
pub(crate) fn enforce_rate_limit(
    state: &SharedState,
    class: &'static str,
    ip: IpAddr,
    limit: u32,
    window_secs: u64,
) -> Result<(), AppError> {
    state
        .api_limiter
        .check(class, ip, limit, window_secs)
        .map_err(|retry_after| {
            AppError::RateLimited(format!(
                "Too many requests. Please wait {retry_after} seconds before retrying."
            ))
        })
}

async fn health(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
