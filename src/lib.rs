pub mod auth;
pub mod checkin;
pub mod codes;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod names;
pub mod period;
pub mod rate_limit;
pub mod reporting;
pub mod routes;
pub mod state;
pub mod streak;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::{EndpointLimiter, OtpLimiter};
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let mailer = Arc::new(Mailer::new(config.smtp.as_ref(), &config.email_from));
    let cors = cors_layer(&config);

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        mailer,
        otp_limiter: OtpLimiter::new(),
        api_limiter: EndpointLimiter::new(),
    });

    Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
