use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::{EndpointLimiter, OtpLimiter};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Arc<Mailer>,
    pub otp_limiter: OtpLimiter,
    pub api_limiter: EndpointLimiter,
}
