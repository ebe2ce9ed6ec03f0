use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub email_from: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("GYMHUB_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid GYMHUB_HOST: {e}"))?;

        let port: u16 = env_or("GYMHUB_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid GYMHUB_PORT: {e}"))?;

        let environment = match env_or("ENVIRONMENT", "development").as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let allowed_origins: Vec<String> = env_or("ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = env_or("GYMHUB_LOG_LEVEL", "info");

        let email_from = env_or("EMAIL_FROM", "Gym Hub <no-reply@localhost>");

        let smtp = match (
            std::env::var("GYMHUB_SMTP_HOST").ok(),
            std::env::var("GYMHUB_SMTP_PORT").ok(),
            std::env::var("GYMHUB_SMTP_USER").ok(),
            std::env::var("GYMHUB_SMTP_PASS").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid GYMHUB_SMTP_PORT: {e}"))?,
                user,
                pass,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            environment,
            allowed_origins,
            log_level,
            email_from,
            smtp,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
