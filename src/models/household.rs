use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The billing/identity unit owning one or more members. `household_code`
/// is the human-entry account number; it never changes once assigned.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Household {
    pub id: Uuid,
    pub owner_email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub email_verification_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub email_verification_expires_at: Option<DateTime<Utc>>,
    pub household_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Household {
    /// A verification pair is pending when both the hash and its expiry
    /// are set; the two columns are always written and cleared together.
    pub fn pending_verification(&self) -> Option<(&str, DateTime<Utc>)> {
        match (
            self.email_verification_token_hash.as_deref(),
            self.email_verification_expires_at,
        ) {
            (Some(hash), Some(expires)) => Some((hash, expires)),
            _ => None,
        }
    }
}
