use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Checkin {
    pub id: Uuid,
    pub member_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// A check-in joined to its member, as used by the daily admin views.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CheckinWithMember {
    pub checkin_id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}
