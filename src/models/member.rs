use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    /// Nullable for legacy records created before households existed.
    pub household_id: Option<Uuid>,
    /// Denormalized copy of the household owner's email; not unique.
    pub email: String,
    pub name: String,
    pub barcode: Option<String>,
    pub member_code: Option<String>,
    pub active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Member lifecycle. A purged member has no row at all, so a loaded
/// `Member` is one of the two live states. Legal transitions:
/// Active -> SoftDeleted (soft delete), SoftDeleted -> Active (restore),
/// either -> purged (hard delete, cascades to check-ins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    SoftDeleted,
}

impl Member {
    pub fn status(&self) -> MemberStatus {
        if self.deleted_at.is_some() {
            MemberStatus::SoftDeleted
        } else {
            MemberStatus::Active
        }
    }
}
