use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::{Checkin, Member};

/// Result of an idempotent check-in attempt. `already_checked_in` carries
/// the original check-in rather than a fresh one; benign re-submission is
/// not an error.
pub struct CheckinOutcome {
    pub checkin: Checkin,
    pub already_checked_in: bool,
}

/// Insert a check-in unless one already exists in the inclusive window.
/// The existence check and insert are not atomic; the store-level unique
/// constraints do not cover period buckets, so concurrent duplicates for
/// one member can race (see the admin delete endpoint for cleanup).
pub async fn record_in_window(
    pool: &PgPool,
    member_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timestamp: DateTime<Utc>,
) -> Result<CheckinOutcome, AppError> {
    if let Some(existing) = db::checkins::find_in_window(pool, member_id, start, end).await? {
        return Ok(CheckinOutcome {
            checkin: existing,
            already_checked_in: true,
        });
    }

    let checkin = db::checkins::create(pool, member_id, timestamp).await?;
    Ok(CheckinOutcome {
        checkin,
        already_checked_in: false,
    })
}

/// How a family member name was resolved for a batch check-in. Kept as a
/// tagged result so each branch is visible to callers and tests instead
/// of an implicit query cascade.
pub enum MemberResolution {
    ViaHousehold(Member),
    ViaLegacyEmail(Member),
    Unresolved,
}

/// Resolve a member name within a household, falling back to the legacy
/// email-based lookup for records created before households existed.
pub async fn resolve_family_member(
    pool: &PgPool,
    household_id: Option<Uuid>,
    email: &str,
    name: &str,
) -> Result<MemberResolution, AppError> {
    if let Some(hid) = household_id {
        if let Some(member) =
            db::members::find_active_in_household_by_name(pool, hid, name).await?
        {
            return Ok(MemberResolution::ViaHousehold(member));
        }
    }

    if let Some(member) = db::members::find_active_by_email_and_name(pool, email, name).await? {
        return Ok(MemberResolution::ViaLegacyEmail(member));
    }

    Ok(MemberResolution::Unresolved)
}

/// Resolve scanner input: barcode first, then email (family QR path).
pub async fn resolve_scan_input(
    pool: &PgPool,
    input: &str,
) -> Result<Option<Member>, AppError> {
    if let Some(member) = db::members::find_active_by_barcode(pool, input).await? {
        return Ok(Some(member));
    }
    Ok(db::members::find_first_active_by_email(pool, input).await?)
}
