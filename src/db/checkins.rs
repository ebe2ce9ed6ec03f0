use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Checkin, checkin::CheckinWithMember};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    member_id: Uuid,
    timestamp: DateTime<Utc>,
) -> Result<Checkin, sqlx::Error> {
    sqlx::query_as::<_, Checkin>(
        "INSERT INTO checkins (member_id, timestamp) VALUES ($1, $2) RETURNING *",
    )
    .bind(member_id)
    .bind(timestamp)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Checkin>, sqlx::Error> {
    sqlx::query_as::<_, Checkin>("SELECT * FROM checkins WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// First check-in for a member inside an inclusive timestamp window.
pub async fn find_in_window(
    pool: &PgPool,
    member_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<Checkin>, sqlx::Error> {
    sqlx::query_as::<_, Checkin>(
        "SELECT * FROM checkins
         WHERE member_id = $1 AND timestamp >= $2 AND timestamp <= $3
         ORDER BY timestamp LIMIT 1",
    )
    .bind(member_id)
    .bind(start)
    .bind(end)
    .fetch_optional(pool)
    .await
}

/// Same check as `find_in_window` but with a half-open day window.
pub async fn find_in_day(
    pool: &PgPool,
    member_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<Checkin>, sqlx::Error> {
    sqlx::query_as::<_, Checkin>(
        "SELECT * FROM checkins
         WHERE member_id = $1 AND timestamp >= $2 AND timestamp < $3
         ORDER BY timestamp LIMIT 1",
    )
    .bind(member_id)
    .bind(start)
    .bind(end)
    .fetch_optional(pool)
    .await
}

pub async fn list_with_members_in_window(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CheckinWithMember>, sqlx::Error> {
    sqlx::query_as::<_, CheckinWithMember>(
        "SELECT c.id AS checkin_id, m.id AS member_id, m.name, m.email, c.timestamp
         FROM checkins c JOIN members m ON c.member_id = m.id
         WHERE c.timestamp >= $1 AND c.timestamp < $2
         ORDER BY c.timestamp DESC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn list_timestamps_by_member(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    let rows: Vec<(DateTime<Utc>,)> =
        sqlx::query_as("SELECT timestamp FROM checkins WHERE member_id = $1")
            .bind(member_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM checkins")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_in_window(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM checkins WHERE timestamp >= $1 AND timestamp < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn count_since(pool: &PgPool, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM checkins WHERE timestamp >= $1")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_by_member_since(
    pool: &PgPool,
    member_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM checkins WHERE member_id = $1 AND timestamp >= $2",
    )
    .bind(member_id)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Time-bucketed counts in the reference time zone. `unit` must already be
/// validated against the date_trunc whitelist before interpolation.
pub async fn bucketed_counts(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    unit: &str,
    time_zone: &str,
) -> Result<Vec<(NaiveDateTime, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (NaiveDateTime, i64)>(&format!(
        "SELECT date_trunc('{unit}', timestamp AT TIME ZONE $3) AS bucket, count(*)
         FROM checkins
         WHERE timestamp >= $1 AND timestamp <= $2
         GROUP BY bucket ORDER BY bucket",
    ))
    .bind(start)
    .bind(end)
    .bind(time_zone)
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM checkins WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_by_member<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    member_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM checkins WHERE member_id = $1")
        .bind(member_id)
        .execute(executor)
        .await?;
    Ok(())
}
