use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Household;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    owner_email: &str,
    household_code: &str,
) -> Result<Household, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        "INSERT INTO households (owner_email, household_code)
         VALUES (lower(trim($1)), $2) RETURNING *",
    )
    .bind(owner_email)
    .bind(household_code)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Household>, sqlx::Error> {
    sqlx::query_as::<_, Household>("SELECT * FROM households WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_owner_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Household>, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        "SELECT * FROM households WHERE lower(owner_email) = lower(trim($1))",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Household>, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        "SELECT * FROM households WHERE upper(household_code) = upper(trim($1))",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

pub async fn code_exists(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM households WHERE upper(household_code) = upper($1))",
    )
    .bind(code)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Store a fresh OTP digest, replacing any pending pair.
pub async fn set_pending_verification(
    pool: &PgPool,
    id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE households
         SET email_verification_token_hash = $2, email_verification_expires_at = $3
         WHERE id = $1",
    )
    .bind(id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark the owner email verified and clear the pending pair together.
pub async fn mark_verified(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE households
         SET email_verified_at = now(),
             email_verification_token_hash = NULL,
             email_verification_expires_at = NULL
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM households WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
