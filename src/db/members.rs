use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Member;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    household_id: Uuid,
    email: &str,
    name: &str,
    barcode: &str,
    member_code: &str,
) -> Result<Member, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "INSERT INTO members (household_id, email, name, barcode, member_code)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(household_id)
    .bind(email)
    .bind(name)
    .bind(barcode)
    .bind(member_code)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_first_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE email = $1 ORDER BY created_at, id LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_first_active_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE email = $1 AND deleted_at IS NULL
         ORDER BY created_at, id LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Case-insensitive, whitespace-trimmed exact name match.
pub async fn find_active_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members
         WHERE lower(trim(name)) = lower(trim($1)) AND deleted_at IS NULL
         LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn find_active_by_barcode(
    pool: &PgPool,
    barcode: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE barcode = $1 AND deleted_at IS NULL",
    )
    .bind(barcode)
    .fetch_optional(pool)
    .await
}

pub async fn find_active_in_household_by_name(
    pool: &PgPool,
    household_id: Uuid,
    name: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members
         WHERE household_id = $1 AND name = $2 AND deleted_at IS NULL
         LIMIT 1",
    )
    .bind(household_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn find_active_by_email_and_name(
    pool: &PgPool,
    email: &str,
    name: &str,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members
         WHERE email = $1 AND name = $2 AND deleted_at IS NULL
         LIMIT 1",
    )
    .bind(email)
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn list_by_household(
    pool: &PgPool,
    household_id: Uuid,
) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE household_id = $1 ORDER BY created_at",
    )
    .bind(household_id)
    .fetch_all(pool)
    .await
}

pub async fn list_active_by_household(
    pool: &PgPool,
    household_id: Uuid,
) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members
         WHERE household_id = $1 AND deleted_at IS NULL
         ORDER BY name",
    )
    .bind(household_id)
    .fetch_all(pool)
    .await
}

pub async fn list_active_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT * FROM members WHERE email = $1 AND deleted_at IS NULL
         ORDER BY created_at",
    )
    .bind(email)
    .fetch_all(pool)
    .await
}

/// Batched family lookup: non-deleted member counts for a set of emails in
/// one round trip, keyed by email.
pub async fn count_active_by_emails(
    pool: &PgPool,
    emails: &[String],
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT email, count(*) FROM members
         WHERE email = ANY($1) AND deleted_at IS NULL
         GROUP BY email",
    )
    .bind(emails)
    .fetch_all(pool)
    .await
}

/// All members newest-first, each with its household's account code.
pub async fn list_all_with_household_code(
    pool: &PgPool,
) -> Result<Vec<(Member, Option<String>)>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        member: Member,
        household_code: Option<String>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT m.*, h.household_code FROM members m
         LEFT JOIN households h ON m.household_id = h.id
         ORDER BY m.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| (r.member, r.household_code)).collect())
}

pub async fn update_name(pool: &PgPool, id: Uuid, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE members SET name = $2 WHERE id = $1")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Family email sync: rewrites the email of every non-deleted member that
/// shares `old_email`. Returns the number of rows touched.
pub async fn update_email_for_family(
    pool: &PgPool,
    old_email: &str,
    new_email: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE members SET email = $2 WHERE email = $1 AND deleted_at IS NULL",
    )
    .bind(old_email)
    .bind(new_email)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Active -> SoftDeleted. Returns false when the member is missing or
/// already soft-deleted (illegal transition).
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE members SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// SoftDeleted -> Active. Returns false when the member is missing or not
/// soft-deleted (illegal transition).
pub async fn restore(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE members SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM members WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn barcode_exists(pool: &PgPool, barcode: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM members WHERE barcode = $1)")
            .bind(barcode)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn member_code_exists(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM members WHERE member_code = $1)")
            .bind(code)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM members")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM members WHERE active AND deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
