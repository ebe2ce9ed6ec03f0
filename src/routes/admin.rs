use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::otp::is_valid_account_code;
use crate::checkin::record_in_window;
use crate::db;
use crate::error::AppError;
use crate::period;
use crate::reporting::{self, BucketUnit};
use crate::routes::enforce_rate_limit;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub group_by: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminCheckinBody {
    pub member_id: Option<String>,
    pub timestamp: Option<String>,
}

/// Today's check-ins grouped per family. Family membership is decided by
/// a single batched member count over every email seen today.
pub async fn today(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Vec<reporting::TodayEntry>>, AppError> {
    enforce_rate_limit(&state, "admin-today", addr.ip(), 30, 60)?;

    let (start, end) = period::day_window(Utc::now());
    let rows = db::checkins::list_with_members_in_window(&state.pool, start, end).await?;

    let mut emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();
    emails.sort();
    emails.dedup();

    let family_sizes: HashMap<String, i64> = if emails.is_empty() {
        HashMap::new()
    } else {
        db::members::count_active_by_emails(&state.pool, &emails)
            .await?
            .into_iter()
            .collect()
    };

    Ok(Json(reporting::group_today(rows, &family_sizes)))
}

/// Bucketed check-in counts between two local dates.
pub async fn range(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    enforce_rate_limit(&state, "admin-range", addr.ip(), 20, 60)?;

    let unit = BucketUnit::parse(query.group_by.as_deref().unwrap_or("day"))
        .ok_or_else(|| {
            AppError::BadRequest("group_by must be one of day, week, month, year".to_string())
        })?;

    let (start, end) = period::date_range_window(query.start_date, query.end_date);

    let buckets = db::checkins::bucketed_counts(
        &state.pool,
        start,
        end,
        unit.as_sql(),
        period::REFERENCE_TZ.name(),
    )
    .await?;

    Ok(Json(
        buckets
            .into_iter()
            .map(|(bucket, count)| {
                json!({
                    "date": bucket.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "count": count,
                })
            })
            .collect(),
    ))
}

pub async fn stats(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "admin-stats", addr.ip(), 20, 60)?;

    let now = Utc::now();
    let (today_start, today_end) = period::day_window(now);

    let total_members = db::members::count_all(&state.pool).await?;
    let active_members = db::members::count_active(&state.pool).await?;
    let total_checkins = db::checkins::count_all(&state.pool).await?;
    let checkins_today =
        db::checkins::count_in_window(&state.pool, today_start, today_end).await?;
    let checkins_this_week =
        db::checkins::count_since(&state.pool, now - Duration::days(7)).await?;
    let checkins_this_month =
        db::checkins::count_since(&state.pool, now - Duration::days(30)).await?;

    Ok(Json(json!({
        "total_members": total_members,
        "active_members": active_members,
        "total_checkins": total_checkins,
        "checkins_today": checkins_today,
        "checkins_this_week": checkins_this_week,
        "checkins_this_month": checkins_this_month,
    })))
}

/// Back-dated or corrective check-in for a specific member. Idempotency
/// here is a ±1 minute window around the supplied timestamp, not the
/// AM/PM period.
pub async fn checkin_member(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<AdminCheckinBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "admin-checkin", addr.ip(), 10, 60)?;

    let member_id: Uuid = body
        .member_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Member ID is required".to_string()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    let member = db::members::find_active_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let timestamp: DateTime<Utc> = match body.timestamp.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| AppError::BadRequest("Invalid timestamp format".to_string()))?,
        None => Utc::now(),
    };

    let outcome = record_in_window(
        &state.pool,
        member.id,
        timestamp - Duration::minutes(1),
        timestamp + Duration::minutes(1),
        timestamp,
    )
    .await?;

    if outcome.already_checked_in {
        return Ok(Json(json!({
            "message": "Member already checked in at this time",
            "checkin_id": outcome.checkin.id,
            "already_checked_in": true,
        })));
    }

    tracing::info!(member_id = %member.id, member_name = %member.name,
        checkin_id = %outcome.checkin.id, "admin check-in created");

    Ok(Json(json!({
        "message": format!("{} checked in successfully", member.name),
        "checkin_id": outcome.checkin.id,
        "member_name": member.name,
        "timestamp": outcome.checkin.timestamp,
        "already_checked_in": false,
    })))
}

pub async fn delete_checkin(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(checkin_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "admin-checkin-delete", addr.ip(), 10, 60)?;

    let checkin_id: Uuid = checkin_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid check-in ID format".to_string()))?;

    let checkin = db::checkins::find_by_id(&state.pool, checkin_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Check-in not found".to_string()))?;

    let member_name = db::members::find_by_id(&state.pool, checkin.member_id)
        .await?
        .map(|m| m.name)
        .unwrap_or_else(|| "Unknown".to_string());

    db::checkins::delete(&state.pool, checkin.id).await?;

    tracing::info!(checkin_id = %checkin.id, member_name = %member_name,
        "admin check-in deleted");

    Ok(Json(json!({
        "message": format!("Check-in for {member_name} deleted successfully"),
        "deleted_checkin_id": checkin.id,
    })))
}

/// Front-desk lookup: household roster by account code with each
/// member's checked-in-today status.
pub async fn household_by_code(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(account_code): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "admin-household", addr.ip(), 20, 60)?;

    if !is_valid_account_code(&account_code) {
        return Err(AppError::BadRequest(
            "Invalid account code format".to_string(),
        ));
    }

    let household = db::households::find_by_code(&state.pool, &account_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    let members = db::members::list_active_by_household(&state.pool, household.id).await?;

    let (day_start, day_end) = period::day_window(Utc::now());
    let mut member_data: Vec<Value> = Vec::with_capacity(members.len());
    for member in &members {
        let existing =
            db::checkins::find_in_day(&state.pool, member.id, day_start, day_end).await?;
        member_data.push(json!({
            "id": member.id,
            "name": member.name,
            "email": member.email,
            "barcode": member.barcode,
            "already_checked_in": existing.is_some(),
            "checkin_id": existing.as_ref().map(|c| c.id),
            "checkin_time": existing.as_ref().map(|c| c.timestamp),
        }));
    }

    Ok(Json(json!({
        "household_id": household.id,
        "household_code": household.household_code,
        "owner_email": household.owner_email,
        "members": member_data,
        "member_count": members.len(),
    })))
}
