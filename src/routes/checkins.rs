use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::checkin::{record_in_window, resolve_scan_input};
use crate::db;
use crate::error::AppError;
use crate::period;
use crate::routes::enforce_rate_limit;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CheckinByEmailBody {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckinByNameBody {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckinByBarcodeBody {
    pub barcode: Option<String>,
}

/// Check in by email under the AM/PM idempotency rule. A repeat inside
/// the same period reports success with the original timestamp.
pub async fn checkin_by_email(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CheckinByEmailBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "checkin", addr.ip(), 5, 60)?;

    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;

    let member = db::members::find_first_active_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let now = Utc::now();
    let window = period::current_period(now);
    let outcome = record_in_window(&state.pool, member.id, window.start, window.end, now).await?;

    if outcome.already_checked_in {
        return Ok(Json(json!({
            "message": format!("Already checked in this {}.", window.period.label()),
            "member_id": member.id,
            "timestamp": outcome.checkin.timestamp,
            "period": window.period,
            "already_checked_in": true,
        })));
    }

    tracing::info!(member_id = %member.id, email = %email, "check-in successful");

    Ok(Json(json!({
        "message": "Check-in successful",
        "member_id": member.id,
        "timestamp": outcome.checkin.timestamp,
        "period": window.period,
        "already_checked_in": false,
    })))
}

/// Check in by full name, case-insensitive exact match.
pub async fn checkin_by_name(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CheckinByNameBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "checkin-by-name", addr.ip(), 5, 60)?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?;

    let member = db::members::find_active_by_name(&state.pool, name)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let now = Utc::now();
    let window = period::current_period(now);
    let outcome = record_in_window(&state.pool, member.id, window.start, window.end, now).await?;

    if outcome.already_checked_in {
        return Ok(Json(json!({
            "message": format!("Already checked in this {}.", window.period.label()),
            "member_id": member.id,
            "email": member.email,
            "timestamp": outcome.checkin.timestamp,
            "period": window.period,
            "already_checked_in": true,
        })));
    }

    tracing::info!(member_id = %member.id, name = %name, "check-in by name successful");

    Ok(Json(json!({
        "message": "Check-in successful",
        "member_id": member.id,
        "email": member.email,
        "timestamp": outcome.checkin.timestamp,
        "period": window.period,
        "already_checked_in": false,
    })))
}

/// Scanner check-in: barcode first, email fallback for family QR codes.
/// Uses the full local day as its idempotency window, and a family email
/// checks in every member not yet in today under one shared timestamp.
pub async fn checkin_by_barcode(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CheckinByBarcodeBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "checkin-by-barcode", addr.ip(), 50, 60)?;

    let input = body
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::BadRequest("Barcode or email is required".to_string()))?;

    let member = resolve_scan_input(&state.pool, input).await?.ok_or_else(|| {
        AppError::NotFound("Member not found with this barcode or email".to_string())
    })?;

    let now = Utc::now();
    let (day_start, day_end) = period::day_window(now);

    if db::checkins::find_in_day(&state.pool, member.id, day_start, day_end)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "{} has already checked in today",
            member.name
        )));
    }

    let family = db::members::list_active_by_email(&state.pool, &member.email).await?;

    if family.len() > 1 {
        // Whole-family scan: one shared timestamp for everyone going in.
        let shared_timestamp = now;
        let mut checked_in_members: Vec<String> = Vec::new();

        let mut tx = state.pool.begin().await?;
        for family_member in &family {
            let existing =
                db::checkins::find_in_day(&state.pool, family_member.id, day_start, day_end)
                    .await?;
            if existing.is_none() {
                db::checkins::create(&mut *tx, family_member.id, shared_timestamp).await?;
                checked_in_members.push(family_member.name.clone());
            }
        }
        tx.commit().await?;

        tracing::info!(primary_member_id = %member.id, family_size = family.len(),
            checked_in_count = checked_in_members.len(), "family checked in by barcode/email");

        return Ok(Json(json!({
            "message": format!(
                "Family check-in successful! {} members checked in.",
                checked_in_members.len()
            ),
            "family_checkin": true,
            "member_count": checked_in_members.len(),
            "family_size": family.len(),
            "checked_in_members": checked_in_members,
            "primary_member": member,
        })));
    }

    let checkin = db::checkins::create(&state.pool, member.id, now).await?;

    tracing::info!(member_id = %member.id, checkin_id = %checkin.id,
        "individual member checked in by barcode/email");

    Ok(Json(json!({
        "message": format!("{} checked in successfully!", member.name),
        "family_checkin": false,
        "member_name": member.name,
        "member": member,
        "checkin_id": checkin.id,
        "timestamp": checkin.timestamp,
    })))
}
