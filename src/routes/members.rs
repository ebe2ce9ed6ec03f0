use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::checkin::resolve_scan_input;
use crate::codes;
use crate::db;
use crate::error::AppError;
use crate::models::Member;
use crate::names::capitalize_name;
use crate::period;
use crate::routes::enforce_rate_limit;
use crate::state::SharedState;
use crate::streak;

#[derive(Deserialize)]
pub struct CreateMemberBody {
    pub email: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateMemberBody {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LookupByNameBody {
    pub name: String,
}

enum CreateOutcome {
    Created(Member),
    Existing(Member),
}

/// Shared creation path: resolve or create the owning household, reject
/// duplicate non-deleted names inside it, allocate codes, insert.
async fn create_with_household(
    state: &SharedState,
    email: &str,
    name: &str,
) -> Result<CreateOutcome, AppError> {
    let household = db::households::find_by_owner_email(&state.pool, email).await?;

    if let Some(household) = &household {
        if let Some(existing) =
            db::members::find_active_in_household_by_name(&state.pool, household.id, name)
                .await?
        {
            return Ok(CreateOutcome::Existing(existing));
        }
    }

    let barcode = codes::allocate_barcode(&state.pool).await?;
    let member_code = codes::allocate_member_code(&state.pool).await?;

    let mut tx = state.pool.begin().await?;

    let household = match household {
        Some(h) => h,
        None => {
            let code = codes::allocate_household_code(&state.pool).await?;
            db::households::create(&mut *tx, email, &code).await?
        }
    };

    let member = db::members::create(
        &mut *tx,
        household.id,
        email,
        name,
        &barcode,
        &member_code,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id = %member.id, email = %email, name = %name,
        household_id = %household.id, "member created");

    Ok(CreateOutcome::Created(member))
}

pub async fn create(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CreateMemberBody>,
) -> Result<Json<Member>, AppError> {
    enforce_rate_limit(&state, "member-create", addr.ip(), 10, 60)?;

    let email = body.email.trim().to_string();
    let name = capitalize_name(&body.name);
    if email.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest(
            "Email and name are required".to_string(),
        ));
    }

    match create_with_household(&state, &email, &name).await? {
        CreateOutcome::Created(member) => Ok(Json(member)),
        CreateOutcome::Existing(_) => Err(AppError::Conflict(
            "Member already exists in this household".to_string(),
        )),
    }
}

/// Registration variant that treats a duplicate as success and returns
/// the existing record.
pub async fn register_only(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CreateMemberBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "member-register", addr.ip(), 10, 60)?;

    let email = body.email.trim().to_string();
    let name = capitalize_name(&body.name);
    if email.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest(
            "Email and name are required".to_string(),
        ));
    }

    match create_with_household(&state, &email, &name).await? {
        CreateOutcome::Created(member) => Ok(Json(json!({
            "message": "Registration successful! Welcome to Gym Hub.",
            "member": member,
            "is_existing": false,
        }))),
        CreateOutcome::Existing(member) => Ok(Json(json!({
            "message": "Welcome back! Redirecting to your profile.",
            "member": member,
            "is_existing": true,
        }))),
    }
}

pub async fn get_by_email(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(email): Path<String>,
) -> Result<Json<Member>, AppError> {
    enforce_rate_limit(&state, "member-get", addr.ip(), 10, 60)?;

    let member = db::members::find_first_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Ok(Json(member))
}

/// All members newest-first with their household account codes.
pub async fn list(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Vec<Value>>, AppError> {
    enforce_rate_limit(&state, "members-list", addr.ip(), 20, 60)?;

    let rows = db::members::list_all_with_household_code(&state.pool).await?;
    let members = rows
        .into_iter()
        .map(|(member, household_code)| {
            let mut value = serde_json::to_value(&member).unwrap_or_else(|_| json!({}));
            value["household_code"] = json!(household_code);
            value
        })
        .collect();

    Ok(Json(members))
}

pub async fn lookup_by_name(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LookupByNameBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "member-lookup-name", addr.ip(), 10, 60)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let member = db::members::find_active_by_name(&state.pool, name)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    tracing::info!(name = %name, member_id = %member.id, "member lookup by name");

    Ok(Json(json!({
        "id": member.id,
        "email": member.email,
        "name": member.name,
    })))
}

pub async fn lookup_by_barcode(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(barcode): Path<String>,
) -> Result<Json<Member>, AppError> {
    // Scanners retry aggressively, so this class runs with a higher cap.
    enforce_rate_limit(&state, "member-lookup-barcode", addr.ip(), 50, 60)?;

    if barcode.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Barcode or email is required".to_string(),
        ));
    }

    let member = resolve_scan_input(&state.pool, barcode.trim())
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Member not found with this barcode or email".to_string())
        })?;

    Ok(Json(member))
}

pub async fn stats(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(member_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "member-stats", addr.ip(), 30, 60)?;

    let member_id: Uuid = member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    let member = db::members::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let timestamps = db::checkins::list_timestamps_by_member(&state.pool, member_id).await?;

    let now = Utc::now();
    let monthly =
        db::checkins::count_by_member_since(&state.pool, member_id, period::month_start(now))
            .await?;

    let dates: Vec<chrono::NaiveDate> = timestamps
        .iter()
        .map(|t| t.with_timezone(&period::REFERENCE_TZ).date_naive())
        .collect();
    let streaks = streak::calculate(&dates, period::today_local(now));

    Ok(Json(json!({
        "monthly_check_ins": monthly,
        "current_streak": streaks.current,
        "highest_streak": streaks.highest,
        "member_since": member
            .created_at
            .with_timezone(&period::REFERENCE_TZ)
            .format("%B %Y")
            .to_string(),
        "check_in_dates": timestamps,
        "name": member.name,
        "email": member.email,
        "barcode": member.barcode,
    })))
}

/// Rename and/or re-email a member. Changing the email re-points every
/// other non-deleted member sharing the old address, keeping the family
/// in sync.
pub async fn update(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(member_id): Path<String>,
    Json(body): Json<UpdateMemberBody>,
) -> Result<Json<Member>, AppError> {
    enforce_rate_limit(&state, "member-update", addr.ip(), 5, 60)?;

    let member_id: Uuid = member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    let member = db::members::find_active_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let name = capitalize_name(&body.name);
    db::members::update_name(&state.pool, member.id, &name).await?;

    let new_email = body.email.trim();
    if !new_email.is_empty() && new_email != member.email {
        let touched =
            db::members::update_email_for_family(&state.pool, &member.email, new_email).await?;
        tracing::info!(old_email = %member.email, new_email = %new_email,
            member_count = touched, "family email updated");
    }

    let updated = db::members::find_by_id(&state.pool, member.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Ok(Json(updated))
}

/// Hard delete: the member's check-ins go first, then the row.
pub async fn hard_delete(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(member_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "member-delete", addr.ip(), 5, 60)?;

    let member_id: Uuid = member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    let member = db::members::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let mut tx = state.pool.begin().await?;
    db::checkins::delete_by_member(&mut *tx, member.id).await?;
    db::members::delete(&mut *tx, member.id).await?;
    tx.commit().await?;

    tracing::info!(member_id = %member.id, name = %member.name, email = %member.email,
        "member hard deleted");

    Ok(Json(json!({ "message": "Member deleted successfully" })))
}

pub async fn soft_delete(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(member_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "member-soft-delete", addr.ip(), 5, 60)?;

    let member_id: Uuid = member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    if !db::members::soft_delete(&state.pool, member_id).await? {
        return Err(AppError::NotFound(
            "Member not found or already deleted".to_string(),
        ));
    }

    tracing::info!(member_id = %member_id, "member soft deleted");

    Ok(Json(json!({ "message": "Member deactivated successfully" })))
}

pub async fn restore(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(member_id): Path<String>,
) -> Result<Json<Member>, AppError> {
    enforce_rate_limit(&state, "member-restore", addr.ip(), 5, 60)?;

    let member_id: Uuid = member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    if !db::members::restore(&state.pool, member_id).await? {
        return Err(AppError::NotFound(
            "Member not found or not deleted".to_string(),
        ));
    }

    let member = db::members::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    tracing::info!(member_id = %member.id, name = %member.name, "member restored");

    Ok(Json(member))
}
