use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::checkin::{MemberResolution, record_in_window, resolve_family_member};
use crate::codes;
use crate::db;
use crate::error::AppError;
use crate::models::Member;
use crate::names::capitalize_name;
use crate::period;
use crate::routes::enforce_rate_limit;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct FamilyMemberName {
    pub name: String,
}

#[derive(Deserialize)]
pub struct FamilyRegistrationBody {
    pub email: String,
    pub members: Vec<FamilyMemberName>,
}

#[derive(Deserialize)]
pub struct FamilyCheckinBody {
    pub email: String,
    pub member_names: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddMembersBody {
    pub email: String,
    #[serde(default)]
    pub new_members: Vec<String>,
}

/// Resolve a family roster: via the household of the first non-deleted
/// member with this email, falling back to the legacy email grouping.
async fn family_roster(
    state: &SharedState,
    email: &str,
) -> Result<(Member, Vec<Member>), AppError> {
    let first = db::members::find_first_active_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No family members found with this email".to_string())
        })?;

    let members = match first.household_id {
        Some(household_id) => {
            db::members::list_active_by_household(&state.pool, household_id).await?
        }
        None => db::members::list_active_by_email(&state.pool, email).await?,
    };

    if members.is_empty() {
        return Err(AppError::NotFound(
            "No family members found with this email".to_string(),
        ));
    }

    Ok((first, members))
}

/// Register a batch of members under one email in a single transaction.
/// Any pre-existing name aborts the whole batch.
pub async fn register(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<FamilyRegistrationBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "family-register", addr.ip(), 10, 60)?;

    let email = body.email.trim().to_string();
    if email.is_empty() || body.members.is_empty() {
        return Err(AppError::BadRequest(
            "Email and at least one member are required".to_string(),
        ));
    }

    let names: Vec<String> = body
        .members
        .iter()
        .map(|m| capitalize_name(&m.name))
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(AppError::BadRequest(
            "Email and at least one member are required".to_string(),
        ));
    }

    let household = db::households::find_by_owner_email(&state.pool, &email).await?;

    if let Some(household) = &household {
        let mut conflicts: Vec<String> = Vec::new();
        for name in &names {
            if db::members::find_active_in_household_by_name(&state.pool, household.id, name)
                .await?
                .is_some()
            {
                conflicts.push(name.clone());
            }
        }
        if !conflicts.is_empty() {
            return Err(AppError::Conflict(format!(
                "Members already exist in this household: {}",
                conflicts.join(", ")
            )));
        }
    }

    // Codes are allocated before the insert batch; the unique indexes
    // backstop any race.
    let mut allocated: Vec<(String, String, String)> = Vec::with_capacity(names.len());
    for name in &names {
        let barcode = codes::allocate_barcode(&state.pool).await?;
        let member_code = codes::allocate_member_code(&state.pool).await?;
        allocated.push((name.clone(), barcode, member_code));
    }

    let mut tx = state.pool.begin().await?;

    let household = match household {
        Some(h) => h,
        None => {
            let code = codes::allocate_household_code(&state.pool).await?;
            db::households::create(&mut *tx, &email, &code).await?
        }
    };

    let mut created: Vec<Member> = Vec::with_capacity(allocated.len());
    for (name, barcode, member_code) in &allocated {
        let member = db::members::create(
            &mut *tx,
            household.id,
            &email,
            name,
            barcode,
            member_code,
        )
        .await?;
        created.push(member);
    }

    tx.commit().await?;

    tracing::info!(email = %email, member_count = created.len(),
        household_id = %household.id, "family registered");

    Ok(Json(json!({
        "message": format!("Family registered successfully. {} members added.", created.len()),
        "members": created,
        "member_ids": created.iter().map(|m| m.id).collect::<Vec<_>>(),
        "household_code": household.household_code,
    })))
}

pub async fn members(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Member>>, AppError> {
    enforce_rate_limit(&state, "family-members", addr.ip(), 20, 60)?;

    let (_, members) = family_roster(&state, &email).await?;
    Ok(Json(members))
}

/// Check in an explicit list of family members. The AM/PM rule applies
/// per member; one already-checked-in member does not block the rest.
pub async fn checkin(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<FamilyCheckinBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "family-checkin", addr.ip(), 5, 60)?;

    let email = body.email.trim().to_string();
    if email.is_empty() || body.member_names.is_empty() {
        return Err(AppError::BadRequest(
            "Email and member names are required".to_string(),
        ));
    }

    let first = db::members::find_first_active_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No family members found with this email".to_string())
        })?;

    let now = Utc::now();
    let window = period::current_period(now);

    let mut results: Vec<String> = Vec::with_capacity(body.member_names.len());
    for name in &body.member_names {
        let member =
            match resolve_family_member(&state.pool, first.household_id, &email, name).await? {
                MemberResolution::ViaHousehold(m) | MemberResolution::ViaLegacyEmail(m) => m,
                MemberResolution::Unresolved => {
                    results.push(format!("{name}: Member not found"));
                    continue;
                }
            };

        let outcome =
            record_in_window(&state.pool, member.id, window.start, window.end, now).await?;
        if outcome.already_checked_in {
            results.push(format!(
                "{name}: Already checked in this {}",
                window.period.label()
            ));
        } else {
            results.push(format!("{name}: Check-in successful"));
        }
    }

    tracing::info!(email = %email, members = ?body.member_names, "family check-in completed");

    Ok(Json(json!({
        "message": "Family check-in completed",
        "results": results,
    })))
}

/// Which family members are in or out for the current AM/PM period.
pub async fn checkin_status(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "family-status", addr.ip(), 10, 60)?;

    let (_, members) = family_roster(&state, &email).await?;

    let now = Utc::now();
    let window = period::current_period(now);

    let mut checked_in: Vec<String> = Vec::new();
    let mut not_checked_in: Vec<String> = Vec::new();
    for member in &members {
        let existing =
            db::checkins::find_in_window(&state.pool, member.id, window.start, window.end)
                .await?;
        if existing.is_some() {
            checked_in.push(member.name.clone());
        } else {
            not_checked_in.push(member.name.clone());
        }
    }

    Ok(Json(json!({
        "checked_in": checked_in,
        "not_checked_in": not_checked_in,
        "period": window.period,
        "date": window.date,
    })))
}

/// Add members to an existing family account.
pub async fn add_members(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<AddMembersBody>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "family-add", addr.ip(), 10, 60)?;

    let email = body.email.trim().to_string();
    if email.is_empty() || body.new_members.is_empty() {
        return Err(AppError::BadRequest(
            "Email and new members are required".to_string(),
        ));
    }

    let existing_member = db::members::find_first_active_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Family not found".to_string()))?;

    let household_id = existing_member
        .household_id
        .ok_or_else(|| AppError::NotFound("Household not found for this family".to_string()))?;
    let household = db::households::find_by_id(&state.pool, household_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Household not found for this family".to_string()))?;

    let names: Vec<String> = body
        .new_members
        .iter()
        .map(|n| capitalize_name(n))
        .filter(|n| !n.is_empty())
        .collect();

    let mut conflicts: Vec<String> = Vec::new();
    for name in &names {
        if db::members::find_active_in_household_by_name(&state.pool, household.id, name)
            .await?
            .is_some()
        {
            conflicts.push(name.clone());
        }
    }
    if !conflicts.is_empty() {
        return Err(AppError::Conflict(format!(
            "Members already exist in this family: {}",
            conflicts.join(", ")
        )));
    }

    let mut allocated: Vec<(String, String, String)> = Vec::with_capacity(names.len());
    for name in &names {
        let barcode = codes::allocate_barcode(&state.pool).await?;
        let member_code = codes::allocate_member_code(&state.pool).await?;
        allocated.push((name.clone(), barcode, member_code));
    }

    let mut tx = state.pool.begin().await?;
    let mut created: Vec<Member> = Vec::with_capacity(allocated.len());
    for (name, barcode, member_code) in &allocated {
        created.push(
            db::members::create(&mut *tx, household.id, &email, name, barcode, member_code)
                .await?,
        );
    }
    tx.commit().await?;

    let roster = db::members::list_active_by_household(&state.pool, household.id).await?;

    tracing::info!(household_id = %household.id, new_members = ?names,
        total_family_size = roster.len(), "members added to family");

    Ok(Json(json!({
        "message": format!(
            "Added {} new members to family account {}",
            created.len(),
            household.household_code.as_deref().unwrap_or("")
        ),
        "household_code": household.household_code,
        "new_members": created,
        "all_family_members": roster,
    })))
}

/// Delete an entire family: every member's check-ins, the members, then
/// the household row, in one transaction. The account code becomes
/// available for reuse.
pub async fn delete_family(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    enforce_rate_limit(&state, "family-delete", addr.ip(), 5, 60)?;

    let household = db::households::find_by_owner_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Family not found".to_string()))?;

    let family_members = db::members::list_by_household(&state.pool, household.id).await?;
    if family_members.is_empty() {
        return Err(AppError::NotFound("No family members found".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    for member in &family_members {
        db::checkins::delete_by_member(&mut *tx, member.id).await?;
    }
    for member in &family_members {
        db::members::delete(&mut *tx, member.id).await?;
    }
    db::households::delete(&mut *tx, household.id).await?;
    tx.commit().await?;

    tracing::info!(household_id = %household.id,
        household_code = household.household_code.as_deref().unwrap_or(""),
        member_count = family_members.len(), email = %email, "family account deleted");

    Ok(Json(json!({
        "message": format!(
            "Family account deleted successfully. Removed {} members and account number {}.",
            family_members.len(),
            household.household_code.as_deref().unwrap_or("")
        ),
        "deleted_members": family_members.len(),
        "deleted_household_code": household.household_code,
    })))
}
