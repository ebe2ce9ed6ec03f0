use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthHousehold;
use crate::codes;
use crate::db;
use crate::error::AppError;
use crate::names::capitalize_name;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct NewMemberBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct AttachMemberBody {
    #[serde(rename = "memberId")]
    pub member_id: String,
    #[serde(rename = "householdCode")]
    pub household_code: String,
}

pub async fn me(
    auth: AuthHousehold,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let household = db::households::find_by_id(&state.pool, auth.household_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let members = db::members::list_by_household(&state.pool, household.id).await?;

    Ok(Json(json!({
        "householdId": household.id,
        "ownerEmail": household.owner_email,
        "members": members
            .iter()
            .map(|m| json!({ "id": m.id, "name": m.name }))
            .collect::<Vec<_>>(),
        "householdCode": household.household_code,
    })))
}

/// Create a member under the caller's own household. Codes are allocated
/// up front; the storage layer never assigns them implicitly.
pub async fn create_member(
    auth: AuthHousehold,
    State(state): State<SharedState>,
    Json(body): Json<NewMemberBody>,
) -> Result<Json<Value>, AppError> {
    let household = db::households::find_by_id(&state.pool, auth.household_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let name = capitalize_name(body.name.trim());
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    if db::members::find_active_in_household_by_name(&state.pool, household.id, &name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Member already exists in this household".to_string(),
        ));
    }

    let barcode = codes::allocate_barcode(&state.pool).await?;
    let member_code = codes::allocate_member_code(&state.pool).await?;

    let member = db::members::create(
        &state.pool,
        household.id,
        &household.owner_email,
        &name,
        &barcode,
        &member_code,
    )
    .await?;

    tracing::info!(member_id = %member.id, name = %member.name, barcode = %barcode,
        "household member created");

    Ok(Json(json!({
        "id": member.id,
        "name": member.name,
        "barcode": member.barcode,
    })))
}

/// Defensive no-op: the create flow already attaches members at creation
/// time, so this only validates that the member belongs to the caller's
/// household and that the supplied account code matches.
pub async fn attach_member(
    auth: AuthHousehold,
    State(state): State<SharedState>,
    Json(body): Json<AttachMemberBody>,
) -> Result<Json<Value>, AppError> {
    let member_id: Uuid = body
        .member_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID format".to_string()))?;

    let member = db::members::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if member.household_id != Some(auth.household_id) {
        return Err(AppError::Forbidden(
            "Cannot attach member from another household".to_string(),
        ));
    }

    let household = db::households::find_by_id(&state.pool, auth.household_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Invalid household code".to_string()))?;

    let supplied = body.household_code.trim().to_uppercase();
    if household.household_code.as_deref() != Some(supplied.as_str()) {
        return Err(AppError::Forbidden("Invalid household code".to_string()));
    }

    Ok(Json(json!({
        "linked": true,
        "message": "Member is already in the correct household",
    })))
}
