use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, NgoActor, Role};
use crate::db::models::DonationStatus;
use crate::error::AppError;
use crate::lifecycle::{self, DonationAction};
use crate::matching;
use crate::routes::require_role;
use crate::AppState;

pub(crate) fn normalize_category(input: &str) -> String {
    let normalized = input.trim().to_lowercase();
    match normalized.as_str() {
        "clothing" | "food" | "electronics" | "furniture" | "education" | "medical" => normalized,
        _ => "other".to_string(),
    }
}

#[derive(Deserialize)]
pub struct CreateDonationRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub image_key: Option<String>,
}

pub async fn create_donation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&user, Role::Donor)?;
    let category = normalize_category(req.category.as_deref().unwrap_or(""));
    let donation_id = crate::db::create_donation(
        &state.db,
        user.actor_id,
        &req.title,
        req.description.as_deref().unwrap_or(""),
        &category,
        req.quantity.unwrap_or(1),
        req.image_key.as_deref(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        AxumJson(json!({ "status": "created", "donation_id": donation_id })),
    ))
}

#[derive(Deserialize)]
pub struct ListParams {
    pub donor_id: Option<i64>,
    pub status: Option<DonationStatus>,
}

pub async fn list_donations(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let donations = crate::db::list_donations(&state.db, params.donor_id, params.status).await?;
    Ok(AxumJson(json!({ "donations": donations })))
}

#[derive(Deserialize)]
pub struct UpdateDonationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
}

pub async fn update_donation(
    Path(donation_id): Path<i64>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&user, Role::Donor)?;
    let category = req.category.as_deref().map(normalize_category);
    let updated = crate::db::update_donation(
        &state.db,
        user.actor_id,
        donation_id,
        req.title.as_deref(),
        req.description.as_deref(),
        category.as_deref(),
        req.quantity,
    )
    .await?;
    if updated {
        Ok((StatusCode::OK, AxumJson(json!({ "status": "updated", "donation_id": donation_id })))
            .into_response())
    } else {
        Ok((StatusCode::CONFLICT, "Not updated (stale or not found)").into_response())
    }
}

pub async fn delete_donation(
    Path(donation_id): Path<i64>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    require_role(&user, Role::Donor)?;
    let deleted = crate::db::delete_donation(&state.db, user.actor_id, donation_id).await?;
    if deleted {
        Ok((StatusCode::OK, "Deleted").into_response())
    } else {
        Ok((StatusCode::NOT_FOUND, "Not found").into_response())
    }
}

pub async fn match_donation(
    Path(donation_id): Path<i64>,
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let outcome = matching::match_donation(&state.db, donation_id).await?;
    Ok(AxumJson(outcome))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub action: DonationAction,
}

pub async fn transition_donation(
    Path(donation_id): Path<i64>,
    State(state): State<AppState>,
    actor: NgoActor,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_status =
        lifecycle::transition_donation(&state.db, donation_id, req.action, actor.ngo_id).await?;
    Ok(AxumJson(json!({ "ok": true, "new_status": new_status })))
}

#[derive(Deserialize)]
pub struct UploadRequest {
    file_type: String, // e.g., "image/jpeg"
    donation_id: Option<i64>,
}

pub async fn generate_upload_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&user, Role::Donor)?;

    let Some(storage) = state.storage.as_ref() else {
        return Ok((StatusCode::SERVICE_UNAVAILABLE, "Object storage not configured")
            .into_response());
    };

    let ext = match req.file_type.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => return Ok((StatusCode::BAD_REQUEST, "Unsupported file type").into_response()),
    };

    let key = format!("donations/{}/{}.{}", user.actor_id, Uuid::new_v4(), ext);

    let presigned = match storage.presign_write(&key, Duration::from_secs(300)).await {
        Ok(presigned) => presigned,
        Err(e) => {
            tracing::error!("Storage Presign Error: {}", e);
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "Storage Error").into_response());
        }
    };

    if let Some(donation_id) = req.donation_id {
        let recorded =
            crate::db::set_donation_image(&state.db, user.actor_id, donation_id, &key).await?;
        if !recorded {
            return Err(AppError::NotFound { entity: "donation", id: donation_id });
        }
    }

    Ok(AxumJson(json!({
        "upload_url": presigned.uri().to_string(),
        "key": key,
        "expires_in": 300,
    }))
    .into_response())
}
