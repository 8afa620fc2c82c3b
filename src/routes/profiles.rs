use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as AxumJson,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::Urgency;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateDonorRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

pub async fn create_donor(
    State(state): State<AppState>,
    Json(req): Json<CreateDonorRequest>,
) -> Result<(StatusCode, AxumJson<Value>), AppError> {
    let donor_id = crate::db::create_donor(
        &state.db,
        &req.name,
        &req.email,
        req.phone.as_deref().unwrap_or(""),
        req.address.as_deref().unwrap_or(""),
        req.city.as_deref().unwrap_or(""),
        req.state.as_deref().unwrap_or(""),
        req.pincode.as_deref().unwrap_or(""),
    )
    .await?;
    Ok((StatusCode::CREATED, AxumJson(json!({ "status": "created", "donor_id": donor_id }))))
}

pub async fn list_donors(State(state): State<AppState>) -> Result<AxumJson<Value>, AppError> {
    let donors = crate::db::list_donors(&state.db).await?;
    Ok(AxumJson(json!({ "donors": donors })))
}

pub async fn donor_detail(
    Path(donor_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<AxumJson<Value>, AppError> {
    let donor = crate::db::get_donor(&state.db, donor_id)
        .await?
        .ok_or(AppError::NotFound { entity: "donor", id: donor_id })?;
    Ok(AxumJson(json!(donor)))
}

#[derive(Deserialize)]
pub struct CreateRecipientRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub family_size: Option<i64>,
    pub urgency: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

pub async fn create_recipient(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipientRequest>,
) -> Result<(StatusCode, AxumJson<Value>), AppError> {
    let urgency = match req.urgency.as_deref() {
        None | Some("") => Urgency::Medium,
        Some(raw) => Urgency::parse(raw).ok_or_else(|| AppError::Validation {
            field: "urgency",
            constraint: "must be one of low, medium, high, critical".to_string(),
        })?,
    };
    let recipient_id = crate::db::create_recipient(
        &state.db,
        &req.name,
        &req.email,
        req.phone.as_deref().unwrap_or(""),
        req.family_size.unwrap_or(1),
        urgency,
        req.address.as_deref().unwrap_or(""),
        req.city.as_deref().unwrap_or(""),
        req.state.as_deref().unwrap_or(""),
        req.pincode.as_deref().unwrap_or(""),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        AxumJson(json!({ "status": "created", "recipient_id": recipient_id })),
    ))
}

pub async fn list_recipients(State(state): State<AppState>) -> Result<AxumJson<Value>, AppError> {
    let recipients = crate::db::list_recipients(&state.db).await?;
    Ok(AxumJson(json!({ "recipients": recipients })))
}

#[derive(Deserialize)]
pub struct CreateNgoRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

pub async fn create_ngo(
    State(state): State<AppState>,
    Json(req): Json<CreateNgoRequest>,
) -> Result<(StatusCode, AxumJson<Value>), AppError> {
    let ngo_id = crate::db::create_ngo(
        &state.db,
        &req.name,
        &req.email,
        req.phone.as_deref().unwrap_or(""),
        req.website.as_deref().unwrap_or(""),
        req.address.as_deref().unwrap_or(""),
        req.city.as_deref().unwrap_or(""),
        req.state.as_deref().unwrap_or(""),
        req.pincode.as_deref().unwrap_or(""),
    )
    .await?;
    Ok((StatusCode::CREATED, AxumJson(json!({ "status": "created", "ngo_id": ngo_id }))))
}

pub async fn list_ngos(State(state): State<AppState>) -> Result<AxumJson<Value>, AppError> {
    let ngos = crate::db::list_ngos(&state.db).await?;
    Ok(AxumJson(json!({ "ngos": ngos })))
}
