use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthenticatedUser, NgoActor, Role};
use crate::db::models::{RequestStatus, Urgency};
use crate::error::AppError;
use crate::lifecycle::{self, RequestAction};
use crate::routes::require_role;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<String>,
}

pub async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateRequestRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&user, Role::Recipient)?;
    let urgency = match req.urgency.as_deref() {
        None | Some("") => Urgency::Medium,
        Some(raw) => Urgency::parse(raw).ok_or_else(|| AppError::Validation {
            field: "urgency",
            constraint: "must be one of low, medium, high, critical".to_string(),
        })?,
    };
    let category = super::donations::normalize_category(req.category.as_deref().unwrap_or(""));
    let request_id = crate::db::create_request(
        &state.db,
        user.actor_id,
        &req.title,
        req.description.as_deref().unwrap_or(""),
        &category,
        urgency,
    )
    .await?;
    Ok((StatusCode::CREATED, AxumJson(json!({ "status": "created", "request_id": request_id }))))
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<RequestStatus>,
}

pub async fn list_requests(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let requests = crate::db::list_requests(&state.db, params.status).await?;
    Ok(AxumJson(json!({ "requests": requests })))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub action: RequestAction,
}

pub async fn transition_request(
    Path(request_id): Path<i64>,
    State(state): State<AppState>,
    actor: NgoActor,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_status =
        lifecycle::transition_request(&state.db, request_id, req.action, actor.ngo_id).await?;
    Ok(AxumJson(json!({ "ok": true, "new_status": new_status })))
}
