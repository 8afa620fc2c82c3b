use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateFeedbackRequest {
    pub donation_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
}

pub async fn create_feedback(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feedback_id = crate::db::create_feedback(
        &state.db,
        user.actor_id,
        req.donation_id,
        req.rating,
        req.comment.as_deref().unwrap_or(""),
    )
    .await?;
    Ok((StatusCode::CREATED, AxumJson(json!({ "status": "created", "feedback_id": feedback_id }))))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let feedback = crate::db::list_feedback(&state.db).await?;
    Ok(AxumJson(json!({ "feedback": feedback })))
}
