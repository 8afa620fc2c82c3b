use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::db::models::MatchStatus;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<MatchStatus>,
}

pub async fn list_matches(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let matches = crate::db::list_matches(&state.db, params.status).await?;
    Ok(AxumJson(json!({ "matches": matches })))
}
