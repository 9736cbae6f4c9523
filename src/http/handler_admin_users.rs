//! Handles /api/admin/users - provider account administration

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    admin::types::{CreateUserRequest, UpdateUserRequest, UserView},
    errors::Result,
    http::{context::AppState, utils_json::json_body},
};

pub async fn list_users_handler(State(state): State<AppState>) -> Result<Json<Vec<UserView>>> {
    Ok(Json(state.user_service.list_users().await?))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>)> {
    let request = json_body(payload)?;
    let user = state.user_service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserView>> {
    Ok(Json(state.user_service.get_user(&id).await?))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserView>> {
    let request = json_body(payload)?;
    Ok(Json(state.user_service.update_user(&id, request).await?))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.user_service.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
