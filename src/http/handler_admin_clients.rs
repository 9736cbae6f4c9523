//! Handles /api/admin/clients - OAuth client administration

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    admin::types::{ClientView, CreateClientRequest, CreatedClient, UpdateClientRequest},
    errors::Result,
    http::{context::AppState, utils_json::json_body},
};

pub async fn list_clients_handler(State(state): State<AppState>) -> Result<Json<Vec<ClientView>>> {
    Ok(Json(state.client_service.list_clients().await?))
}

pub async fn create_client_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateClientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedClient>)> {
    let request = json_body(payload)?;
    let created = state.client_service.create_client(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientView>> {
    Ok(Json(state.client_service.get_client(&client_id).await?))
}

pub async fn update_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    payload: std::result::Result<Json<UpdateClientRequest>, JsonRejection>,
) -> Result<Json<ClientView>> {
    let request = json_body(payload)?;
    Ok(Json(
        state
            .client_service
            .update_client(&client_id, request)
            .await?,
    ))
}

pub async fn delete_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<StatusCode> {
    state.client_service.delete_client(&client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
