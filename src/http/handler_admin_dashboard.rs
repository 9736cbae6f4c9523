//! Handles dashboard reads and anti-forgery token issuance

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    admin::types::{AuditEvent, DashboardStats},
    errors::Result,
    http::{context::AppState, middleware_csrf::AntiForgeryVerifier},
};

#[derive(Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    Ok(Json(state.dashboard_service.stats().await?))
}

pub async fn audit_handler(State(state): State<AppState>) -> Result<Json<Vec<AuditEvent>>> {
    Ok(Json(state.dashboard_service.recent_activity().await?))
}

pub async fn csrf_token_handler(
    State(verifier): State<Arc<dyn AntiForgeryVerifier>>,
) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        csrf_token: verifier.issue(),
    })
}
