//! Application state and request context management.

use axum::extract::FromRef;
use std::sync::Arc;

use crate::admin::{ClientAdministrationService, DashboardService, UserAdministrationService};
use crate::config::Config;
use crate::errors::ConfigError;
use crate::http::middleware_csrf::{AntiForgeryVerifier, CsrfTokenManager};
use crate::storage::traits::AdminStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client_service: Arc<ClientAdministrationService>,
    pub user_service: Arc<UserAdministrationService>,
    pub dashboard_service: Arc<DashboardService>,
    /// Issues and verifies anti-forgery tokens
    pub csrf_verifier: Arc<dyn AntiForgeryVerifier>,
    /// Whether mutating requests must carry an anti-forgery token
    pub csrf_enforced: bool,
}

impl AppState {
    /// Wire the services over `storage`
    pub fn new(config: Config, storage: Arc<dyn AdminStorage>) -> Result<Self, ConfigError> {
        let ttl = *config.csrf_token_ttl.as_ref();
        let csrf_manager = match config.csrf_auth_key.as_ref() {
            Some(key) => CsrfTokenManager::new(key, ttl)?,
            None => CsrfTokenManager::ephemeral(ttl)?,
        };

        Ok(Self {
            client_service: Arc::new(ClientAdministrationService::new(storage.clone())),
            user_service: Arc::new(UserAdministrationService::new(
                storage.clone(),
                *config.password_min_length.as_ref(),
            )),
            dashboard_service: Arc::new(DashboardService::new(
                storage,
                *config.audit_recent_limit.as_ref(),
            )),
            csrf_enforced: config.app_env.csrf_protected(),
            csrf_verifier: Arc::new(csrf_manager),
            config: Arc::new(config),
        })
    }
}

impl FromRef<AppState> for Arc<dyn AntiForgeryVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.csrf_verifier.clone()
    }
}
