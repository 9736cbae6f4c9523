//! Aggregate statistics and recent activity for the admin dashboard.

use crate::admin::audit::AuditTrail;
use crate::admin::types::{AuditEvent, DashboardStats};
use crate::errors::Result;
use crate::storage::traits::AdminStorage;
use chrono::Utc;
use std::sync::Arc;

pub struct DashboardService {
    storage: Arc<dyn AdminStorage>,
    audit: AuditTrail,
    recent_limit: usize,
}

impl DashboardService {
    pub fn new(storage: Arc<dyn AdminStorage>, recent_limit: usize) -> Self {
        Self {
            audit: AuditTrail::new(storage.clone()),
            storage,
            recent_limit,
        }
    }

    /// Counts across the store. Tokens past expiry but not yet swept are not active.
    pub async fn stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            total_clients: self.storage.count_clients().await?,
            total_users: self.storage.count_users().await?,
            active_tokens: self.storage.count_active_tokens(Utc::now()).await?,
        })
    }

    /// Latest audit events, newest first
    pub async fn recent_activity(&self) -> Result<Vec<AuditEvent>> {
        self.audit.recent(self.recent_limit).await
    }
}
