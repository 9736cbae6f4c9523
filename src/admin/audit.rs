//! Audit trail for administrative actions.

use crate::admin::types::{AuditEvent, AuditEventType};
use crate::errors::Result;
use crate::storage::traits::AdminStorage;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Records administrative actions against the audit store
#[derive(Clone)]
pub struct AuditTrail {
    storage: Arc<dyn AdminStorage>,
}

impl AuditTrail {
    pub fn new(storage: Arc<dyn AdminStorage>) -> Self {
        Self { storage }
    }

    /// Record an event. Failures are logged and never surface to the caller.
    pub async fn record(
        &self,
        event_type: AuditEventType,
        target_id: &str,
        details: impl Into<String>,
    ) {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            target_id: target_id.to_string(),
            details: details.into(),
        };

        if let Err(err) = self.storage.record_event(&event).await {
            tracing::warn!(
                error = ?err,
                event_type = event_type.as_str(),
                target_id,
                "failed to record audit event"
            );
        }
    }

    /// Most recent events, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        Ok(self.storage.list_recent_events(limit).await?)
    }
}
