//! PostgreSQL implementation for the audit trail

use crate::admin::types::{AuditEvent, AuditEventType};
use crate::errors::StorageError;
use crate::storage::traits::{AuditStore, Result};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of audit event storage
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    /// Create a new PostgreSQL audit store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &PgRow) -> Result<AuditEvent> {
        let map_err = |e: sqlx::Error| {
            StorageError::DatabaseError(format!("Failed to read audit event: {}", e))
        };

        let event_type: String = row.try_get("event_type").map_err(map_err)?;

        Ok(AuditEvent {
            id: row.try_get("id").map_err(map_err)?,
            timestamp: row.try_get("timestamp").map_err(map_err)?,
            event_type: event_type
                .parse::<AuditEventType>()
                .map_err(StorageError::InvalidData)?,
            target_id: row.try_get("target_id").map_err(map_err)?,
            details: row.try_get("details").map_err(map_err)?,
        })
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn record_event(&self, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (id, timestamp, event_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&event.id)
        .bind(event.timestamp)
        .bind(event.event_type.as_str())
        .bind(&event.target_id)
        .bind(&event.details)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn list_recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_events ORDER BY timestamp DESC, seq DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_event).collect()
    }
}
