//! PostgreSQL storage implementations
//!
//! This module provides PostgreSQL-based implementations of all storage traits.
//! PostgreSQL is suitable for production deployments with high availability requirements.

mod audit;
mod clients;
mod tokens;
mod users;

use crate::admin::types::{AuditEvent, Client, Token, User};
use crate::errors::StorageError;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgPool;
use std::sync::Arc;

pub use audit::PostgresAuditStore;
pub use clients::PostgresClientStore;
pub use tokens::PostgresTokenStore;
pub use users::PostgresUserStore;

/// Serialize a list into a JSONB value
pub(crate) fn to_jsonb<T: Serialize>(values: &[T]) -> Result<serde_json::Value> {
    serde_json::to_value(values).map_err(|e| StorageError::SerializationFailed(e.to_string()))
}

/// Deserialize a JSONB array column
pub(crate) fn from_jsonb<T: DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> Result<Vec<T>> {
    if !value.is_array() {
        return Err(StorageError::InvalidData(format!(
            "{} must be an array",
            column
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| StorageError::SerializationFailed(format!("{}: {}", column, e)))
}

/// Comprehensive PostgreSQL administration storage implementation
pub struct PostgresAdminStorage {
    pool: PgPool,
    user_store: Arc<PostgresUserStore>,
    client_store: Arc<PostgresClientStore>,
    token_store: Arc<PostgresTokenStore>,
    audit_store: Arc<PostgresAuditStore>,
}

impl PostgresAdminStorage {
    /// Create a new PostgreSQL administration storage instance
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_store: Arc::new(PostgresUserStore::new(pool.clone())),
            client_store: Arc::new(PostgresClientStore::new(pool.clone())),
            token_store: Arc::new(PostgresTokenStore::new(pool.clone())),
            audit_store: Arc::new(PostgresAuditStore::new(pool.clone())),
            pool,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresAdminStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.user_store.insert_user(user).await
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        self.user_store.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_store.find_user_by_username(username).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.user_store.list_users().await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.user_store.update_user(user).await
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        self.user_store.delete_user(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.user_store.count_users().await
    }
}

#[async_trait]
impl ClientStore for PostgresAdminStorage {
    async fn insert_client(&self, client: &Client) -> Result<()> {
        self.client_store.insert_client(client).await
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        self.client_store.find_client(client_id).await
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.client_store.list_clients().await
    }

    async fn update_client(&self, client: &Client) -> Result<()> {
        self.client_store.update_client(client).await
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        self.client_store.delete_client(client_id).await
    }

    async fn count_clients(&self) -> Result<u64> {
        self.client_store.count_clients().await
    }
}

#[async_trait]
impl TokenStore for PostgresAdminStorage {
    async fn insert_token(&self, token: &Token) -> Result<()> {
        self.token_store.insert_token(token).await
    }

    async fn find_token(&self, signature: &str) -> Result<Option<Token>> {
        self.token_store.find_token(signature).await
    }

    async fn list_tokens(&self) -> Result<Vec<Token>> {
        self.token_store.list_tokens().await
    }

    async fn delete_token(&self, signature: &str) -> Result<()> {
        self.token_store.delete_token(signature).await
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        self.token_store.purge_expired_tokens(now).await
    }

    async fn count_active_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        self.token_store.count_active_tokens(now).await
    }
}

#[async_trait]
impl AuditStore for PostgresAdminStorage {
    async fn record_event(&self, event: &AuditEvent) -> Result<()> {
        self.audit_store.record_event(event).await
    }

    async fn list_recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        self.audit_store.list_recent_events(limit).await
    }
}

impl AdminStorage for PostgresAdminStorage {}
