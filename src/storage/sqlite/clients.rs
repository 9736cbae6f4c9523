//! SQLite implementation for OAuth client storage

use super::parse_timestamp;
use crate::admin::types::Client;
use crate::errors::StorageError;
use crate::storage::map_write_error;
use crate::storage::traits::{ClientStore, Result, UniqueField};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of OAuth client storage
pub struct SqliteClientStore {
    pool: SqlitePool,
}

/// Serialize a list column to a JSON array string
fn to_json<T: Serialize>(values: &[T]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| StorageError::SerializationFailed(e.to_string()))
}

/// Deserialize a JSON array column
fn from_json<T: DeserializeOwned>(column: &str, json: &str) -> Result<Vec<T>> {
    serde_json::from_str(json)
        .map_err(|e| StorageError::SerializationFailed(format!("{}: {}", column, e)))
}

impl SqliteClientStore {
    /// Create a new SQLite client store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert SQLite row to Client
    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let get = |column: &str| -> Result<String> {
            row.try_get(column).map_err(|e| {
                StorageError::DatabaseError(format!("Failed to get {}: {}", column, e))
            })
        };

        Ok(Client {
            client_id: get("client_id")?,
            client_secret_hash: get("client_secret_hash")?,
            name: get("name")?,
            redirect_uris: from_json("redirect_uris", &get("redirect_uris")?)?,
            grant_types: from_json("grant_types", &get("grant_types")?)?,
            response_types: from_json("response_types", &get("response_types")?)?,
            scopes: from_json("scopes", &get("scopes")?)?,
            jwks_url: row.try_get("jwks_url").map_err(|e| {
                StorageError::DatabaseError(format!("Failed to get jwks_url: {}", e))
            })?,
            created_at: parse_timestamp("created_at", &get("created_at")?)?,
            updated_at: parse_timestamp("updated_at", &get("updated_at")?)?,
        })
    }
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn insert_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (
                client_id, client_secret_hash, name, redirect_uris, grant_types,
                response_types, scopes, jwks_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret_hash)
        .bind(&client.name)
        .bind(to_json(&client.redirect_uris)?)
        .bind(to_json(&client.grant_types)?)
        .bind(to_json(&client.response_types)?)
        .bind(to_json(&client.scopes)?)
        .bind(&client.jwks_url)
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || UniqueField::ClientId.describe(&client.client_id)))?;

        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        let row = sqlx::query("SELECT * FROM clients WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY name ASC, client_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_client).collect()
    }

    async fn update_client(&self, client: &Client) -> Result<()> {
        // client_id and client_secret_hash are never rewritten
        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?, redirect_uris = ?, grant_types = ?, response_types = ?,
                scopes = ?, jwks_url = ?, updated_at = ?
            WHERE client_id = ?
            "#,
        )
        .bind(&client.name)
        .bind(to_json(&client.redirect_uris)?)
        .bind(to_json(&client.grant_types)?)
        .bind(to_json(&client.response_types)?)
        .bind(to_json(&client.scopes)?)
        .bind(&client.jwks_url)
        .bind(client.updated_at.to_rfc3339())
        .bind(&client.client_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "Client not found: {}",
                client.client_id
            )));
        }

        Ok(())
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "Client not found: {}",
                client_id
            )));
        }

        Ok(())
    }

    async fn count_clients(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(count as u64)
    }
}
