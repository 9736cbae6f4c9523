//! PostgreSQL implementation for OAuth client storage

use super::{from_jsonb, to_jsonb};
use crate::admin::types::Client;
use crate::errors::StorageError;
use crate::storage::map_write_error;
use crate::storage::traits::{ClientStore, Result, UniqueField};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of OAuth client storage
pub struct PostgresClientStore {
    pool: PgPool,
}

impl PostgresClientStore {
    /// Create a new PostgreSQL client store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert PostgreSQL row to Client
    fn row_to_client(row: &PgRow) -> Result<Client> {
        let map_err =
            |e: sqlx::Error| StorageError::DatabaseError(format!("Failed to read client: {}", e));
        let json = |column: &str| -> Result<serde_json::Value> {
            row.try_get(column).map_err(map_err)
        };

        Ok(Client {
            client_id: row.try_get("client_id").map_err(map_err)?,
            client_secret_hash: row.try_get("client_secret_hash").map_err(map_err)?,
            name: row.try_get("name").map_err(map_err)?,
            redirect_uris: from_jsonb("redirect_uris", json("redirect_uris")?)?,
            grant_types: from_jsonb("grant_types", json("grant_types")?)?,
            response_types: from_jsonb("response_types", json("response_types")?)?,
            scopes: from_jsonb("scopes", json("scopes")?)?,
            jwks_url: row.try_get("jwks_url").map_err(map_err)?,
            created_at: row.try_get("created_at").map_err(map_err)?,
            updated_at: row.try_get("updated_at").map_err(map_err)?,
        })
    }
}

#[async_trait]
impl ClientStore for PostgresClientStore {
    async fn insert_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (
                client_id, client_secret_hash, name, redirect_uris, grant_types,
                response_types, scopes, jwks_url, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret_hash)
        .bind(&client.name)
        .bind(to_jsonb(&client.redirect_uris)?)
        .bind(to_jsonb(&client.grant_types)?)
        .bind(to_jsonb(&client.response_types)?)
        .bind(to_jsonb(&client.scopes)?)
        .bind(&client.jwks_url)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || UniqueField::ClientId.describe(&client.client_id)))?;

        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        let row = sqlx::query("SELECT * FROM clients WHERE client_id = $1")
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
                name = $2, redirect_uris = $3, grant_types = $4, response_types = $5,
                scopes = $6, jwks_url = $7, updated_at = $8
            WHERE client_id = $1
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.name)
        .bind(to_jsonb(&client.redirect_uris)?)
        .bind(to_jsonb(&client.grant_types)?)
        .bind(to_jsonb(&client.response_types)?)
        .bind(to_jsonb(&client.scopes)?)
        .bind(&client.jwks_url)
        .bind(client.updated_at)
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
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
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
