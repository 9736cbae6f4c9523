//! SQLite implementation for token storage

use super::millis_to_timestamp;
use crate::admin::types::{Token, TokenKind};
use crate::errors::StorageError;
use crate::storage::traits::{Result, TokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of token storage
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Create a new SQLite token store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert SQLite row to Token
    fn row_to_token(row: &SqliteRow) -> Result<Token> {
        let map_err =
            |e: sqlx::Error| StorageError::DatabaseError(format!("Failed to read token: {}", e));

        let kind: String = row.try_get("kind").map_err(map_err)?;
        let scopes_json: String = row.try_get("scopes").map_err(map_err)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_err)?;
        let expires_at: i64 = row.try_get("expires_at").map_err(map_err)?;

        Ok(Token {
            signature: row.try_get("signature").map_err(map_err)?,
            kind: kind.parse::<TokenKind>().map_err(StorageError::InvalidData)?,
            client_id: row.try_get("client_id").map_err(map_err)?,
            user_id: row.try_get("user_id").map_err(map_err)?,
            scopes: serde_json::from_str(&scopes_json)
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?,
            created_at: millis_to_timestamp("created_at", created_at)?,
            expires_at: millis_to_timestamp("expires_at", expires_at)?,
        })
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn insert_token(&self, token: &Token) -> Result<()> {
        let scopes_json = serde_json::to_string(&token.scopes)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO tokens (signature, kind, client_id, user_id, scopes, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.signature)
        .bind(token.kind.as_str())
        .bind(&token.client_id)
        .bind(&token.user_id)
        .bind(&scopes_json)
        .bind(token.created_at.timestamp_millis())
        .bind(token.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_token(&self, signature: &str) -> Result<Option<Token>> {
        let row = sqlx::query("SELECT * FROM tokens WHERE signature = ? ORDER BY id LIMIT 1")
            .bind(signature)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn list_tokens(&self) -> Result<Vec<Token>> {
        let rows = sqlx::query("SELECT * FROM tokens ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_token).collect()
    }

    async fn delete_token(&self, signature: &str) -> Result<()> {
        sqlx::query("DELETE FROM tokens WHERE signature = ?")
            .bind(signature)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(result.rows_affected() as usize)
    }

    async fn count_active_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE expires_at > ?")
            .bind(now.timestamp_millis())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(count as u64)
    }
}
