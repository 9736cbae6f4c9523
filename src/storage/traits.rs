//! Storage trait definitions for administration records.
//!
//! Defines async storage interfaces for users, clients, tokens, and audit
//! events. Backends enforce uniqueness of `users.username` and
//! `clients.client_id` atomically at insert/update time and expire tokens
//! once `expires_at` has been reached.

use crate::admin::types::{AuditEvent, Client, Token, User};
use crate::errors::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Fields carrying a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    /// `users.username`
    Username,
    /// `clients.client_id`
    ClientId,
}

impl UniqueField {
    pub fn describe(&self, value: &str) -> String {
        match self {
            UniqueField::Username => format!("username '{}' is already taken", value),
            UniqueField::ClientId => format!("client_id '{}' already exists", value),
        }
    }
}

/// Storage for provider user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, failing with `Conflict` if the username is taken
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Retrieve a user by ID
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    /// Retrieve a user by exact username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List all users ordered by username
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replace a stored user, failing with `NotFound` or `Conflict`
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Hard delete, failing with `NotFound` if absent
    async fn delete_user(&self, id: &str) -> Result<()>;

    /// Number of stored users
    async fn count_users(&self) -> Result<u64>;
}

/// Storage for registered OAuth clients
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Insert a new client, failing with `Conflict` if the client ID exists
    async fn insert_client(&self, client: &Client) -> Result<()>;

    /// Retrieve a client by client ID
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>>;

    /// List all clients ordered by name
    async fn list_clients(&self) -> Result<Vec<Client>>;

    /// Replace a stored client, failing with `NotFound` if absent
    async fn update_client(&self, client: &Client) -> Result<()>;

    /// Hard delete, failing with `NotFound` if absent
    async fn delete_client(&self, client_id: &str) -> Result<()>;

    /// Number of stored clients
    async fn count_clients(&self) -> Result<u64>;
}

/// Storage for token records.
///
/// Expired tokens are purged by the store on its own schedule, so reads may
/// still return a token whose `expires_at` has passed. Callers that depend on
/// validity must check [`Token::is_expired_at`] themselves.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a token record
    async fn insert_token(&self, token: &Token) -> Result<()>;

    /// Retrieve a token by signature
    async fn find_token(&self, signature: &str) -> Result<Option<Token>>;

    /// List all stored tokens, including expired ones not yet purged
    async fn list_tokens(&self) -> Result<Vec<Token>>;

    /// Delete every token with the given signature
    async fn delete_token(&self, signature: &str) -> Result<()>;

    /// Remove tokens whose expiry is at or before `now`, returning how many were removed
    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Number of tokens still valid at `now`
    async fn count_active_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Storage for the administrative audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an audit event
    async fn record_event(&self, event: &AuditEvent) -> Result<()>;

    /// Most recent events, newest first
    async fn list_recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>>;
}

// ===== Combined Storage Trait =====

/// Combined administration storage trait
#[async_trait]
pub trait AdminStorage: UserStore + ClientStore + TokenStore + AuditStore + Send + Sync {
    /// Check that no record holds `value` in a unique field.
    ///
    /// Advisory only: inserts and updates still enforce the constraint
    /// atomically, so a passing check never guarantees a later write succeeds.
    async fn ensure_unique(&self, field: UniqueField, value: &str) -> Result<()> {
        let taken = match field {
            UniqueField::Username => self.find_user_by_username(value).await?.is_some(),
            UniqueField::ClientId => self.find_client(value).await?.is_some(),
        };
        if taken {
            return Err(StorageError::Conflict(field.describe(value)));
        }
        Ok(())
    }
}
