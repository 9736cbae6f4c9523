//! In-memory administration storage implementation
//!
//! Uniqueness checks and writes happen under the same lock, so two racing
//! inserts on one username or client ID can never both succeed.

use crate::admin::types::{AuditEvent, Client, Token, User};
use crate::errors::StorageError;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation for administration storage
#[derive(Default)]
pub struct MemoryAdminStorage {
    users: Mutex<HashMap<String, User>>, // id -> user
    clients: Mutex<HashMap<String, Client>>, // client_id -> client
    tokens: Mutex<Vec<Token>>,
    audit_events: Mutex<Vec<AuditEvent>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::SerializationFailed(format!("Lock error: {}", e)))
}

impl MemoryAdminStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryAdminStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict(
                UniqueField::Username.describe(&user.username),
            ));
        }
        if users.contains_key(&user.id) {
            return Err(StorageError::Conflict(format!(
                "user id '{}' already exists",
                user.id
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let users = lock(&self.users)?;
        Ok(users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = lock(&self.users)?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = lock(&self.users)?;
        let mut result: Vec<User> = users.values().cloned().collect();
        result.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(result)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        if !users.contains_key(&user.id) {
            return Err(StorageError::NotFound(format!("user '{}'", user.id)));
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StorageError::Conflict(
                UniqueField::Username.describe(&user.username),
            ));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let mut users = lock(&self.users)?;
        users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("user '{}'", id)))
    }

    async fn count_users(&self) -> Result<u64> {
        let users = lock(&self.users)?;
        Ok(users.len() as u64)
    }
}

#[async_trait]
impl ClientStore for MemoryAdminStorage {
    async fn insert_client(&self, client: &Client) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        if clients.contains_key(&client.client_id) {
            return Err(StorageError::Conflict(
                UniqueField::ClientId.describe(&client.client_id),
            ));
        }
        clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        let clients = lock(&self.clients)?;
        Ok(clients.get(client_id).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let clients = lock(&self.clients)?;
        let mut result: Vec<Client> = clients.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.client_id.cmp(&b.client_id)));
        Ok(result)
    }

    async fn update_client(&self, client: &Client) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        if let std::collections::hash_map::Entry::Occupied(mut e) =
            clients.entry(client.client_id.clone())
        {
            e.insert(client.clone());
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("client '{}'", client.client_id)))
        }
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        clients
            .remove(client_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("client '{}'", client_id)))
    }

    async fn count_clients(&self) -> Result<u64> {
        let clients = lock(&self.clients)?;
        Ok(clients.len() as u64)
    }
}

#[async_trait]
impl TokenStore for MemoryAdminStorage {
    async fn insert_token(&self, token: &Token) -> Result<()> {
        let mut tokens = lock(&self.tokens)?;
        tokens.push(token.clone());
        Ok(())
    }

    async fn find_token(&self, signature: &str) -> Result<Option<Token>> {
        let tokens = lock(&self.tokens)?;
        Ok(tokens.iter().find(|t| t.signature == signature).cloned())
    }

    async fn list_tokens(&self) -> Result<Vec<Token>> {
        let tokens = lock(&self.tokens)?;
        Ok(tokens.clone())
    }

    async fn delete_token(&self, signature: &str) -> Result<()> {
        let mut tokens = lock(&self.tokens)?;
        tokens.retain(|t| t.signature != signature);
        Ok(())
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tokens = lock(&self.tokens)?;
        let before = tokens.len();
        tokens.retain(|t| !t.is_expired_at(now));
        Ok(before - tokens.len())
    }

    async fn count_active_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let tokens = lock(&self.tokens)?;
        Ok(tokens.iter().filter(|t| !t.is_expired_at(now)).count() as u64)
    }
}

#[async_trait]
impl AuditStore for MemoryAdminStorage {
    async fn record_event(&self, event: &AuditEvent) -> Result<()> {
        let mut events = lock(&self.audit_events)?;
        events.push(event.clone());
        Ok(())
    }

    async fn list_recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let events = lock(&self.audit_events)?;
        let mut recent: Vec<AuditEvent> = events.clone();
        // Stable sort keeps insertion order for equal timestamps, reversed below
        recent.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        recent.reverse();
        recent.truncate(limit);
        Ok(recent)
    }
}

impl AdminStorage for MemoryAdminStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::types::{GrantType, ResponseType, Role, TokenKind};
    use chrono::Duration;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn client(client_id: &str, name: &str) -> Client {
        Client {
            client_id: client_id.to_string(),
            client_secret_hash: "$argon2id$placeholder".to_string(),
            name: name.to_string(),
            redirect_uris: vec!["https://a.example/cb".to_string()],
            grant_types: vec![GrantType::AuthorizationCode],
            response_types: vec![ResponseType::Code],
            scopes: vec![],
            jwks_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn token(signature: &str, expires_at: DateTime<Utc>) -> Token {
        Token {
            signature: signature.to_string(),
            kind: TokenKind::RefreshToken,
            client_id: "client".to_string(),
            user_id: None,
            scopes: vec![],
            created_at: expires_at - Duration::hours(1),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_username_uniqueness() {
        let storage = MemoryAdminStorage::new();
        storage.insert_user(&user("1", "alice")).await.unwrap();

        let err = storage.insert_user(&user("2", "alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let existing = storage.find_user("1").await.unwrap().unwrap();
        assert_eq!(existing.username, "alice");
        assert!(storage.find_user("2").await.unwrap().is_none());

        storage.insert_user(&user("2", "bob")).await.unwrap();
        let err = storage.update_user(&user("2", "alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let err = storage.ensure_unique(UniqueField::Username, "bob").await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        storage.ensure_unique(UniqueField::Username, "carol").await.unwrap();
    }

    #[tokio::test]
    async fn test_client_lifecycle() {
        let storage = MemoryAdminStorage::new();
        storage.insert_client(&client("c2", "Zeta")).await.unwrap();
        storage.insert_client(&client("c1", "Alpha")).await.unwrap();

        let err = storage.insert_client(&client("c1", "Dup")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let names: Vec<String> = storage
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        storage.delete_client("c1").await.unwrap();
        let err = storage.delete_client("c1").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = storage.update_client(&client("c1", "Gone")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(storage.count_clients().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_tokens_are_purged() {
        let storage = MemoryAdminStorage::new();
        let now = Utc::now();

        storage
            .insert_token(&token("expired", now - Duration::seconds(1)))
            .await
            .unwrap();
        storage.insert_token(&token("boundary", now)).await.unwrap();
        storage
            .insert_token(&token("live", now + Duration::minutes(5)))
            .await
            .unwrap();

        // Not yet swept: the expired record is still readable
        let stale = storage.find_token("expired").await.unwrap().unwrap();
        assert!(stale.is_expired_at(now));
        assert_eq!(storage.count_active_tokens(now).await.unwrap(), 1);

        let purged = storage.purge_expired_tokens(now).await.unwrap();
        assert_eq!(purged, 2);

        let remaining = storage.list_tokens().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].signature, "live");
        assert!(storage.find_token("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_signature_not_unique() {
        let storage = MemoryAdminStorage::new();
        let expires_at = Utc::now() + Duration::minutes(5);
        storage.insert_token(&token("sig", expires_at)).await.unwrap();
        storage.insert_token(&token("sig", expires_at)).await.unwrap();
        assert_eq!(storage.list_tokens().await.unwrap().len(), 2);

        storage.delete_token("sig").await.unwrap();
        assert!(storage.list_tokens().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_audit_events_newest_first() {
        use crate::admin::types::AuditEventType;

        let storage = MemoryAdminStorage::new();
        let start = Utc::now();
        for i in 0..3 {
            storage
                .record_event(&AuditEvent {
                    id: format!("e{}", i),
                    timestamp: start + Duration::seconds(i),
                    event_type: AuditEventType::ClientCreated,
                    target_id: format!("c{}", i),
                    details: String::new(),
                })
                .await
                .unwrap();
        }

        let recent = storage.list_recent_events(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }
}
