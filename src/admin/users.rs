//! Provider user administration.

use crate::admin::audit::AuditTrail;
use crate::admin::credentials::{derive_credential, generate_user_id};
use crate::admin::fields::{check_password, parse_role, parse_username};
use crate::admin::types::*;
use crate::errors::{AdminError, Result};
use crate::storage::traits::{AdminStorage, UniqueField};
use chrono::Utc;
use std::sync::Arc;

/// User Administration Service
pub struct UserAdministrationService {
    storage: Arc<dyn AdminStorage>,
    audit: AuditTrail,
    /// Minimum accepted password length
    password_min_length: usize,
}

impl UserAdministrationService {
    pub fn new(storage: Arc<dyn AdminStorage>, password_min_length: usize) -> Self {
        Self {
            audit: AuditTrail::new(storage.clone()),
            storage,
            password_min_length,
        }
    }

    /// Create an account. A taken username fails with `Conflict`.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserView> {
        let username = parse_username(&request.username)?;
        check_password(&request.password, self.password_min_length)?;
        let role = parse_role(&request.role)?;

        let password_hash = derive_credential(request.password).await?;
        let now = Utc::now();

        let user = User {
            id: generate_user_id(),
            username,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        };

        // The store's unique index decides between racing creates
        self.storage.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        self.audit
            .record(
                AuditEventType::UserCreated,
                &user.id,
                format!("Admin created user '{}' with role {}.", user.username, user.role),
            )
            .await;

        Ok(UserView::from(&user))
    }

    /// All users ordered by username; empty when none exist
    pub async fn list_users(&self) -> Result<Vec<UserView>> {
        let users = self.storage.list_users().await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn get_user(&self, id: &str) -> Result<UserView> {
        let user = self.load_user(id).await?;
        Ok(UserView::from(&user))
    }

    /// Apply the provided fields. The id never changes.
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> Result<UserView> {
        let mut user = self.load_user(id).await?;

        if let Some(username) = &request.username {
            let username = parse_username(username)?;
            if username != user.username {
                self.storage
                    .ensure_unique(UniqueField::Username, &username)
                    .await?;
                user.username = username;
            }
        }

        if let Some(role) = &request.role {
            user.role = parse_role(role)?;
        }

        // An empty password keeps the current credential
        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            check_password(&password, self.password_min_length)?;
            user.password_hash = derive_credential(password).await?;
        }

        user.updated_at = Utc::now();

        // Re-checked atomically by the store in case the name was taken meanwhile
        self.storage.update_user(&user).await?;

        tracing::info!(user_id = %user.id, "user updated");
        self.audit
            .record(
                AuditEventType::UserUpdated,
                &user.id,
                format!("Admin updated user '{}'.", user.username),
            )
            .await;

        Ok(UserView::from(&user))
    }

    /// Hard delete. A repeated delete reports `NotFound`.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.storage.delete_user(id).await?;

        tracing::info!(user_id = %id, "user deleted");
        self.audit
            .record(AuditEventType::UserDeleted, id, "Admin deleted user via API.")
            .await;

        Ok(())
    }

    async fn load_user(&self, id: &str) -> Result<User> {
        self.storage
            .find_user(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("user '{}'", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::credentials::verify_secret;
    use crate::storage::inmemory::MemoryAdminStorage;
    use crate::storage::traits::UserStore;

    fn service() -> (Arc<MemoryAdminStorage>, UserAdministrationService) {
        let storage = Arc::new(MemoryAdminStorage::new());
        let service = UserAdministrationService::new(storage.clone(), 8);
        (storage, service)
    }

    fn request(username: &str, role: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "correct-horse".to_string(),
            role: role.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let (storage, service) = service();
        let view = service.create_user(request("alice", "admin")).await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.role, Role::Admin);

        let stored = storage.find_user(&view.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "correct-horse");
        assert!(verify_secret("correct-horse", &stored.password_hash).unwrap());

        let json = serde_json::to_string(&service.list_users().await.unwrap()).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains(&stored.password_hash));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (storage, service) = service();
        let original = service.create_user(request("alice", "admin")).await.unwrap();

        let err = service.create_user(request("alice", "user")).await.unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        let stored = storage.find_user(&original.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let (_, service) = service();

        let (first, second) = futures::join!(
            service.create_user(request("racer", "user")),
            service.create_user(request("racer", "user")),
        );

        let outcomes = [first, second];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(AdminError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let (_, service) = service();

        let err = service.create_user(request("", "user")).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let err = service.create_user(request("bob", "superuser")).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let mut short = request("bob", "user");
        short.password = "short".to_string();
        let err = service.create_user(short).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert!(!err.to_string().contains("short"));
    }

    #[tokio::test]
    async fn test_update_user_rechecks_username() {
        let (storage, service) = service();
        let alice = service.create_user(request("alice", "user")).await.unwrap();
        service.create_user(request("bob", "user")).await.unwrap();

        let err = service
            .update_user(
                &alice.id,
                UpdateUserRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        // Keeping the same username is not a conflict
        let updated = service
            .update_user(
                &alice.id,
                UpdateUserRequest {
                    username: Some("alice".to_string()),
                    role: Some("admin".to_string()),
                    password: Some("another-password".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, alice.id);
        assert_eq!(updated.role, Role::Admin);

        let stored = storage.find_user(&alice.id).await.unwrap().unwrap();
        assert!(verify_secret("another-password", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_update_with_empty_password_keeps_credential() {
        let (storage, service) = service();
        let alice = service.create_user(request("alice", "user")).await.unwrap();
        let before = storage.find_user(&alice.id).await.unwrap().unwrap();

        let updated = service
            .update_user(
                &alice.id,
                UpdateUserRequest {
                    password: Some(String::new()),
                    role: Some("admin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);

        let stored = storage.find_user(&alice.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, before.password_hash);
        assert!(verify_secret("correct-horse", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (_, service) = service();
        let alice = service.create_user(request("alice", "user")).await.unwrap();

        service.delete_user(&alice.id).await.unwrap();
        let err = service.delete_user(&alice.id).await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));

        let err = service.get_user(&alice.id).await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
        assert!(service.list_users().await.unwrap().is_empty());
    }
}
