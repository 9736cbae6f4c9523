//! OAuth client administration.
//!
//! Handles client creation, validation, and credential issuance. The
//! plaintext secret leaves this module exactly once, in [`CreatedClient`];
//! only its Argon2 hash is stored.

use crate::admin::audit::AuditTrail;
use crate::admin::credentials::{
    check_credential, derive_credential, generate_client_id, generate_token,
};
use crate::admin::fields::{
    check_grant_response_compatibility, parse_client_name, parse_grant_types,
    parse_jwks_url, parse_redirect_uris, parse_response_types, parse_scopes,
};
use crate::admin::types::*;
use crate::errors::{AdminError, Result};
use crate::storage::traits::AdminStorage;
use chrono::Utc;
use std::sync::Arc;

impl TryFrom<CreateClientRequest> for NewClient {
    type Error = AdminError;

    fn try_from(request: CreateClientRequest) -> Result<Self> {
        let grant_types = parse_grant_types(&request.grant_types)?;
        let response_types = parse_response_types(&request.response_types)?;
        check_grant_response_compatibility(&grant_types, &response_types)?;

        Ok(NewClient {
            name: parse_client_name(&request.name)?,
            redirect_uris: parse_redirect_uris(&request.redirect_uris)?,
            grant_types,
            response_types,
            scopes: parse_scopes(&request.scopes)?,
            jwks_url: match request.jwks_url.as_deref() {
                Some(jwks_url) => parse_jwks_url(jwks_url)?,
                None => None,
            },
        })
    }
}

/// Validate the mutable fields of an update; absent fields stay `None`
fn parse_client_changes(request: &UpdateClientRequest) -> Result<ClientChanges> {
    Ok(ClientChanges {
        name: request.name.as_deref().map(parse_client_name).transpose()?,
        redirect_uris: request
            .redirect_uris
            .as_ref()
            .map(parse_redirect_uris)
            .transpose()?,
        grant_types: request
            .grant_types
            .as_deref()
            .map(parse_grant_types)
            .transpose()?,
        response_types: request
            .response_types
            .as_deref()
            .map(parse_response_types)
            .transpose()?,
        scopes: request.scopes.as_ref().map(parse_scopes).transpose()?,
        jwks_url: request.jwks_url.as_deref().map(parse_jwks_url).transpose()?,
    })
}

impl ClientChanges {
    /// Replace each provided field on `client`
    pub fn apply_to(self, client: &mut Client) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if let Some(redirect_uris) = self.redirect_uris {
            client.redirect_uris = redirect_uris;
        }
        if let Some(grant_types) = self.grant_types {
            client.grant_types = grant_types;
        }
        if let Some(response_types) = self.response_types {
            client.response_types = response_types;
        }
        if let Some(scopes) = self.scopes {
            client.scopes = scopes;
        }
        if let Some(jwks_url) = self.jwks_url {
            client.jwks_url = jwks_url;
        }
    }
}

/// Client Administration Service
pub struct ClientAdministrationService {
    storage: Arc<dyn AdminStorage>,
    audit: AuditTrail,
}

impl ClientAdministrationService {
    /// Create a new client administration service
    pub fn new(storage: Arc<dyn AdminStorage>) -> Self {
        Self {
            audit: AuditTrail::new(storage.clone()),
            storage,
        }
    }

    /// Register a new client and disclose its secret once
    pub async fn create_client(&self, request: CreateClientRequest) -> Result<CreatedClient> {
        let new_client = NewClient::try_from(request)?;

        let client_secret = generate_token();
        let client_secret_hash = derive_credential(client_secret.clone()).await?;
        let now = Utc::now();

        let client = Client {
            client_id: generate_client_id(),
            client_secret_hash,
            name: new_client.name,
            redirect_uris: new_client.redirect_uris,
            grant_types: new_client.grant_types,
            response_types: new_client.response_types,
            scopes: new_client.scopes,
            jwks_url: new_client.jwks_url,
            created_at: now,
            updated_at: now,
        };

        self.storage.insert_client(&client).await?;

        tracing::info!(client_id = %client.client_id, name = %client.name, "client created");
        self.audit
            .record(
                AuditEventType::ClientCreated,
                &client.client_id,
                format!("Admin created client '{}' via API.", client.name),
            )
            .await;

        Ok(CreatedClient {
            client: ClientView::from(&client),
            client_secret,
        })
    }

    /// Apply the provided fields to an existing client
    pub async fn update_client(
        &self,
        client_id: &str,
        request: UpdateClientRequest,
    ) -> Result<ClientView> {
        let mut client = self.load_client(client_id).await?;

        self.check_immutable_fields(&client, &request.immutable)
            .await?;
        let changes = parse_client_changes(&request)?;

        changes.apply_to(&mut client);
        check_grant_response_compatibility(&client.grant_types, &client.response_types)?;
        client.updated_at = Utc::now();

        self.storage.update_client(&client).await?;

        tracing::info!(client_id = %client.client_id, "client updated");
        self.audit
            .record(
                AuditEventType::ClientUpdated,
                &client.client_id,
                format!("Admin updated client '{}' via API.", client.name),
            )
            .await;

        Ok(ClientView::from(&client))
    }

    /// Echoed identifiers must match the stored record exactly
    async fn check_immutable_fields(
        &self,
        client: &Client,
        immutable: &ImmutableClientFields,
    ) -> Result<()> {
        if let Some(client_id) = &immutable.client_id
            && client_id != &client.client_id
        {
            return Err(AdminError::Validation(
                "client_id cannot be changed".to_string(),
            ));
        }

        if let Some(client_secret) = &immutable.client_secret {
            let matches =
                check_credential(client_secret.clone(), client.client_secret_hash.clone()).await?;
            if !matches {
                return Err(AdminError::Validation(
                    "client_secret cannot be changed".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub async fn get_client(&self, client_id: &str) -> Result<ClientView> {
        let client = self.load_client(client_id).await?;
        Ok(ClientView::from(&client))
    }

    /// All clients ordered by name; empty when none exist
    pub async fn list_clients(&self) -> Result<Vec<ClientView>> {
        let clients = self.storage.list_clients().await?;
        Ok(clients.iter().map(ClientView::from).collect())
    }

    /// Hard delete. A repeated delete reports `NotFound`.
    pub async fn delete_client(&self, client_id: &str) -> Result<()> {
        self.storage.delete_client(client_id).await?;

        tracing::info!(client_id = %client_id, "client deleted");
        self.audit
            .record(
                AuditEventType::ClientDeleted,
                client_id,
                "Admin deleted client via API.",
            )
            .await;

        Ok(())
    }

    /// Check a presented secret against the stored hash
    pub async fn verify_client_secret(&self, client_id: &str, client_secret: &str) -> Result<bool> {
        let client = self.load_client(client_id).await?;
        Ok(check_credential(client_secret.to_string(), client.client_secret_hash).await?)
    }

    async fn load_client(&self, client_id: &str) -> Result<Client> {
        self.storage
            .find_client(client_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("client '{}'", client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::inmemory::MemoryAdminStorage;
    use crate::storage::traits::ClientStore;

    fn service() -> (Arc<MemoryAdminStorage>, ClientAdministrationService) {
        let storage = Arc::new(MemoryAdminStorage::new());
        let service = ClientAdministrationService::new(storage.clone());
        (storage, service)
    }

    fn cli_tool_request() -> CreateClientRequest {
        CreateClientRequest {
            name: "CLI Tool".to_string(),
            redirect_uris: FreeTextList::from(vec![
                "https://a.example/cb",
                "  ",
                "https://b.example/cb",
            ]),
            grant_types: vec!["authorization_code".to_string()],
            response_types: vec!["code".to_string()],
            scopes: FreeTextList::from(vec!["read write"]),
            jwks_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_client_normalizes_fields() {
        let (storage, service) = service();

        let created = service.create_client(cli_tool_request()).await.unwrap();
        assert!(!created.client_secret.is_empty());
        assert_eq!(
            created.client.redirect_uris,
            vec!["https://a.example/cb", "https://b.example/cb"]
        );
        assert_eq!(created.client.scopes, vec!["read", "write"]);

        let stored = storage
            .find_client(&created.client.client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.redirect_uris, created.client.redirect_uris);
        assert_ne!(stored.client_secret_hash, created.client_secret);
        assert!(
            service
                .verify_client_secret(&stored.client_id, &created.client_secret)
                .await
                .unwrap()
        );
        assert!(
            !service
                .verify_client_secret(&stored.client_id, "not-the-secret")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_secret_never_returned_by_reads() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        let other = service.create_client(cli_tool_request()).await.unwrap();
        assert_ne!(created.client.client_id, other.client.client_id);
        assert_ne!(created.client_secret, other.client_secret);

        let fetched = service.get_client(&created.client.client_id).await.unwrap();
        let json = serde_json::to_string(&fetched).unwrap();
        assert!(!json.contains(&created.client_secret));
        assert!(!json.contains("client_secret"));

        let listed = serde_json::to_string(&service.list_clients().await.unwrap()).unwrap();
        assert!(!listed.contains(&created.client_secret));
        assert!(!listed.contains(&other.client_secret));
    }

    #[tokio::test]
    async fn test_create_client_validation() {
        let (storage, service) = service();

        let mut request = cli_tool_request();
        request.name = "   ".to_string();
        let err = service.create_client(request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let mut request = cli_tool_request();
        request.redirect_uris = FreeTextList::from(vec![" ", ""]);
        let err = service.create_client(request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let mut request = cli_tool_request();
        request.grant_types = vec!["implicit".to_string()];
        let err = service.create_client(request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let mut request = cli_tool_request();
        request.response_types = vec![];
        let err = service.create_client(request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        assert_eq!(storage.count_clients().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_without_grant_types_keeps_them() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        let client_id = created.client.client_id.clone();

        let request = UpdateClientRequest {
            name: Some("Renamed".to_string()),
            scopes: Some(FreeTextList::from("openid")),
            ..Default::default()
        };
        let updated = service.update_client(&client_id, request).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.scopes, vec!["openid"]);
        assert_eq!(updated.grant_types, vec![GrantType::AuthorizationCode]);
        assert_eq!(updated.redirect_uris, created.client.redirect_uris);
    }

    #[tokio::test]
    async fn test_update_with_blank_redirect_uris_fails() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        let client_id = created.client.client_id.clone();

        let request = UpdateClientRequest {
            name: Some("Renamed".to_string()),
            redirect_uris: Some(FreeTextList::from("  \n  ")),
            ..Default::default()
        };
        let err = service.update_client(&client_id, request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        // Rejected requests leave the record untouched
        let current = service.get_client(&client_id).await.unwrap();
        assert_eq!(current.name, "CLI Tool");
    }

    #[tokio::test]
    async fn test_update_rejects_changed_identifiers() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        let client_id = created.client.client_id.clone();

        let request = UpdateClientRequest {
            immutable: ImmutableClientFields {
                client_id: Some("another-id".to_string()),
                client_secret: None,
            },
            ..Default::default()
        };
        let err = service.update_client(&client_id, request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let request = UpdateClientRequest {
            immutable: ImmutableClientFields {
                client_id: None,
                client_secret: Some("guessed-secret".to_string()),
            },
            ..Default::default()
        };
        let err = service.update_client(&client_id, request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        // Echoing the unchanged values is accepted
        let request = UpdateClientRequest {
            name: Some("Same Identity".to_string()),
            immutable: ImmutableClientFields {
                client_id: Some(client_id.clone()),
                client_secret: Some(created.client_secret.clone()),
            },
            ..Default::default()
        };
        let updated = service.update_client(&client_id, request).await.unwrap();
        assert_eq!(updated.client_id, client_id);
        assert!(
            service
                .verify_client_secret(&client_id, &created.client_secret)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_checks_merged_compatibility() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();

        let request = UpdateClientRequest {
            response_types: Some(vec!["token".to_string()]),
            ..Default::default()
        };
        let err = service
            .update_client(&created.client.client_id, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[tokio::test]
    async fn test_jwks_url_set_keep_and_clear() {
        let (_, service) = service();
        let mut request = cli_tool_request();
        request.jwks_url = Some("https://a.example/jwks.json".to_string());
        let created = service.create_client(request).await.unwrap();
        let client_id = created.client.client_id.clone();
        assert_eq!(
            created.client.jwks_url.as_deref(),
            Some("https://a.example/jwks.json")
        );

        let request = UpdateClientRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = service.update_client(&client_id, request).await.unwrap();
        assert_eq!(
            updated.jwks_url.as_deref(),
            Some("https://a.example/jwks.json")
        );

        let request = UpdateClientRequest {
            jwks_url: Some("not a url".to_string()),
            ..Default::default()
        };
        let err = service.update_client(&client_id, request).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let request = UpdateClientRequest {
            jwks_url: Some(String::new()),
            ..Default::default()
        };
        let updated = service.update_client(&client_id, request).await.unwrap();
        assert_eq!(updated.jwks_url, None);
    }

    #[tokio::test]
    async fn test_update_missing_client() {
        let (_, service) = service();
        let err = service
            .update_client("missing", UpdateClientRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_client_twice() {
        let (_, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        let client_id = created.client.client_id;

        service.delete_client(&client_id).await.unwrap();
        let err = service.delete_client(&client_id).await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));

        let err = service.delete_client("never-existed").await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
        assert!(service.list_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_audited() {
        let (storage, service) = service();
        let created = service.create_client(cli_tool_request()).await.unwrap();
        service.delete_client(&created.client.client_id).await.unwrap();

        let trail = AuditTrail::new(storage);
        let events = trail.recent(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::ClientDeleted);
        assert_eq!(events[1].event_type, AuditEventType::ClientCreated);
        assert_eq!(events[1].target_id, created.client.client_id);
    }
}
