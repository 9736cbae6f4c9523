//! Administration records, enumerations, and request/response shapes.
//!
//! Records are what the storage layer persists. Request shapes are what the
//! HTTP layer deserializes; they are validated into the `New*`/`*Changes`
//! types before any record is touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OAuth grant types a client may be permitted to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
}

impl GrantType {
    pub const ALL: [GrantType; 5] = [
        GrantType::AuthorizationCode,
        GrantType::ClientCredentials,
        GrantType::RefreshToken,
        GrantType::DeviceCode,
        GrantType::JwtBearer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
            GrantType::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            GrantType::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
        }
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrantType::ALL
            .into_iter()
            .find(|grant_type| grant_type.as_str() == s)
            .ok_or_else(|| format!("unsupported grant type '{}'", s))
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth response types a client may be permitted to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
    IdToken,
}

impl ResponseType {
    pub const ALL: [ResponseType; 3] = [
        ResponseType::Code,
        ResponseType::Token,
        ResponseType::IdToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
            ResponseType::IdToken => "id_token",
        }
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResponseType::ALL
            .into_iter()
            .find(|response_type| response_type.as_str() == s)
            .ok_or_else(|| format!("unsupported response type '{}'", s))
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("unknown role '{}': expected admin or user", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a stored token record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    AuthCode,
    RefreshToken,
    DeviceCode,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::AuthCode => "auth_code",
            TokenKind::RefreshToken => "refresh_token",
            TokenKind::DeviceCode => "device_code",
        }
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth_code" => Ok(TokenKind::AuthCode),
            "refresh_token" => Ok(TokenKind::RefreshToken),
            "device_code" => Ok(TokenKind::DeviceCode),
            _ => Err(format!("unknown token kind '{}'", s)),
        }
    }
}

/// Provider user account
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct User {
    /// System generated identifier
    pub id: String,
    /// Globally unique login name
    pub username: String,
    /// Argon2 PHC string, never the plaintext
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registered OAuth client
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct Client {
    /// Globally unique client identifier
    pub client_id: String,
    /// Argon2 PHC string of the secret issued at creation
    pub client_secret_hash: String,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<ResponseType>,
    pub scopes: Vec<String>,
    /// Key set used to verify client-signed assertions
    pub jwks_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token record written by the token issuance flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Hash of the raw token value, indexed but not unique
    pub signature: String,
    pub kind: TokenKind,
    pub client_id: String,
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// The store removes the record once this instant has passed
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token is expired at `now`, regardless of whether it was purged yet
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Audited administrative actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    ClientCreated,
    ClientUpdated,
    ClientDeleted,
    UserCreated,
    UserUpdated,
    UserDeleted,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ClientCreated => "CLIENT_CREATED",
            AuditEventType::ClientUpdated => "CLIENT_UPDATED",
            AuditEventType::ClientDeleted => "CLIENT_DELETED",
            AuditEventType::UserCreated => "USER_CREATED",
            AuditEventType::UserUpdated => "USER_UPDATED",
            AuditEventType::UserDeleted => "USER_DELETED",
        }
    }
}

impl FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT_CREATED" => Ok(AuditEventType::ClientCreated),
            "CLIENT_UPDATED" => Ok(AuditEventType::ClientUpdated),
            "CLIENT_DELETED" => Ok(AuditEventType::ClientDeleted),
            "USER_CREATED" => Ok(AuditEventType::UserCreated),
            "USER_UPDATED" => Ok(AuditEventType::UserUpdated),
            "USER_DELETED" => Ok(AuditEventType::UserDeleted),
            _ => Err(format!("unknown audit event type '{}'", s)),
        }
    }
}

/// Recorded administrative action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub target_id: String,
    pub details: String,
}

/// Free-text list input: either one delimited string or a list of strings.
///
/// Each element is split again on the field's delimiter, so a list entry may
/// itself carry several values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FreeTextList {
    Text(String),
    Items(Vec<String>),
}

impl Default for FreeTextList {
    fn default() -> Self {
        FreeTextList::Items(Vec::new())
    }
}

impl From<Vec<&str>> for FreeTextList {
    fn from(items: Vec<&str>) -> Self {
        FreeTextList::Items(items.into_iter().map(String::from).collect())
    }
}

impl From<&str> for FreeTextList {
    fn from(text: &str) -> Self {
        FreeTextList::Text(text.to_string())
    }
}

/// Payload for creating a client. Carries no identifier or secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateClientRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub redirect_uris: FreeTextList,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    #[serde(default)]
    pub scopes: FreeTextList,
    #[serde(default)]
    pub jwks_url: Option<String>,
}

/// Identifier fields a caller may echo back on update. They can never be changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImmutableClientFields {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Payload for updating a client. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub redirect_uris: Option<FreeTextList>,
    pub grant_types: Option<Vec<String>>,
    pub response_types: Option<Vec<String>>,
    pub scopes: Option<FreeTextList>,
    /// An empty string clears the stored URL
    pub jwks_url: Option<String>,
    #[serde(flatten)]
    pub immutable: ImmutableClientFields,
}

/// Validated client creation input
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<ResponseType>,
    pub scopes: Vec<String>,
    pub jwks_url: Option<String>,
}

/// Validated client changes. Only mutable fields exist here.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub grant_types: Option<Vec<GrantType>>,
    pub response_types: Option<Vec<ResponseType>>,
    pub scopes: Option<Vec<String>>,
    /// `Some(None)` clears the URL
    pub jwks_url: Option<Option<String>>,
}

/// Client projection returned by reads and updates; never carries the secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    pub client_id: String,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<ResponseType>,
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
}

impl From<&Client> for ClientView {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.client_id.clone(),
            name: client.name.clone(),
            redirect_uris: client.redirect_uris.clone(),
            grant_types: client.grant_types.clone(),
            response_types: client.response_types.clone(),
            scopes: client.scopes.clone(),
            jwks_url: client.jwks_url.clone(),
        }
    }
}

/// Creation response: the only place the plaintext secret ever appears
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedClient {
    #[serde(flatten)]
    pub client: ClientView,
    pub client_secret: String,
}

/// Payload for creating a user
#[derive(Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// Payload for updating a user. Absent fields are left unchanged.
#[derive(Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// User projection; never carries the credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Aggregate counts for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_clients: u64,
    pub total_users: u64,
    pub active_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_wire_names() {
        for grant_type in GrantType::ALL {
            let json = serde_json::to_string(&grant_type).unwrap();
            assert_eq!(json, format!("\"{}\"", grant_type.as_str()));
            assert_eq!(grant_type.as_str().parse::<GrantType>().unwrap(), grant_type);
        }
        assert!("implicit".parse::<GrantType>().is_err());
    }

    #[test]
    fn test_free_text_list_accepts_string_or_array() {
        let text: FreeTextList = serde_json::from_str("\"read write\"").unwrap();
        assert!(matches!(text, FreeTextList::Text(ref s) if s == "read write"));

        let items: FreeTextList = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert!(matches!(items, FreeTextList::Items(ref v) if v.len() == 2));
    }

    #[test]
    fn test_update_request_absent_fields() {
        let request: UpdateClientRequest =
            serde_json::from_str(r#"{"name": "Renamed", "client_id": "abc"}"#).unwrap();
        assert_eq!(request.name.as_deref(), Some("Renamed"));
        assert!(request.grant_types.is_none());
        assert!(request.redirect_uris.is_none());
        assert_eq!(request.immutable.client_id.as_deref(), Some("abc"));
        assert!(request.immutable.client_secret.is_none());
    }

    #[test]
    fn test_created_client_flattens_view() {
        let created = CreatedClient {
            client: ClientView {
                client_id: "cid".to_string(),
                name: "CLI Tool".to_string(),
                redirect_uris: vec!["https://a.example/cb".to_string()],
                grant_types: vec![GrantType::AuthorizationCode],
                response_types: vec![ResponseType::Code],
                scopes: vec!["read".to_string()],
                jwks_url: None,
            },
            client_secret: "s3cret".to_string(),
        };
        let value = serde_json::to_value(&created).unwrap();
        assert_eq!(value["client_id"], "cid");
        assert_eq!(value["client_secret"], "s3cret");
        assert_eq!(value["grant_types"][0], "authorization_code");
        assert!(value.get("jwks_url").is_none());
    }
}
