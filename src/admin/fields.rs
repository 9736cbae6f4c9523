//! Parsing and validation of administrative request fields.
//!
//! Delimiter rules:
//! - redirect URIs are split on newlines
//! - scopes are split on any whitespace
//!
//! Every token is trimmed and blank tokens are discarded before validation.
//! A required field is rejected only when nothing is left after that.

use url::Url;

use crate::admin::types::{FreeTextList, GrantType, ResponseType, Role};
use crate::errors::AdminError;

type Result<T> = std::result::Result<T, AdminError>;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 64;
pub const NAME_MAX_LENGTH: usize = 200;
pub const MAX_REDIRECT_URIS: usize = 20;

/// Split every element on `delimiter`, trim, drop blanks, keep first occurrences
fn tokenize(input: &FreeTextList, delimiter: impl Fn(&str) -> Vec<&str>) -> Vec<String> {
    let elements: Vec<&str> = match input {
        FreeTextList::Text(text) => vec![text.as_str()],
        FreeTextList::Items(items) => items.iter().map(String::as_str).collect(),
    };

    let mut tokens: Vec<String> = Vec::new();
    for element in elements {
        for token in delimiter(element) {
            let token = token.trim();
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
    }
    tokens
}

/// Newline-delimited tokens
pub fn split_lines(input: &FreeTextList) -> Vec<String> {
    tokenize(input, |element| element.lines().collect())
}

/// Whitespace-delimited tokens
pub fn split_words(input: &FreeTextList) -> Vec<String> {
    tokenize(input, |element| element.split_whitespace().collect())
}

/// Validate the client display name
pub fn parse_client_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::Validation("name is required".to_string()));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(AdminError::Validation(format!(
            "name must be at most {} characters",
            NAME_MAX_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Parse and validate the redirect URI list; at least one URI is required
pub fn parse_redirect_uris(input: &FreeTextList) -> Result<Vec<String>> {
    let uris = split_lines(input);
    if uris.is_empty() {
        return Err(AdminError::Validation(
            "redirect_uris must contain at least one URI".to_string(),
        ));
    }
    if uris.len() > MAX_REDIRECT_URIS {
        return Err(AdminError::Validation(format!(
            "Too many redirect URIs: {} (max: {})",
            uris.len(),
            MAX_REDIRECT_URIS
        )));
    }
    for uri in &uris {
        validate_redirect_uri(uri)?;
    }
    Ok(uris)
}

/// Validate a redirect URI
fn validate_redirect_uri(uri: &str) -> Result<()> {
    let parsed = Url::parse(uri)
        .map_err(|e| AdminError::Validation(format!("Invalid redirect URI '{}': {}", uri, e)))?;

    // Must use HTTPS (except for localhost for development)
    match parsed.scheme() {
        "https" => {}
        "http" => match parsed.host_str() {
            Some(host) if host == "localhost" || host == "127.0.0.1" || host == "[::1]" => {}
            Some(_) => {
                return Err(AdminError::Validation(format!(
                    "Redirect URI '{}': HTTP is only allowed for localhost",
                    uri
                )));
            }
            None => {
                return Err(AdminError::Validation(format!(
                    "Redirect URI '{}' has no host",
                    uri
                )));
            }
        },
        _ => {
            return Err(AdminError::Validation(format!(
                "Redirect URI '{}' must use HTTP or HTTPS",
                uri
            )));
        }
    }

    if parsed.fragment().is_some() {
        return Err(AdminError::Validation(format!(
            "Redirect URI '{}' must not contain a fragment",
            uri
        )));
    }

    Ok(())
}

/// Parse grant types; at least one is required
pub fn parse_grant_types(values: &[String]) -> Result<Vec<GrantType>> {
    let grant_types = parse_enumerated::<GrantType>(values)?;
    if grant_types.is_empty() {
        return Err(AdminError::Validation(
            "grant_types must contain at least one grant type".to_string(),
        ));
    }
    Ok(grant_types)
}

/// Parse response types; the set may be empty
pub fn parse_response_types(values: &[String]) -> Result<Vec<ResponseType>> {
    parse_enumerated::<ResponseType>(values)
}

fn parse_enumerated<T>(values: &[String]) -> Result<Vec<T>>
where
    T: std::str::FromStr<Err = String> + PartialEq,
{
    let mut parsed: Vec<T> = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        let item = value.parse::<T>().map_err(AdminError::Validation)?;
        if !parsed.contains(&item) {
            parsed.push(item);
        }
    }
    Ok(parsed)
}

/// `authorization_code` clients must be allowed the `code` response type
pub fn check_grant_response_compatibility(
    grant_types: &[GrantType],
    response_types: &[ResponseType],
) -> Result<()> {
    if grant_types.contains(&GrantType::AuthorizationCode)
        && !response_types.contains(&ResponseType::Code)
    {
        return Err(AdminError::Validation(
            "authorization_code grant requires code response type".to_string(),
        ));
    }
    Ok(())
}

/// Parse scope tokens; the set may be empty
pub fn parse_scopes(input: &FreeTextList) -> Result<Vec<String>> {
    let scopes = split_words(input);
    for scope in &scopes {
        let valid = scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'));
        if !valid {
            return Err(AdminError::Validation(format!("Invalid scope: {}", scope)));
        }
    }
    Ok(scopes)
}

/// Parse an optional JWKS URL; blank means none
pub fn parse_jwks_url(value: &str) -> Result<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let parsed = Url::parse(value)
        .map_err(|e| AdminError::Validation(format!("Invalid JWKS URL '{}': {}", value, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(AdminError::Validation(format!(
            "JWKS URL '{}' must be an absolute HTTP or HTTPS URL",
            value
        )));
    }

    Ok(Some(value.to_string()))
}

/// Validate a username
pub fn parse_username(username: &str) -> Result<String> {
    let username = username.trim();
    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH || length > USERNAME_MAX_LENGTH {
        return Err(AdminError::Validation(format!(
            "username must be between {} and {} characters",
            USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AdminError::Validation(
            "username must not contain whitespace".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Enforce the password length floor. The password itself is never echoed.
pub fn check_password(password: &str, min_length: usize) -> Result<()> {
    if password.chars().count() < min_length {
        return Err(AdminError::Validation(format!(
            "password must be at least {} characters",
            min_length
        )));
    }
    Ok(())
}

pub fn parse_role(role: &str) -> Result<Role> {
    role.trim().parse::<Role>().map_err(AdminError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_uris_trim_and_drop_blanks() {
        let input = FreeTextList::from(vec!["https://a.example/cb", "  ", "https://b.example/cb"]);
        let uris = parse_redirect_uris(&input).unwrap();
        assert_eq!(uris, vec!["https://a.example/cb", "https://b.example/cb"]);
    }

    #[test]
    fn test_redirect_uris_newline_delimited_text() {
        let input = FreeTextList::from("https://a.example/cb\r\n\n  https://b.example/cb  \n");
        let uris = parse_redirect_uris(&input).unwrap();
        assert_eq!(uris, vec!["https://a.example/cb", "https://b.example/cb"]);
    }

    #[test]
    fn test_redirect_uris_empty_after_trimming() {
        let input = FreeTextList::from(vec!["   ", "\n"]);
        let err = parse_redirect_uris(&input).unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[test]
    fn test_redirect_uri_rules() {
        assert!(parse_redirect_uris(&FreeTextList::from("http://localhost:3000/cb")).is_ok());
        assert!(parse_redirect_uris(&FreeTextList::from("http://example.com/cb")).is_err());
        assert!(parse_redirect_uris(&FreeTextList::from("/relative/cb")).is_err());
        assert!(parse_redirect_uris(&FreeTextList::from("https://a.example/cb#frag")).is_err());
        assert!(parse_redirect_uris(&FreeTextList::from("ftp://a.example/cb")).is_err());
    }

    #[test]
    fn test_jwks_url() {
        assert_eq!(parse_jwks_url("  ").unwrap(), None);
        assert_eq!(
            parse_jwks_url(" https://a.example/jwks.json ").unwrap().as_deref(),
            Some("https://a.example/jwks.json")
        );
        assert!(parse_jwks_url("jwks.json").is_err());
        assert!(parse_jwks_url("file:///etc/jwks.json").is_err());
    }

    #[test]
    fn test_scopes_split_on_whitespace() {
        let scopes = parse_scopes(&FreeTextList::from(vec!["read write"])).unwrap();
        assert_eq!(scopes, vec!["read", "write"]);

        let scopes = parse_scopes(&FreeTextList::from("  openid\tprofile  openid ")).unwrap();
        assert_eq!(scopes, vec!["openid", "profile"]);

        assert!(parse_scopes(&FreeTextList::default()).unwrap().is_empty());
        assert!(parse_scopes(&FreeTextList::from("read wr!te")).is_err());
    }

    #[test]
    fn test_grant_types_subset_of_enumeration() {
        let parsed = parse_grant_types(&[
            "authorization_code".to_string(),
            "refresh_token".to_string(),
            "authorization_code".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed, vec![GrantType::AuthorizationCode, GrantType::RefreshToken]);

        assert!(parse_grant_types(&["password".to_string()]).is_err());
        assert!(parse_grant_types(&[]).is_err());
    }

    #[test]
    fn test_response_types_may_be_empty() {
        assert!(parse_response_types(&[]).unwrap().is_empty());
        assert!(parse_response_types(&["code".to_string()]).is_ok());
        assert!(parse_response_types(&["hybrid".to_string()]).is_err());
    }

    #[test]
    fn test_grant_response_compatibility() {
        assert!(
            check_grant_response_compatibility(&[GrantType::AuthorizationCode], &[]).is_err()
        );
        assert!(
            check_grant_response_compatibility(&[GrantType::ClientCredentials], &[]).is_ok()
        );
    }

    #[test]
    fn test_user_fields() {
        assert_eq!(parse_username("  alice ").unwrap(), "alice");
        assert!(parse_username("al").is_err());
        assert!(parse_username("al ice").is_err());
        assert!(check_password("short", 8).is_err());
        assert!(check_password("long enough", 8).is_ok());
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert!(parse_role("root").is_err());
    }
}
