//! Environment-based configuration types for the administration server.

use anyhow::Result;
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;

/// Minimum accepted anti-forgery key length in bytes
pub const CSRF_KEY_MIN_LENGTH: usize = 32;

/// Lowest password length floor an operator may configure
pub const PASSWORD_MIN_LENGTH_FLOOR: usize = 8;

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// Deployment environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Staging,
    Production,
}

/// Key used to sign anti-forgery tokens
#[derive(Clone, Default)]
pub struct CsrfAuthKey(Option<Vec<u8>>);

/// Password length floor configuration
#[derive(Clone)]
pub struct PasswordMinLength(usize);

/// Token sweep period configuration
#[derive(Clone)]
pub struct TokenSweepInterval(Duration);

/// Lifetime of an issued anti-forgery token
#[derive(Clone)]
pub struct CsrfTokenTtl(Duration);

/// Allowed CORS origins configuration
#[derive(Clone, Default)]
pub struct CorsAllowedOrigins(Vec<String>);

/// Number of audit events shown on the dashboard
#[derive(Clone)]
pub struct AuditRecentLimit(usize);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub app_env: AppEnvironment,
    pub http_port: HttpPort,
    pub storage_backend: String,
    pub database_url: Option<String>,
    pub csrf_auth_key: CsrfAuthKey,
    pub csrf_token_ttl: CsrfTokenTtl,
    pub password_min_length: PasswordMinLength,
    pub token_sweep_interval: TokenSweepInterval,
    pub cors_allowed_origins: CorsAllowedOrigins,
    pub audit_recent_limit: AuditRecentLimit,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_env = |name: &str, default_value: &str| {
            lookup(name).unwrap_or_else(|| default_value.to_string())
        };

        let app_env: AppEnvironment = default_env("APP_ENV", "development").try_into()?;
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let database_url = lookup("DATABASE_URL");
        let csrf_auth_key: CsrfAuthKey = lookup("CSRF_AUTH_KEY").try_into()?;
        let csrf_token_ttl: CsrfTokenTtl = default_env("CSRF_TOKEN_TTL", "1h").try_into()?;
        let password_min_length: PasswordMinLength =
            default_env("PASSWORD_MIN_LENGTH", "8").try_into()?;
        let token_sweep_interval: TokenSweepInterval =
            default_env("TOKEN_SWEEP_INTERVAL", "60s").try_into()?;
        let cors_allowed_origins: CorsAllowedOrigins =
            lookup("CORS_ALLOWED_ORIGINS").try_into()?;
        let audit_recent_limit: AuditRecentLimit =
            default_env("AUDIT_RECENT_LIMIT", "10").try_into()?;

        if app_env.csrf_protected() && csrf_auth_key.as_ref().is_none() {
            return Err(ConfigError::EnvVarRequired("CSRF_AUTH_KEY".to_string()).into());
        }

        Ok(Self {
            version: version()?,
            app_env,
            http_port,
            storage_backend,
            database_url,
            csrf_auth_key,
            csrf_token_ttl,
            password_min_length,
            token_sweep_interval,
            cors_allowed_origins,
            audit_recent_limit,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

impl AppEnvironment {
    /// Anti-forgery checks are skipped only in development
    pub fn csrf_protected(&self) -> bool {
        !matches!(self, AppEnvironment::Development)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Staging => "staging",
            AppEnvironment::Production => "production",
        })
    }
}

impl TryFrom<String> for AppEnvironment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownEnvironment(value)),
        }
    }
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<Option<String>> for CsrfAuthKey {
    type Error = ConfigError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value.filter(|v| !v.is_empty()) {
            None => Ok(Self(None)),
            Some(key) if key.len() < CSRF_KEY_MIN_LENGTH => {
                Err(ConfigError::CsrfKeyTooShort(CSRF_KEY_MIN_LENGTH))
            }
            Some(key) => Ok(Self(Some(key.into_bytes()))),
        }
    }
}

impl AsRef<Option<Vec<u8>>> for CsrfAuthKey {
    fn as_ref(&self) -> &Option<Vec<u8>> {
        &self.0
    }
}

impl TryFrom<String> for PasswordMinLength {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let length = value.trim().parse::<usize>().map_err(|e| {
            ConfigError::InvalidNumber("PASSWORD_MIN_LENGTH".to_string(), e.to_string())
        })?;
        if length < PASSWORD_MIN_LENGTH_FLOOR {
            return Err(ConfigError::InvalidNumber(
                "PASSWORD_MIN_LENGTH".to_string(),
                format!("must be at least {}", PASSWORD_MIN_LENGTH_FLOOR),
            ));
        }
        Ok(Self(length))
    }
}

impl AsRef<usize> for PasswordMinLength {
    fn as_ref(&self) -> &usize {
        &self.0
    }
}

impl TryFrom<String> for TokenSweepInterval {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value.clone(), e.to_string()))?;
        if duration.is_zero() {
            return Err(ConfigError::DurationParsingFailed(
                value,
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for TokenSweepInterval {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for CsrfTokenTtl {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value.clone(), e.to_string()))?;
        if duration.is_zero() {
            return Err(ConfigError::DurationParsingFailed(
                value,
                "token lifetime must be greater than zero".to_string(),
            ));
        }
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for CsrfTokenTtl {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<Option<String>> for CorsAllowedOrigins {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let value = value.unwrap_or_default();
        let origins = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        Ok(Self(origins))
    }
}

impl AsRef<Vec<String>> for CorsAllowedOrigins {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for AuditRecentLimit {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<usize>()
            .map(Self)
            .map_err(|e| {
                ConfigError::InvalidNumber("AUDIT_RECENT_LIMIT".to_string(), e.to_string())
            })
    }
}

impl AsRef<usize> for AuditRecentLimit {
    fn as_ref(&self) -> &usize {
        &self.0
    }
}
