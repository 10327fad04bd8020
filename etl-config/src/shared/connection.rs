use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};

use crate::shared::ValidationError;

/// Connection settings for one MySQL database plus the pool built on top of it.
///
/// Does not implement [`Serialize`] so the password cannot leak into serialized output.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database (schema) name.
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    #[serde(default = "TlsConfig::disabled")]
    pub tls: TlsConfig,
    /// Upper bound on open connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a query waits for a free connection before failing.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Connections older than this are closed and replaced.
    #[serde(default = "default_max_lifetime_ms")]
    pub max_lifetime_ms: u64,
}

impl MySqlConnectionConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
    pub const DEFAULT_MIN_CONNECTIONS: u32 = 4;
    pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_MAX_LIFETIME_MS: u64 = 180_000;

    /// Validates TLS and pool sizing.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        self.tls.validate()?;

        if self.max_connections == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("{field}.max_connections"),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("{field}.min_connections"),
                constraint: format!("must not exceed max_connections ({})", self.max_connections),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM encoded certificates used to verify the server.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Converts connection configuration into driver connect options.
pub trait IntoConnectOptions<Output> {
    /// Options for the server only, used to create or drop databases.
    fn without_db(&self) -> Output;
    /// Options for the configured database.
    fn with_db(&self) -> Output;
}

impl IntoConnectOptions<MySqlConnectOptions> for MySqlConnectionConfig {
    fn without_db(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username);

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        if self.tls.enabled {
            options
                .ssl_mode(MySqlSslMode::VerifyIdentity)
                .ssl_ca_from_pem(self.tls.trusted_root_certs.clone().into_bytes())
        } else {
            options.ssl_mode(MySqlSslMode::Preferred)
        }
    }

    fn with_db(&self) -> MySqlConnectOptions {
        self.without_db().database(&self.name)
    }
}

fn default_max_connections() -> u32 {
    MySqlConnectionConfig::DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    MySqlConnectionConfig::DEFAULT_MIN_CONNECTIONS
}

fn default_acquire_timeout_ms() -> u64 {
    MySqlConnectionConfig::DEFAULT_ACQUIRE_TIMEOUT_MS
}

fn default_max_lifetime_ms() -> u64 {
    MySqlConnectionConfig::DEFAULT_MAX_LIFETIME_MS
}
