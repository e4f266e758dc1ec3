use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// Sender key that catches notifications for senders with no entry of their own.
pub const WILDCARD_SENDER: &str = "*";

/// Upper bound on the size of the sender mapping file.
pub const MAX_SENDER_CONFIG_BYTES: u64 = 2 << 20;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP listener binds to
    pub listen_addr: String,

    /// Path to the JSON sender → backend mapping
    pub sender_config_path: String,

    /// HTTP Basic auth user; auth is enforced only when user and password are both set
    pub basic_auth_user: String,

    /// HTTP Basic auth password
    pub basic_auth_pass: String,

    /// Capacity of each per-sender remediation queue (default: 100)
    pub queue_capacity: usize,

    /// Domain a subscription confirmation URL must belong to before it is followed
    pub confirm_trusted_domain: String,

    /// Timeout for inbound request handling and the outbound confirmation call
    pub http_timeout_secs: u64,

    /// Maximum number of MySQL connections per sender pool (default: 5)
    pub db_max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "localhost:8080".to_string(),
            sender_config_path: "mapping.json".to_string(),
            basic_auth_user: String::new(),
            basic_auth_pass: String::new(),
            queue_capacity: 100,
            confirm_trusted_domain: "amazonaws.com".to_string(),
            http_timeout_secs: 30,
            db_max_connections: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            sender_config_path: std::env::var("SENDER_CONFIG_PATH")
                .unwrap_or(defaults.sender_config_path),
            basic_auth_user: std::env::var("BASIC_AUTH_USER").unwrap_or_default(),
            basic_auth_pass: std::env::var("BASIC_AUTH_PASS").unwrap_or_default(),
            queue_capacity: std::env::var("QUEUE_CAPACITY")
                .unwrap_or_else(|_| defaults.queue_capacity.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_CAPACITY must be a valid usize"))?,
            confirm_trusted_domain: std::env::var("CONFIRM_TRUSTED_DOMAIN")
                .unwrap_or(defaults.confirm_trusted_domain),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.http_timeout_secs.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| defaults.db_max_connections.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
        };

        if config.queue_capacity == 0 {
            anyhow::bail!("QUEUE_CAPACITY must be greater than zero");
        }

        Ok(config)
    }

    /// Whether inbound requests must carry Basic credentials.
    ///
    /// Both values have to be set; configuring only one of them leaves the
    /// endpoint open.
    pub fn basic_auth_enabled(&self) -> bool {
        !self.basic_auth_user.is_empty() && !self.basic_auth_pass.is_empty()
    }
}

/// Backend settings for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SenderBackend {
    /// MySQL connection URL
    pub dsn: String,

    /// Statement run once per remediated address, with a single `?` placeholder
    pub sql: String,
}

/// Sender address (or [`WILDCARD_SENDER`]) → backend settings.
pub type SenderMapping = BTreeMap<String, SenderBackend>;

/// Read, decode and validate the sender mapping file.
pub fn load_sender_mapping(path: impl AsRef<Path>) -> Result<SenderMapping, AppError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mapping: SenderMapping = serde_json::from_reader(file.take(MAX_SENDER_CONFIG_BYTES))
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

    validate_sender_mapping(&mapping)?;

    tracing::info!(
        path = %path.display(),
        senders = mapping.len(),
        wildcard = mapping.contains_key(WILDCARD_SENDER),
        "Sender mapping loaded"
    );
    Ok(mapping)
}

/// Reject mappings the relay cannot start with.
pub fn validate_sender_mapping(mapping: &SenderMapping) -> Result<(), AppError> {
    if mapping.is_empty() {
        return Err(AppError::Config("empty config".to_string()));
    }

    for (sender, backend) in mapping {
        if backend.dsn.is_empty() || backend.sql.is_empty() {
            return Err(AppError::Config(format!(
                "invalid record for {:?}, all fields should be non-empty",
                sender
            )));
        }
        if backend.sql.matches('?').count() != 1 {
            return Err(AppError::Config(format!(
                "invalid sql for {:?}: expected exactly 1 placeholder",
                sender
            )));
        }
    }

    Ok(())
}
