//! Environment-level configuration, fixed at process start.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::auth::store::{FileTokenStore, MemoryTokenStore, TokenStore};
use crate::auth::OAuthConfig;
use crate::error::GatewayError;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback";
pub const DEFAULT_STORAGE_KEY: &str = "default";

/// Which [`TokenStore`] implementation backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(GatewayError::Config(format!(
                "unknown TOKEN_STORAGE backend: {other} (supported: file, memory)"
            ))),
        }
    }
}

/// Everything the gateway reads from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub oauth: OAuthConfig,
    pub storage_backend: StorageBackend,
    pub storage_key: String,
    pub token_file: PathBuf,
    pub ga4_property_id: Option<String>,
    pub bind_addr: SocketAddr,
}

impl GatewayConfig {
    /// Load from environment variables, honoring a `.env` file if present.
    pub fn from_env() -> Result<Self, GatewayError> {
        let _ = dotenvy::dotenv();

        let client_id = require_env("GOOGLE_CLIENT_ID")?;
        let client_secret = require_env("GOOGLE_CLIENT_SECRET")?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());

        let storage_backend = match std::env::var("TOKEN_STORAGE") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::File,
        };
        let storage_key = std::env::var("TOKEN_STORAGE_KEY")
            .unwrap_or_else(|_| DEFAULT_STORAGE_KEY.to_string());
        let token_file = std::env::var("TOKEN_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| FileTokenStore::default_path(&storage_key));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| GatewayError::Config(format!("invalid PORT: {value}")))?,
            Err(_) => 3000,
        };
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| GatewayError::Config(format!("invalid HOST/PORT: {host}:{port}")))?;

        Ok(Self {
            oauth: OAuthConfig {
                client_id,
                client_secret,
                redirect_uri,
            },
            storage_backend,
            storage_key,
            token_file,
            ga4_property_id: std::env::var("GA4_PROPERTY_ID").ok(),
            bind_addr,
        })
    }

    /// Construct the configured persistence backend.
    pub fn build_token_store(&self) -> Arc<dyn TokenStore> {
        match self.storage_backend {
            StorageBackend::File => Arc::new(FileTokenStore::new(self.token_file.clone())),
            StorageBackend::Memory => Arc::new(MemoryTokenStore::new()),
        }
    }
}

fn require_env(name: &str) -> Result<String, GatewayError> {
    std::env::var(name).map_err(|_| GatewayError::Config(format!("{name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_known_values() {
        assert_eq!("file".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
    }

    #[test]
    fn storage_backend_rejects_unknown_values() {
        let result = "firestore".parse::<StorageBackend>();
        assert!(
            matches!(result, Err(GatewayError::Config(message)) if message.contains("firestore"))
        );
    }

    #[test]
    fn storage_backend_display_round_trips() {
        for backend in [StorageBackend::File, StorageBackend::Memory] {
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
    }
}
