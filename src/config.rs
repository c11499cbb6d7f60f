use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::{CtError, Result};
use crate::sct::LogKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub log_name: String,
    /// Hex-encoded SCT secret; a fresh one is generated when absent
    #[serde(skip_serializing)]
    pub log_secret: Option<String>,
    pub bootstrap_path: Option<PathBuf>,
    /// Upper bound on a live certificate fetch. The stock binary installs no
    /// `CertificateFetcher`, so this only takes effect for embedders that do.
    pub fetch_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 4000,
            log_name: "ct-service-log".to_string(),
            log_secret: None,
            bootstrap_path: None,
            fetch_timeout_ms: 5000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, with the same defaults as `load`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_host = get("CT_SERVER_HOST").unwrap_or(defaults.server_host);

        let server_port = match get("CT_SERVER_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| CtError::ConfigError(format!("CT_SERVER_PORT={}: {}", v, e)))?,
            None => defaults.server_port,
        };

        let log_name = get("CT_LOG_NAME").unwrap_or(defaults.log_name);

        let log_secret = get("CT_LOG_SECRET");

        let bootstrap_path = get("CT_BOOTSTRAP_PATH").map(PathBuf::from);

        let fetch_timeout_ms = match get("CT_FETCH_TIMEOUT_MS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| CtError::ConfigError(format!("CT_FETCH_TIMEOUT_MS={}: {}", v, e)))?,
            None => defaults.fetch_timeout_ms,
        };
        if fetch_timeout_ms == 0 {
            return Err(CtError::ConfigError(
                "CT_FETCH_TIMEOUT_MS must be positive".to_string(),
            ));
        }

        Ok(AppConfig {
            server_host,
            server_port,
            log_name,
            log_secret,
            bootstrap_path,
            fetch_timeout_ms,
        })
    }

    /// SCT secret from `CT_LOG_SECRET`, or a per-process random one
    pub fn log_key(&self) -> Result<LogKey> {
        match &self.log_secret {
            Some(secret) => LogKey::from_hex(secret.trim()),
            None => {
                warn!("CT_LOG_SECRET not set; SCTs issued by this process will not verify after restart");
                Ok(LogKey::generate())
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .map_err(|e| {
                CtError::ConfigError(format!(
                    "invalid bind address {}:{}: {}",
                    self.server_host, self.server_port, e
                ))
            })
    }
}
