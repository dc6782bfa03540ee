use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Where the HTTP front-end listens, e.g. 127.0.0.1:8080
    pub listen: String,

    pub service_id: String,
    pub service_version: String,

    /// Backend endpoint receiving the multipart upload.
    pub backend_endpoint: String,

    /// Rewrite `http://` report URLs to `https://` before fetching them.
    pub force_https: bool,

    /// Timeout applied to each backend request.
    pub backend_timeout_seconds: u64,

    /// Directory for temporary archive copies. Purged on startup.
    pub tmp_dir: PathBuf,

    /// Max request body bytes (archives travel base64-encoded in the body).
    pub max_request_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            service_id: "eark-validator".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            backend_endpoint: String::new(),
            force_https: false,
            backend_timeout_seconds: 300,
            tmp_dir: std::env::temp_dir().join("archive-validator"),
            max_request_bytes: 200 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: ServiceConfig =
            toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend_endpoint.trim().is_empty() {
            anyhow::bail!("backend_endpoint must be configured");
        }
        if self.backend_timeout_seconds == 0 {
            anyhow::bail!("backend_timeout_seconds must be positive");
        }
        Ok(())
    }
}
