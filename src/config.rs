//! Startup configuration, read from the environment (after `.env`).

use crate::error::ConfigError;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BOOTSTRAP_IMAGE: &str = "assets/default-leaf.png";

#[derive(Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub bind_addr: SocketAddr,
    /// Image shown with the built-in demo analysis before any upload.
    pub bootstrap_image: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing {
            name: "GEMINI_API_KEY",
        })?;

        let addr = get("LEAF_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidAddr {
            name: "LEAF_BIND_ADDR",
            value: addr.clone(),
        })?;

        Ok(Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind_addr,
            bootstrap_image: get("LEAF_BOOTSTRAP_IMAGE")
                .unwrap_or_else(|| DEFAULT_BOOTSTRAP_IMAGE.to_string())
                .into(),
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("bind_addr", &self.bind_addr)
            .field("bootstrap_image", &self.bootstrap_image)
            .finish()
    }
}
