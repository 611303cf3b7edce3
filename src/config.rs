use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Public URL this service is reachable at. Callback and login links are
    /// built from it; left unset in local development.
    pub base_url: Option<String>,

    #[serde(default = "default_index_endpoint")]
    pub index_endpoint: String,
    pub index_api_key: Option<String>,
    pub index_parent_id: Option<String>,

    pub postmark_server_token: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rss-alert");
    data_dir.join("alerts.db").to_string_lossy().to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_index_endpoint() -> String {
    "https://api.operand.ai".to_string()
}

fn default_mail_from() -> String {
    "rssalert@operand.ai".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            base_url: None,
            index_endpoint: default_index_endpoint(),
            index_api_key: None,
            index_parent_id: None,
            postmark_server_token: None,
            mail_from: default_mail_from(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rss-alert")
            .join("config.toml")
    }

    /// Deploy-time values (host, credentials) usually come from the environment
    /// rather than the config file.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("RSS_ALERT_DB_PATH") {
            self.db_path = v;
        }
        if let Some(v) = var("RSS_ALERT_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Some(v) = var("RSS_ALERT_INDEX_ENDPOINT") {
            self.index_endpoint = v;
        }
        if let Some(v) = var("RSS_ALERT_INDEX_API_KEY") {
            self.index_api_key = Some(v);
        }
        if let Some(v) = var("RSS_ALERT_INDEX_PARENT_ID") {
            self.index_parent_id = Some(v);
        }
        if let Some(v) = var("RSS_ALERT_POSTMARK_TOKEN") {
            self.postmark_server_token = Some(v);
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| {
                AppError::Config(format!("invalid listen_addr {}: {}", self.listen_addr, e))
            })
    }

    /// Base URL for links handed to the index service and to users. Falls back
    /// to the local development address when no public URL is configured.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let port = self.socket_addr().map(|a| a.port()).unwrap_or(3000);
                format!("http://localhost:{}", port)
            }
        }
    }

    pub fn require_index_api_key(&self) -> Result<&str> {
        self.index_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("index_api_key is required".to_string()))
    }
}
