use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONTENT_BASE_URL, DEFAULT_FEEDBACK_BASE_URL, ENV_BOT_TOKEN, ENV_CONFIG_PATH,
    ENV_CONTENT_BASE_URL, ENV_FEEDBACK_BASE_URL, ENV_KV_REST_TOKEN, ENV_KV_REST_URL,
    MAX_CATALOG_PAGE_SIZE,
};
use crate::error::{Result, SellerError};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seller_api: SellerApiConfig,
    pub catalog: CatalogConfig,
    pub feedback: FeedbackConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SellerApiConfig {
    pub content_base_url: String,
    pub feedback_base_url: String,
    pub timeout_seconds: u64,
    /// Sent as `locale` on catalog requests; empty disables it.
    pub locale: String,
}

impl Default for SellerApiConfig {
    fn default() -> Self {
        Self {
            content_base_url: DEFAULT_CONTENT_BASE_URL.to_string(),
            feedback_base_url: DEFAULT_FEEDBACK_BASE_URL.to_string(),
            timeout_seconds: 30,
            locale: "ru".to_string(),
        }
    }
}

impl SellerApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub max_items: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_CATALOG_PAGE_SIZE,
            max_items: 2000,
        }
    }
}

/// Pagination limits for the feedback endpoints. The defaults mirror limits
/// the feedback API enforces today but does not document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub reviews_partition_cap: usize,
    pub reviews_limit: usize,
    pub questions_page_size: usize,
    pub questions_offset_ceiling: usize,
    pub questions_limit: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            reviews_partition_cap: 500,
            reviews_limit: 500,
            questions_page_size: 1000,
            questions_offset_ceiling: 10_000,
            questions_limit: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
}

impl StoreConfig {
    /// Both settings are needed to reach the remote store.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (self.rest_url.as_deref(), self.rest_token.as_deref()) {
            (Some(url), Some(token)) if !url.trim().is_empty() && !token.trim().is_empty() => {
                Some((url, token))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub bot_token: Option<String>,
    pub max_age_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            max_age_seconds: 86_400,
        }
    }
}

impl Config {
    /// Load `.env`, then the TOML file (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SellerError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Overrides take a lookup function so tests do not touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_CONTENT_BASE_URL) {
            self.seller_api.content_base_url = url;
        }
        if let Some(url) = non_empty(ENV_FEEDBACK_BASE_URL) {
            self.seller_api.feedback_base_url = url;
        }
        if let Some(url) = non_empty(ENV_KV_REST_URL) {
            self.store.rest_url = Some(url);
        }
        if let Some(token) = non_empty(ENV_KV_REST_TOKEN) {
            self.store.rest_token = Some(token);
        }
        if let Some(token) = non_empty(ENV_BOT_TOKEN) {
            self.auth.bot_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("catalog.page_size", self.catalog.page_size),
            ("catalog.max_items", self.catalog.max_items),
            ("feedback.reviews_partition_cap", self.feedback.reviews_partition_cap),
            ("feedback.reviews_limit", self.feedback.reviews_limit),
            ("feedback.questions_limit", self.feedback.questions_limit),
            ("feedback.questions_page_size", self.feedback.questions_page_size),
            ("feedback.questions_offset_ceiling", self.feedback.questions_offset_ceiling),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(SellerError::Config(format!("{} must be > 0", name)));
            }
        }
        if self.seller_api.timeout_seconds == 0 {
            return Err(SellerError::Config("seller_api.timeout_seconds must be > 0".into()));
        }
        Ok(())
    }
}
