use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Try-URLs option: either disabled, or a list of paths to probe per
/// origin (spec §4.8 rule 6, §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TryUrls {
    Disabled(bool),
    Paths(Vec<String>),
}

impl Default for TryUrls {
    fn default() -> Self {
        TryUrls::Disabled(false)
    }
}

impl TryUrls {
    pub fn paths(&self) -> &[String] {
        match self {
            TryUrls::Disabled(_) => &[],
            TryUrls::Paths(p) => p,
        }
    }
}

/// Public configuration surface (spec §6). Deserializable from TOML via
/// `toml::from_str`, same mechanism the teacher uses for `AppConfig`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub crawl_hosts: bool,
    pub try_urls: TryUrls,
    pub concurrency: usize,
    pub total_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_content_length: usize,
    pub max_depth: u32,
    pub headers: HashMap<String, String>,
    pub favicon_data_uri: bool,
    pub delay_secs: u64,
    pub respect_robots: bool,
    pub include_stats: bool,
    pub max_retries: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            crawl_hosts: true,
            try_urls: TryUrls::Disabled(false),
            concurrency: 10,
            total_timeout_secs: 10,
            request_timeout_secs: 3,
            user_agent: "Feedsearch Bot".to_string(),
            max_content_length: 10 * 1024 * 1024,
            max_depth: 10,
            headers: HashMap::new(),
            favicon_data_uri: true,
            delay_secs: 0,
            respect_robots: true,
            include_stats: false,
            max_retries: 3,
        }
    }
}

impl CrawlConfig {
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, crate::error::CrawlError> {
        toml::from_str(s).map_err(|e| crate::error::CrawlError::Config(e.to_string()))
    }
}
