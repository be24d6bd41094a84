use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ErrorType;

/// Closed set of callbacks a worker can dispatch a [`Response`] to.
/// Mirrors the teacher's tagged-union dispatch (no runtime-pluggable
/// callback registry is needed by the core — see spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callback {
    ParseHtml,
    ParseFeed,
    ParseRobots,
    ParseSitemap,
    ParseSiteMeta,
    ParseFavicon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// A unit of work, owned by the priority queue until popped, consumed
/// exactly once by a worker (spec §3).
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub callback: Callback,
    pub priority: i32,
    pub depth: u32,
    pub retry_count: u32,
    pub delay: Duration,
    pub headers: HashMap<String, String>,
    pub max_content_length: Option<usize>,
}

impl Request {
    pub fn new(url: Url, callback: Callback, priority: i32, depth: u32) -> Self {
        Self {
            url,
            method: Method::Get,
            callback,
            priority,
            depth,
            retry_count: 0,
            delay: Duration::ZERO,
            headers: HashMap::new(),
            max_content_length: None,
        }
    }

    pub fn child(&self, url: Url, callback: Callback, priority: i32) -> Self {
        Self::new(url, callback, priority, self.depth + 1)
    }
}

/// Produced by the downloader (spec §3, §4.5).
#[derive(Debug, Clone)]
pub struct Response {
    pub request: Request,
    pub final_url: Url,
    pub status: i32,
    pub headers: HashMap<String, String>,
    pub text: Option<String>,
    pub json: Option<serde_json::Value>,
    /// Raw body bytes, kept alongside the decoded `text` for consumers that
    /// need the original bytes rather than a decoded string (favicon
    /// fetches, spec §4.10).
    pub bytes: Option<Vec<u8>>,
    pub history: Vec<Url>,
    pub error_type: ErrorType,
    pub elapsed: Duration,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.error_type == ErrorType::None && (200..400).contains(&self.status)
    }
}

/// Feed format discriminant (spec glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
    Json,
}

/// Result record, identity is `url` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedInfo {
    pub url: Url,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub format: FeedFormat,
    pub hubs: Vec<String>,
    pub self_url: Option<Url>,
    pub site_url: Option<Url>,
    pub site_name: Option<String>,
    pub favicon_url: Option<Url>,
    pub favicon_data_uri: Option<String>,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub item_count: usize,
    pub velocity: f64,
    pub podcast: bool,
    pub bozo: bool,
    pub score: i32,
}

impl PartialEq for FeedInfo {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}
impl Eq for FeedInfo {}

/// Per-origin cache, one per origin over a crawl (spec §3).
#[derive(Debug, Clone, Default)]
pub struct SiteMeta {
    pub origin: Option<Url>,
    pub site_name: Option<String>,
    pub site_title: Option<String>,
    pub favicon_url: Option<Url>,
}

/// Crawl-wide counters (spec §3, supplemented with per-host counts and
/// wall-clock bounds per SPEC_FULL.md).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub requests_issued: u64,
    pub responses_received: u64,
    pub bytes_downloaded: u64,
    pub duration_ms: u64,
    pub per_error_type: HashMap<String, u64>,
    pub per_host_requests: HashMap<String, u64>,
}

impl CrawlStats {
    pub fn record_error(&mut self, error_type: ErrorType) {
        if error_type == ErrorType::None {
            return;
        }
        let key = serde_json::to_value(error_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "other".to_string());
        *self.per_error_type.entry(key).or_insert(0) += 1;
    }

    pub fn record_host(&mut self, host: &str) {
        *self.per_host_requests.entry(host.to_string()).or_insert(0) += 1;
    }
}
