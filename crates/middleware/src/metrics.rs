use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use feedcrawl_core::{CrawlStats, ErrorType, Request, Response};

use crate::chain::{AfterOutcome, BeforeOutcome, Middleware};

/// Lock-free counters accumulated across all workers, snapshotted into a
/// [`CrawlStats`] at the end of a crawl (spec §3, §4.6).
#[derive(Default)]
pub struct StatsCollector {
    requests_issued: AtomicU64,
    responses_received: AtomicU64,
    bytes_downloaded: AtomicU64,
    per_error_type: DashMap<String, AtomicU64>,
    per_host_requests: DashMap<String, AtomicU64>,
}

impl StatsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, host: &str) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
        self.per_host_requests
            .entry(host.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self, resp: &Response) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
        let bytes = resp.text.as_ref().map(|t| t.len()).unwrap_or(0);
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
        if resp.error_type != ErrorType::None {
            let key = error_type_key(resp.error_type);
            self.per_error_type
                .entry(key)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, duration_ms: u64) -> CrawlStats {
        CrawlStats {
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            duration_ms,
            per_error_type: self
                .per_error_type
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                .collect(),
            per_host_requests: self
                .per_host_requests
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

fn error_type_key(error_type: ErrorType) -> String {
    serde_json::to_value(error_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "other".to_string())
}

/// Middleware that folds request/response counts into a shared
/// [`StatsCollector`] (spec §4.6).
pub struct MetricsMiddleware {
    stats: Arc<StatsCollector>,
}

impl MetricsMiddleware {
    pub fn new(stats: Arc<StatsCollector>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn before_request(&self, req: Request) -> BeforeOutcome {
        if let Some(host) = req.url.host_str() {
            self.stats.record_request(host);
        }
        BeforeOutcome::Continue(req)
    }

    async fn after_response(&self, resp: Response) -> AfterOutcome {
        self.stats.record_response(&resp);
        AfterOutcome::Response(resp)
    }
}
