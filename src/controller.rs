//! Crawl Controller (spec §4.12): the public entry point. Seeds the
//! queue, runs the scheduler to quiescence or deadline, drains the
//! result set, and classifies root failures.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use feedcrawl_core::{normalize, Callback, CrawlConfig, CrawlStats, ErrorType, FeedInfo, Request, RootError};
use feedcrawl_frontier::priority;

use crate::engine::{self, Shared};

/// Returned by [`search_with_info`] (spec §6's API table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub feeds: Vec<FeedInfo>,
    pub root_error: Option<RootError>,
    pub stats: Option<CrawlStats>,
}

/// `search(seeds, opts) -> list<FeedInfo>` (spec §4.12, §6): empty list
/// on any root failure, preserving the legacy contract.
pub async fn search(seeds: &[String], cfg: &CrawlConfig) -> Vec<FeedInfo> {
    search_with_info(seeds, cfg).await.feeds
}

/// `search_with_info(seeds, opts) -> {feeds, root_error, stats?}` (spec
/// §4.12, §6).
pub async fn search_with_info(seeds: &[String], cfg: &CrawlConfig) -> SearchResult {
    let start = Instant::now();
    let deadline = start + cfg.total_timeout();

    let mut normalized: Vec<Url> = Vec::new();
    let mut seed_raw_by_url: HashMap<String, String> = HashMap::new();
    let mut invalid_seeds: Vec<(String, ErrorType)> = Vec::new();

    for raw in seeds {
        match normalize(raw, None) {
            Ok(url) => {
                seed_raw_by_url.insert(url.to_string(), raw.clone());
                normalized.push(url);
            }
            Err(e) => invalid_seeds.push((raw.clone(), e.error_type())),
        }
    }

    let shared = match Shared::new(cfg.clone(), deadline, seed_raw_by_url) {
        Ok(s) => s,
        Err(e) => {
            return SearchResult {
                feeds: Vec::new(),
                root_error: Some(RootError {
                    error_type: e.error_type(),
                    url: seeds.first().cloned().unwrap_or_default(),
                    status_code: None,
                }),
                stats: None,
            }
        }
    };

    for (raw, error_type) in &invalid_seeds {
        shared.record_root_outcome(raw, *error_type, -1);
    }

    let seed_hosts: HashSet<String> = normalized
        .iter()
        .filter_map(|u| u.host_str().map(str::to_string))
        .collect();

    for url in &normalized {
        engine::enqueue(
            &shared,
            Request::new(url.clone(), Callback::ParseHtml, priority::GENERIC, 0),
        )
        .await;
    }

    if cfg.crawl_hosts {
        for candidate in feedcrawl_parser::host_crawl_candidates(&normalized) {
            engine::enqueue(
                &shared,
                Request::new(candidate.url, candidate.callback, candidate.priority, candidate.depth),
            )
            .await;
        }
    }

    let mut origins_seeded = HashSet::new();
    for url in &normalized {
        let origin = url.origin().ascii_serialization();
        if !origins_seeded.insert(origin.clone()) {
            continue;
        }
        if let Ok(robots_url) = Url::parse(&format!("{origin}/robots.txt")) {
            engine::enqueue(
                &shared,
                Request::new(robots_url, Callback::ParseRobots, priority::ROBOTS, 0),
            )
            .await;
        }
        if let Ok(sitemap_url) = Url::parse(&format!("{origin}/sitemap.xml")) {
            engine::enqueue(
                &shared,
                Request::new(sitemap_url, Callback::ParseSitemap, priority::SITEMAP, 0),
            )
            .await;
        }
    }

    let try_paths = cfg.try_urls.paths();
    if !try_paths.is_empty() {
        for candidate in feedcrawl_parser::try_url_candidates(&normalized, try_paths) {
            engine::enqueue(
                &shared,
                Request::new(candidate.url, candidate.callback, candidate.priority, candidate.depth),
            )
            .await;
        }
    }

    engine::run(shared.clone()).await;

    let feeds = shared.results().finish(&seed_hosts);
    let root_error = compute_root_error(seeds, &shared);
    let stats = if cfg.include_stats {
        Some(shared.stats().snapshot(start.elapsed().as_millis() as u64))
    } else {
        None
    };

    SearchResult { feeds, root_error, stats }
}

fn compute_root_error(seeds: &[String], shared: &Shared) -> Option<RootError> {
    if seeds.is_empty() {
        return None;
    }
    let mut first_failure: Option<RootError> = None;
    for seed in seeds {
        match shared.root_outcome_for(seed) {
            Some((ErrorType::None, _)) => return None,
            Some((error_type, status)) => {
                if first_failure.is_none() {
                    first_failure = Some(RootError {
                        error_type,
                        url: seed.clone(),
                        status_code: if status > 0 { Some(status as u16) } else { None },
                    });
                }
            }
            None => return None,
        }
    }
    first_failure
}

/// Blocking wrapper over [`search`] for non-async callers (ambient
/// ergonomics; grounded in how CLI-oriented crates in the pack expose
/// both sync and async entry points).
pub fn search_blocking(seeds: &[String], cfg: &CrawlConfig) -> Vec<FeedInfo> {
    runtime().block_on(search(seeds, cfg))
}

/// Blocking wrapper over [`search_with_info`].
pub fn search_with_info_blocking(seeds: &[String], cfg: &CrawlConfig) -> SearchResult {
    runtime().block_on(search_with_info(seeds, cfg))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("failed to start tokio runtime")
}
