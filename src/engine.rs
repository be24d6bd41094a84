//! Scheduler / Worker Pool (spec §4.7): a fixed pool of cooperative
//! workers pulling from the priority queue, running the request through
//! the middleware pipeline and downloader, then dispatching the
//! response to the callback its `Request` carries.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use feedcrawl_core::{Callback, CrawlConfig, CrawlError, ErrorType, FeedInfo, Request, Response};
use feedcrawl_downloader::Downloader;
use feedcrawl_frontier::{priority, DuplicateFilter, FrontierQueue, HostThrottle};
use feedcrawl_middleware::{
    AfterOutcome, BeforeOutcome, ContentTypeMiddleware, Middleware, MetricsMiddleware,
    MiddlewareChain, RetryMiddleware, RobotsMiddleware, StatsCollector,
};
use feedcrawl_scoring::ResultSet;

const QUIESCENCE_SETTLE: Duration = Duration::from_millis(10);
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Per-origin cache built up as site-meta/favicon responses arrive
/// (spec §4.10). Keyed by `scheme://host[:port]`.
#[derive(Default, Clone)]
struct SiteMetaEntry {
    site_name: Option<String>,
    favicon_url: Option<Url>,
    favicon_data_uri: Option<String>,
}

/// All state shared across workers for one crawl (spec §5's
/// shared-resource policy: everything here is either lock-free
/// (`DashMap`/`DashSet`/atomics) or internally synchronized).
pub struct Shared {
    cfg: CrawlConfig,
    queue: FrontierQueue,
    dup: DuplicateFilter,
    throttle: HostThrottle,
    downloader: Downloader,
    chain: MiddlewareChain,
    robots: Arc<RobotsMiddleware>,
    results: ResultSet,
    stats: Arc<StatsCollector>,
    known_origins: DashSet<String>,
    site_meta: DashMap<String, SiteMetaEntry>,
    seed_raw_by_url: HashMap<String, String>,
    root_outcomes: DashMap<String, (ErrorType, i32)>,
    semaphore: Semaphore,
    in_flight: AtomicUsize,
    deadline: Instant,
    max_depth: u32,
}

impl Shared {
    pub fn new(
        cfg: CrawlConfig,
        deadline: Instant,
        seed_raw_by_url: HashMap<String, String>,
    ) -> Result<Arc<Self>, CrawlError> {
        let downloader = Downloader::new(&cfg)?;
        let robots = Arc::new(RobotsMiddleware::new(cfg.respect_robots, cfg.user_agent.clone()));
        let stats = StatsCollector::new();
        let chain = MiddlewareChain::new(vec![
            robots.clone() as Arc<dyn Middleware>,
            Arc::new(RetryMiddleware::new(cfg.max_retries)),
            Arc::new(ContentTypeMiddleware),
            Arc::new(MetricsMiddleware::new(stats.clone())),
        ]);
        let max_depth = cfg.max_depth;
        let concurrency = cfg.concurrency.max(1);

        Ok(Arc::new(Self {
            cfg,
            queue: FrontierQueue::new(),
            dup: DuplicateFilter::new(),
            throttle: HostThrottle::new(),
            downloader,
            chain,
            robots,
            results: ResultSet::new(),
            stats,
            known_origins: DashSet::new(),
            site_meta: DashMap::new(),
            seed_raw_by_url,
            root_outcomes: DashMap::new(),
            semaphore: Semaphore::new(concurrency),
            in_flight: AtomicUsize::new(0),
            deadline,
            max_depth,
        }))
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    pub fn root_outcome_for(&self, seed: &str) -> Option<(ErrorType, i32)> {
        self.root_outcomes.get(seed).map(|e| *e.value())
    }

    /// Records a root-seed outcome directly, used for seeds that never
    /// reach the queue (failed normalization, spec §4.1's `invalid_url`).
    pub fn record_root_outcome(&self, seed: &str, error_type: ErrorType, status: i32) {
        self.root_outcomes.insert(seed.to_string(), (error_type, status));
    }
}

/// Enqueues `req` after the depth cap (spec §3's invariant) and the
/// duplicate filter (spec §4.2, §3's invariant).
pub async fn enqueue(shared: &Arc<Shared>, req: Request) {
    if req.depth > shared.max_depth {
        return;
    }
    if !shared.dup.check_and_add_enqueue(&req.url) {
        return;
    }
    shared.queue.push(req).await;
}

/// Runs the worker pool to quiescence or the global deadline (spec
/// §4.7's termination condition), then returns.
pub async fn run(shared: Arc<Shared>) {
    let workers = shared.cfg.concurrency.max(1);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let shared = shared.clone();
        handles.push(tokio::spawn(worker_loop(shared)));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        if Instant::now() >= shared.deadline {
            break;
        }

        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        match shared.queue.pop().await {
            Some(req) => {
                process_request(&shared, req).await;
                shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            None => {
                shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                if shared.queue.is_empty().await && shared.in_flight.load(Ordering::SeqCst) == 0 {
                    tokio::time::sleep(QUIESCENCE_SETTLE).await;
                    if shared.queue.is_empty().await && shared.in_flight.load(Ordering::SeqCst) == 0 {
                        break;
                    }
                } else {
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
        }
    }
}

/// Worker loop steps 2-9 (spec §4.7) for a single popped request.
async fn process_request(shared: &Arc<Shared>, req: Request) {
    let original_url = req.url.to_string();
    let is_root = shared.seed_raw_by_url.contains_key(&original_url);

    if !req.delay.is_zero() {
        tokio::time::sleep(req.delay).await;
    }

    let host = req.url.host_str().unwrap_or("").to_string();
    let wait = shared.throttle.acquire(&host, shared.cfg.delay());
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }

    let remaining = shared.deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return;
    }

    let Ok(Ok(_permit)) = tokio::time::timeout(remaining, shared.semaphore.acquire()).await else {
        return;
    };

    let resp = match shared.chain.before(req).await {
        BeforeOutcome::Drop => return,
        BeforeOutcome::ShortCircuit(resp) => resp,
        BeforeOutcome::Continue(req) => fetch_before_deadline(shared, req).await,
    };

    if is_root {
        shared
            .root_outcomes
            .insert(original_url, (resp.error_type, resp.status));
    }

    if resp.error_type != ErrorType::None {
        warn!(url = %resp.request.url, status = resp.status, depth = resp.request.depth, retry = resp.request.retry_count, error = ?resp.error_type, "fetch failed");
    } else {
        debug!(url = %resp.request.url, status = resp.status, depth = resp.request.depth, retry = resp.request.retry_count, "fetched");
    }

    match shared.chain.after(resp).await {
        AfterOutcome::Response(resp) => dispatch(shared, resp).await,
        AfterOutcome::Retry(retry_req) => {
            let remaining = shared.deadline.saturating_duration_since(Instant::now());
            if retry_req.delay < remaining {
                shared.queue.push(retry_req).await;
            }
        }
    }
}

/// Dispatches a post-middleware response to the callback its request
/// carries (spec §4.7 step 8, §9's tagged-dispatch design note).
async fn dispatch(shared: &Arc<Shared>, resp: Response) {
    match resp.request.callback {
        Callback::ParseRobots => handle_robots(shared, &resp).await,
        Callback::ParseSitemap => handle_sitemap(shared, &resp).await,
        Callback::ParseSiteMeta => handle_site_meta(shared, &resp).await,
        Callback::ParseFavicon => handle_favicon(shared, &resp),
        Callback::ParseFeed => handle_feed(shared, &resp),
        Callback::ParseHtml => handle_html(shared, &resp).await,
    }
}

async fn handle_robots(shared: &Arc<Shared>, resp: &Response) {
    let host = resp.request.url.host_str().unwrap_or("").to_string();
    if resp.is_success() {
        let Some(body) = &resp.text else { return };
        let sitemaps = shared.robots.ingest(&host, body, &resp.final_url);
        for url in sitemaps {
            note_origin(shared, &url);
            enqueue(
                shared,
                Request::new(url, Callback::ParseSitemap, priority::SITEMAP, 0),
            )
            .await;
        }
    } else {
        shared.robots.mark_unreachable(&host);
    }
}

async fn handle_sitemap(shared: &Arc<Shared>, resp: &Response) {
    if !resp.is_success() {
        return;
    }
    let Some(body) = &resp.text else { return };
    for url in feedcrawl_middleware::parse_sitemap(body) {
        note_origin(shared, &url);
        enqueue(
            shared,
            Request::new(
                url,
                Callback::ParseHtml,
                priority::SITEMAP_DISCOVERED,
                resp.request.depth + 1,
            ),
        )
        .await;
    }
}

async fn handle_site_meta(shared: &Arc<Shared>, resp: &Response) {
    if !resp.is_success() {
        return;
    }
    let Some(html) = &resp.text else { return };
    ingest_site_meta(shared, html, resp).await;
}

/// Extracts site metadata from an origin-root HTML body and stores it,
/// enqueueing the discovered favicon if any. Shared by the synthetic
/// `ParseSiteMeta` root fetch and `handle_html`'s same-page extraction
/// for a seed that happens to be its own origin root (spec §4.10) —
/// the two requests dedup to one fetch, so whichever callback actually
/// ran the fetch must still populate site meta. The enqueue-level
/// duplicate filter only ever lets one of those two requests reach the
/// queue; this is the response-level "seen for parsing" check (spec
/// §4.2) guarding against the other callback examining the same body
/// a second time.
async fn ingest_site_meta(shared: &Arc<Shared>, html: &str, resp: &Response) {
    if !shared.dup.check_and_add_parse(&resp.final_url) {
        return;
    }
    let meta = feedcrawl_parser::extract_site_meta(html, &resp.final_url);
    let origin = origin_key(&resp.final_url);

    shared
        .site_meta
        .entry(origin)
        .and_modify(|e| {
            if e.site_name.is_none() {
                e.site_name = meta.site_name.clone();
            }
            if e.favicon_url.is_none() {
                e.favicon_url = meta.favicon_url.clone();
            }
        })
        .or_insert_with(|| SiteMetaEntry {
            site_name: meta.site_name.clone(),
            favicon_url: meta.favicon_url.clone(),
            favicon_data_uri: None,
        });

    if let Some(favicon_url) = meta.favicon_url {
        enqueue(
            shared,
            Request::new(
                favicon_url,
                Callback::ParseFavicon,
                priority::FAVICON,
                resp.request.depth + 1,
            ),
        )
        .await;
    }
}

/// Races the downloader fetch against the global deadline (spec §5's
/// "total wall-clock ≤ total_timeout + ε" invariant and §9's soft-cancel
/// design) — a fetch already in flight when `total_timeout` expires is
/// dropped at its next suspension point rather than allowed to run out
/// its own, longer, per-request timeout.
async fn fetch_before_deadline(shared: &Arc<Shared>, req: Request) -> Response {
    let remaining = shared.deadline.saturating_duration_since(Instant::now());
    let fallback = req.clone();
    match tokio::time::timeout(remaining, shared.downloader.fetch(req)).await {
        Ok(resp) => resp,
        Err(_) => cancelled_response(fallback),
    }
}

fn cancelled_response(request: Request) -> Response {
    let final_url = request.url.clone();
    Response {
        request,
        final_url,
        status: -1,
        headers: HashMap::new(),
        text: None,
        json: None,
        bytes: None,
        history: Vec::new(),
        error_type: ErrorType::Timeout,
        elapsed: Duration::ZERO,
    }
}

fn is_origin_root(url: &Url) -> bool {
    matches!(url.path(), "" | "/") && url.query().is_none()
}

fn handle_favicon(shared: &Arc<Shared>, resp: &Response) {
    if !resp.is_success() {
        return;
    }
    let Some(bytes) = &resp.bytes else { return };
    let origin = origin_key(&resp.request.url);
    let data_uri = if shared.cfg.favicon_data_uri {
        let ct = resp.headers.get("content-type").map(String::as_str);
        feedcrawl_parser::favicon_data_uri(bytes, ct)
    } else {
        None
    };
    let favicon_url = resp.request.url.clone();
    shared
        .site_meta
        .entry(origin)
        .and_modify(|e| {
            e.favicon_url.get_or_insert_with(|| favicon_url.clone());
            if e.favicon_data_uri.is_none() {
                e.favicon_data_uri = data_uri.clone();
            }
        })
        .or_insert_with(|| SiteMetaEntry {
            site_name: None,
            favicon_url: Some(favicon_url),
            favicon_data_uri: data_uri,
        });
}

fn handle_feed(shared: &Arc<Shared>, resp: &Response) {
    if let Some(feed) = feedcrawl_feed::validate(resp) {
        emit_feed(shared, feed);
    }
}

async fn handle_html(shared: &Arc<Shared>, resp: &Response) {
    if let Some(feed) = feedcrawl_feed::validate(resp) {
        emit_feed(shared, feed);
        return;
    }
    let Some(html) = &resp.text else { return };
    if is_origin_root(&resp.final_url) {
        ingest_site_meta(shared, html, resp).await;
    }
    let capped = cap_to_512kib(html);
    let known = origins_snapshot(shared);
    let candidates = feedcrawl_parser::extract_links(
        capped,
        &resp.final_url,
        resp.request.depth,
        shared.max_depth,
        &known,
    );
    for c in candidates {
        enqueue(shared, Request::new(c.url, c.callback, c.priority, c.depth)).await;
    }
}

fn emit_feed(shared: &Arc<Shared>, mut feed: FeedInfo) {
    let origin = origin_key(&feed.url);
    if let Some(meta) = shared.site_meta.get(&origin) {
        feedcrawl_scoring::attach_site_meta(
            &mut feed,
            meta.site_name.as_deref(),
            meta.favicon_url.as_ref(),
            meta.favicon_data_uri.as_deref(),
        );
    }
    for hub in &feed.hubs {
        if let Ok(u) = Url::parse(hub) {
            note_origin(shared, &u);
        }
    }
    shared.results.insert_or_enrich(feed);
}

fn note_origin(shared: &Arc<Shared>, url: &Url) {
    if let Some(host) = url.host_str() {
        shared.known_origins.insert(host.to_string());
    }
}

fn origins_snapshot(shared: &Arc<Shared>) -> HashSet<String> {
    shared.known_origins.iter().map(|v| v.clone()).collect()
}

fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// HTML parsing is capped at the first 512 KiB of body (spec §5);
/// trims to the nearest preceding UTF-8 char boundary.
fn cap_to_512kib(html: &str) -> &str {
    const CAP: usize = 512 * 1024;
    if html.len() <= CAP {
        return html;
    }
    let mut end = CAP;
    while end > 0 && !html.is_char_boundary(end) {
        end -= 1;
    }
    &html[..end]
}
