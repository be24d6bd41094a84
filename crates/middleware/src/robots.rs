use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use feedcrawl_core::{Callback, Request};
use tokio::sync::Notify;
use tracing::debug;
use url::Url;

use crate::chain::{BeforeOutcome, Middleware};

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

struct HostRules {
    disallow: Vec<String>,
}

/// Per-host robots.txt cache and gate. Fetched once per host at priority
/// 1; never blocked by itself (spec §4.6). Non-sitemap requests to a
/// host stall on a per-host readiness signal until the robots.txt
/// response (or its failure) arrives, capped at 5s (spec §9).
pub struct RobotsMiddleware {
    respect: bool,
    user_agent: String,
    rules: DashMap<String, HostRules>,
    ready: DashMap<String, Arc<Notify>>,
}

impl RobotsMiddleware {
    pub fn new(respect: bool, user_agent: String) -> Self {
        Self {
            respect,
            user_agent,
            rules: DashMap::new(),
            ready: DashMap::new(),
        }
    }

    fn readiness(&self, host: &str) -> Arc<Notify> {
        self.ready
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    async fn wait_ready(&self, host: &str) {
        if self.rules.contains_key(host) {
            return;
        }
        let notify = self.readiness(host);
        let _ = tokio::time::timeout(READINESS_TIMEOUT, notify.notified()).await;
    }

    /// Parse a robots.txt body for the configured user-agent, extract
    /// `Sitemap:` directives (which apply regardless of grouping), store
    /// the disallow rules, and wake any workers waiting on this host.
    pub fn ingest(&self, host: &str, body: &str, base: &Url) -> Vec<Url> {
        let (disallow, sitemaps) = parse_robots_txt(body, &self.user_agent, base);
        self.rules.insert(host.to_string(), HostRules { disallow });
        self.readiness(host).notify_waiters();
        sitemaps
    }

    /// Robots.txt fetch failed entirely — treat as "allow all" and still
    /// release waiters (spec: "or its fetch fails").
    pub fn mark_unreachable(&self, host: &str) {
        self.rules
            .entry(host.to_string())
            .or_insert_with(|| HostRules { disallow: Vec::new() });
        self.readiness(host).notify_waiters();
    }

    fn is_disallowed(&self, host: &str, path: &str) -> bool {
        match self.rules.get(host) {
            Some(rules) => rules.disallow.iter().any(|p| path.starts_with(p.as_str())),
            None => false,
        }
    }
}

#[async_trait]
impl Middleware for RobotsMiddleware {
    async fn before_request(&self, req: Request) -> BeforeOutcome {
        if matches!(req.callback, Callback::ParseRobots | Callback::ParseSitemap) {
            return BeforeOutcome::Continue(req);
        }
        if !self.respect {
            return BeforeOutcome::Continue(req);
        }
        let Some(host) = req.url.host_str().map(str::to_string) else {
            return BeforeOutcome::Continue(req);
        };
        self.wait_ready(&host).await;
        if self.is_disallowed(&host, req.url.path()) {
            debug!(url = %req.url, "dropped: disallowed by robots.txt");
            return BeforeOutcome::Drop;
        }
        BeforeOutcome::Continue(req)
    }
}

/// Returns `(disallow paths for `user_agent`, sitemap URLs)`. Sitemap
/// directives are extracted regardless of which group they sit in,
/// per spec §4.6.
///
/// Group selection follows RFC 9309 §2.2.1: a group that names this
/// agent specifically takes precedence over the `*` group entirely —
/// the wildcard group's rules are dropped whenever any specific group
/// matches, rather than merged with them.
fn parse_robots_txt(body: &str, user_agent: &str, base: &Url) -> (Vec<String>, Vec<Url>) {
    let mut specific_disallow = Vec::new();
    let mut wildcard_disallow = Vec::new();
    let mut has_specific_group = false;
    let mut sitemaps = Vec::new();

    // A "group" is a run of consecutive `User-agent:` lines followed by
    // their `Disallow`/`Allow` rules. A non-user-agent directive ends the
    // group, so the next `User-agent:` line starts a fresh one. A group
    // can name more than one agent; it's "specific" if any of those
    // names (other than `*`) matches this user agent.
    let mut group_open = false;
    let mut matches_wildcard = false;
    let mut matches_specific = false;
    let ua_lower = user_agent.to_lowercase();

    for raw_line in body.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !group_open {
                    matches_wildcard = false;
                    matches_specific = false;
                }
                group_open = true;
                if value == "*" {
                    matches_wildcard = true;
                } else if ua_lower.contains(&value.to_lowercase()) {
                    matches_specific = true;
                }
            }
            "disallow" => {
                group_open = false;
                if value.is_empty() {
                    continue;
                }
                if matches_specific {
                    has_specific_group = true;
                    specific_disallow.push(value.to_string());
                } else if matches_wildcard {
                    wildcard_disallow.push(value.to_string());
                }
            }
            "allow" => {
                group_open = false;
                if matches_specific {
                    has_specific_group = true;
                }
            }
            "sitemap" => {
                group_open = false;
                if let Ok(url) = base.join(value) {
                    sitemaps.push(url);
                }
            }
            _ => {
                group_open = false;
            }
        }
    }

    let disallow = if has_specific_group { specific_disallow } else { wildcard_disallow };
    (disallow, sitemaps)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallow_applies_to_wildcard_agent() {
        let base = Url::parse("https://example.com/").unwrap();
        let (disallow, _) = parse_robots_txt(
            "User-agent: *\nDisallow: /private/\n",
            "Feedsearch Bot",
            &base,
        );
        assert_eq!(disallow, vec!["/private/".to_string()]);
    }

    #[test]
    fn sitemap_extracted_regardless_of_group() {
        let base = Url::parse("https://example.com/").unwrap();
        let (_, sitemaps) = parse_robots_txt(
            "User-agent: SomeOtherBot\nDisallow: /\nSitemap: https://example.com/sitemap.xml\n",
            "Feedsearch Bot",
            &base,
        );
        assert_eq!(sitemaps, vec![Url::parse("https://example.com/sitemap.xml").unwrap()]);
    }

    #[test]
    fn specific_group_overrides_wildcard_group() {
        let base = Url::parse("https://example.com/").unwrap();
        let (disallow, _) = parse_robots_txt(
            "User-agent: *\nDisallow: /private/\n\nUser-agent: Feedsearch Bot\nDisallow: /only-this/\n",
            "Feedsearch Bot",
            &base,
        );
        assert_eq!(disallow, vec!["/only-this/".to_string()]);
    }

    #[test]
    fn disallow_in_non_matching_group_is_ignored() {
        let base = Url::parse("https://example.com/").unwrap();
        let (disallow, _) = parse_robots_txt(
            "User-agent: SomeOtherBot\nDisallow: /private/\n",
            "Feedsearch Bot",
            &base,
        );
        assert!(disallow.is_empty());
    }

    #[tokio::test]
    async fn unreachable_allows_and_releases_waiters() {
        let mw = RobotsMiddleware::new(true, "Feedsearch Bot".to_string());
        mw.mark_unreachable("example.com");
        assert!(!mw.is_disallowed("example.com", "/anything"));
    }

    #[tokio::test]
    async fn before_request_drops_disallowed_path() {
        let mw = RobotsMiddleware::new(true, "Feedsearch Bot".to_string());
        let base = Url::parse("https://example.com/").unwrap();
        mw.ingest("example.com", "User-agent: *\nDisallow: /private/\n", &base);

        let req = Request::new(
            Url::parse("https://example.com/private/feed.xml").unwrap(),
            Callback::ParseHtml,
            100,
            0,
        );
        assert!(matches!(mw.before_request(req).await, BeforeOutcome::Drop));
    }

    #[tokio::test]
    async fn robots_and_sitemap_requests_bypass_gate() {
        let mw = RobotsMiddleware::new(true, "Feedsearch Bot".to_string());
        let req = Request::new(
            Url::parse("https://slow-host.example/robots.txt").unwrap(),
            Callback::ParseRobots,
            1,
            0,
        );
        assert!(matches!(
            mw.before_request(req).await,
            BeforeOutcome::Continue(_)
        ));
    }
}
