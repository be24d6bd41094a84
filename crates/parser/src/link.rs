use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use feedcrawl_core::Callback;

use crate::{FEED_PATH_KEYWORDS, FEED_TYPE_ATTRS};

const DENY_PATH_SUBSTRINGS: &[&str] = &["/wp-admin", "/wp-login"];
const DENY_EXTENSIONS: &[&str] = &[
    ".jpg", ".png", ".gif", ".mp4", ".mp3", ".pdf", ".zip",
];
const DENY_HOSTS: &[&str] = &[
    "facebook.com",
    "www.facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "www.instagram.com",
    "linkedin.com",
    "www.linkedin.com",
    "pinterest.com",
    "tiktok.com",
];

/// A candidate URL produced by the link filter, already depth-checked
/// and classified (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub url: Url,
    pub priority: i32,
    pub callback: Callback,
    pub depth: u32,
}

/// Extracts `<a href>` and `<link rel="alternate">` targets from an HTML
/// document and classifies each against the feed-link rules, dropping
/// anything denied, off-origin, or past `max_depth`.
///
/// `known_origins` holds hosts of previously-discovered sitemaps/hubs,
/// which are exempt from the same-origin rule.
pub fn extract_links(
    html: &str,
    base: &Url,
    parent_depth: u32,
    max_depth: u32,
    known_origins: &HashSet<String>,
) -> Vec<LinkCandidate> {
    let depth = parent_depth + 1;
    if depth > max_depth {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let base_host = base.host_str().unwrap_or("");

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (href, type_attr) in raw_targets(&document) {
        if href.starts_with('#') {
            continue;
        }
        let Ok(resolved) = base.join(&href) else {
            continue;
        };
        if !seen.insert(resolved.clone()) {
            continue;
        }
        let Some(candidate) = classify(&resolved, type_attr.as_deref(), base_host, known_origins)
        else {
            continue;
        };
        out.push(LinkCandidate {
            url: resolved,
            priority: candidate.0,
            callback: candidate.1,
            depth,
        });
    }

    out
}

fn raw_targets(document: &Html) -> Vec<(String, Option<String>)> {
    let mut targets = Vec::new();

    if let Ok(sel) = Selector::parse("a[href]") {
        for el in document.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                targets.push((href.to_string(), None));
            }
        }
    }

    if let Ok(sel) = Selector::parse("link[rel=\"alternate\"][href]") {
        for el in document.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                let ty = el.value().attr("type").map(|s| s.to_string());
                targets.push((href.to_string(), ty));
            }
        }
    }

    targets
}

fn classify(
    url: &Url,
    type_attr: Option<&str>,
    base_host: &str,
    known_origins: &HashSet<String>,
) -> Option<(i32, Callback)> {
    if is_denied(url) {
        return None;
    }

    let host = url.host_str().unwrap_or("");
    let same_origin = host == base_host;
    if !same_origin && !known_origins.contains(host) {
        return None;
    }

    if let Some(ty) = type_attr {
        if FEED_TYPE_ATTRS.contains(&ty) {
            return Some((10, Callback::ParseFeed));
        }
    }

    if matches_feed_keyword(url) {
        return Some((20, Callback::ParseFeed));
    }

    if same_origin {
        return Some((crate::PRIORITY_GENERIC, Callback::ParseHtml));
    }

    None
}

fn matches_feed_keyword(url: &Url) -> bool {
    let haystack = format!(
        "{} {} {}",
        url.path().to_lowercase(),
        url.host_str().unwrap_or("").to_lowercase(),
        url.query().unwrap_or("").to_lowercase()
    );
    FEED_PATH_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

fn is_denied(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }
    let path_lower = url.path().to_lowercase();
    if DENY_PATH_SUBSTRINGS.iter().any(|p| path_lower.contains(p)) {
        return true;
    }
    if DENY_EXTENSIONS.iter().any(|ext| path_lower.ends_with(ext)) {
        return true;
    }
    let host = url.host_str().unwrap_or("");
    if DENY_HOSTS.contains(&host) {
        return true;
    }
    false
}

/// Synthesizes origin-root candidates for seeds when `crawl_hosts=true`
/// (spec §4.8 rule 5).
pub fn host_crawl_candidates(seeds: &[Url]) -> Vec<LinkCandidate> {
    seeds
        .iter()
        .filter_map(|seed| {
            let mut root = seed.clone();
            root.set_path("/");
            root.set_query(None);
            root.set_fragment(None);
            Some(LinkCandidate {
                url: root,
                priority: 100,
                callback: Callback::ParseSiteMeta,
                depth: 0,
            })
        })
        .collect()
}

/// Synthesizes try-URL candidates: origin + each configured path, per
/// seed origin (spec §4.8 rule 6).
pub fn try_url_candidates(seeds: &[Url], paths: &[String]) -> Vec<LinkCandidate> {
    let mut out = Vec::new();
    for seed in seeds {
        let Ok(origin) = Url::parse(&seed.origin().ascii_serialization()) else {
            continue;
        };
        for path in paths {
            if let Ok(url) = origin.join(path.trim_start_matches('/')) {
                out.push(LinkCandidate {
                    url,
                    priority: 20,
                    callback: Callback::ParseFeed,
                    depth: 1,
                });
            }
        }
    }
    out
}
