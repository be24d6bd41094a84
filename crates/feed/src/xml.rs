use feed_rs::model::{Feed, FeedType};
use feedcrawl_core::{FeedFormat, FeedInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::dates::parse_lenient;
use crate::velocity::summarize_dates;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static ITUNES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<itunes:").unwrap());

/// Parses a response body known to have a feed-like XML root (spec
/// §4.9's XML path). On a clean `feed_rs` parse, extracts every field
/// the spec names. On a parse failure, attempts the fallback recovery
/// spec §7 describes: a `bozo=1` FeedInfo carrying only a title
/// recovered by regex, or `None` if even that fails.
pub fn extract(body: &str, feed_url: &Url) -> Option<FeedInfo> {
    match feed_rs::parser::parse(body.as_bytes()) {
        Ok(feed) => Some(from_parsed(feed, body, feed_url)),
        Err(_) => recover_bozo(body, feed_url),
    }
}

fn from_parsed(feed: Feed, raw: &str, feed_url: &Url) -> FeedInfo {
    let title = feed.title.map(|t| t.content);
    let description = feed.description.map(|t| t.content);

    let site_url = feed
        .links
        .iter()
        .find(|l| l.rel.as_deref() != Some("self") && l.rel.as_deref() != Some("hub"))
        .and_then(|l| Url::parse(&l.href).ok());
    let self_url = feed
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("self"))
        .and_then(|l| Url::parse(&l.href).ok());
    let hubs: Vec<String> = feed
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("hub"))
        .map(|l| l.href.clone())
        .collect();

    let version = version_tag(&feed.feed_type);

    let dates: Vec<_> = feed
        .entries
        .iter()
        .filter_map(|e| e.published.or(e.updated))
        .collect();
    let item_count = feed.entries.len();
    let (last_updated, velocity) = summarize_dates(&dates, item_count);
    let last_updated = last_updated.or(feed.updated);

    let podcast = ITUNES_RE.is_match(raw)
        || feed.entries.iter().any(|e| {
            e.media.iter().any(|m| {
                m.content.iter().any(|c| {
                    c.content_type
                        .as_ref()
                        .map(|ct| ct.ty().as_str() == "audio")
                        .unwrap_or(false)
                })
            })
        });

    FeedInfo {
        url: feed_url.clone(),
        title,
        description,
        version: Some(version.to_string()),
        format: if matches!(feed.feed_type, FeedType::Atom) {
            FeedFormat::Atom
        } else {
            FeedFormat::Rss
        },
        hubs,
        self_url,
        site_url,
        site_name: None,
        favicon_url: None,
        favicon_data_uri: None,
        content_type: None,
        content_length: raw.len(),
        last_updated,
        item_count,
        velocity,
        podcast,
        bozo: false,
        score: 0,
    }
}

fn version_tag(feed_type: &FeedType) -> &'static str {
    match feed_type {
        FeedType::Atom => "atom10",
        FeedType::RSS2 => "rss20",
        FeedType::RSS1 => "rss10",
        FeedType::RSS0 => "rss090",
        FeedType::JSON => "json1",
    }
}

/// Recovers a minimal `bozo=1` FeedInfo from malformed XML that still
/// has a recognizable `<title>` (spec §7).
fn recover_bozo(body: &str, feed_url: &Url) -> Option<FeedInfo> {
    let title = TITLE_RE
        .captures(body)
        .map(|c| html_unescape(c[1].trim()));
    title.as_ref()?;

    let format = if body.to_lowercase().contains("<feed") {
        FeedFormat::Atom
    } else {
        FeedFormat::Rss
    };

    Some(FeedInfo {
        url: feed_url.clone(),
        title,
        description: None,
        version: None,
        format,
        hubs: Vec::new(),
        self_url: None,
        site_url: None,
        site_name: None,
        favicon_url: None,
        favicon_data_uri: None,
        content_type: None,
        content_length: body.len(),
        last_updated: None,
        item_count: 0,
        velocity: 0.0,
        podcast: false,
        bozo: true,
        score: 0,
    })
}

fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[allow(dead_code)]
pub(crate) fn parse_lenient_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    parse_lenient(s)
}
