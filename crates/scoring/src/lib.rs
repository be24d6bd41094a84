use std::collections::HashSet;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use feedcrawl_core::FeedInfo;
use url::Url;

const FEED_PATH_PATTERNS: &[&str] = &["/feed", "/rss", ".xml"];
const HUB_SCORE_CAP: i32 = 2;

/// Unique set of validated feeds keyed by canonical URL (spec §4.11,
/// §3's dedup invariant). Concurrent workers call [`insert_or_enrich`]
/// as feeds are discovered; [`finish`] computes scores and returns the
/// sorted, final list.
#[derive(Default)]
pub struct ResultSet {
    feeds: DashMap<Url, FeedInfo>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly discovered feed, or enriches the existing entry
    /// for the same canonical URL with any fields the existing entry is
    /// missing. Never creates a second entry for the same URL.
    pub fn insert_or_enrich(&self, feed: FeedInfo) {
        match self.feeds.entry(feed.url.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(feed);
            }
            Entry::Occupied(mut slot) => {
                enrich(slot.get_mut(), feed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Computes §4.11's score for every feed and returns them sorted
    /// score desc, tie-broken by shorter URL path then lexicographic
    /// URL.
    pub fn finish(&self, seed_hosts: &HashSet<String>) -> Vec<FeedInfo> {
        let mut feeds: Vec<FeedInfo> = self
            .feeds
            .iter()
            .map(|e| {
                let mut feed = e.value().clone();
                feed.score = score(&feed, seed_hosts);
                feed
            })
            .collect();

        feeds.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.url.path().len().cmp(&b.url.path().len()))
                .then_with(|| a.url.as_str().cmp(b.url.as_str()))
        });
        feeds
    }
}

fn enrich(existing: &mut FeedInfo, new: FeedInfo) {
    if existing.title.is_none() {
        existing.title = new.title;
    }
    if existing.description.is_none() {
        existing.description = new.description;
    }
    if existing.version.is_none() {
        existing.version = new.version;
    }
    if existing.self_url.is_none() {
        existing.self_url = new.self_url;
    }
    if existing.site_url.is_none() {
        existing.site_url = new.site_url;
    }
    if existing.site_name.is_none() {
        existing.site_name = new.site_name;
    }
    if existing.favicon_url.is_none() {
        existing.favicon_url = new.favicon_url;
    }
    if existing.favicon_data_uri.is_none() {
        existing.favicon_data_uri = new.favicon_data_uri;
    }
    if existing.last_updated.is_none() {
        existing.last_updated = new.last_updated;
    }
    if existing.hubs.is_empty() {
        existing.hubs = new.hubs;
    }
    if existing.item_count == 0 {
        existing.item_count = new.item_count;
        existing.velocity = new.velocity;
    }
}

/// Attaches site metadata (title/favicon) to a feed discovered at the
/// same origin, when the feed itself carried none (spec §4.10).
pub fn attach_site_meta(
    feed: &mut FeedInfo,
    site_name: Option<&str>,
    favicon_url: Option<&Url>,
    favicon_data_uri: Option<&str>,
) {
    if feed.site_name.is_none() {
        feed.site_name = site_name.map(str::to_string);
    }
    if feed.favicon_url.is_none() {
        feed.favicon_url = favicon_url.cloned();
    }
    if feed.favicon_data_uri.is_none() {
        feed.favicon_data_uri = favicon_data_uri.map(str::to_string);
    }
}

fn score(feed: &FeedInfo, seed_hosts: &HashSet<String>) -> i32 {
    let mut s = 0;

    if let Some(host) = feed.url.host_str() {
        if seed_hosts.contains(host) {
            s += 10;
        }
    }

    let path_lower = feed.url.path().to_lowercase();
    if FEED_PATH_PATTERNS.iter().any(|p| path_lower.contains(p)) {
        s += 5;
    }

    if feed.title.as_deref().is_some_and(|t| !t.is_empty()) {
        s += 3;
    }
    if feed.description.as_deref().is_some_and(|d| !d.is_empty()) {
        s += 2;
    }

    if feed.item_count > 0 {
        s += 2;
    }
    if let Some(last_updated) = feed.last_updated {
        let age = Utc::now().signed_duration_since(last_updated);
        if age <= chrono::Duration::days(30) {
            s += 2;
        }
        if age <= chrono::Duration::days(7) {
            s += 2;
        }
    }

    if feed.bozo {
        s -= 5;
    }

    s += (feed.hubs.len() as i32).min(HUB_SCORE_CAP);

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::FeedFormat;

    fn feed(url: &str) -> FeedInfo {
        FeedInfo {
            url: Url::parse(url).unwrap(),
            title: None,
            description: None,
            version: None,
            format: FeedFormat::Rss,
            hubs: Vec::new(),
            self_url: None,
            site_url: None,
            site_name: None,
            favicon_url: None,
            favicon_data_uri: None,
            content_type: None,
            content_length: 0,
            last_updated: None,
            item_count: 0,
            velocity: 0.0,
            podcast: false,
            bozo: false,
            score: 0,
        }
    }

    #[test]
    fn dedup_never_creates_second_entry() {
        let rs = ResultSet::new();
        let mut f = feed("https://example.com/feed.xml");
        f.title = Some("T".to_string());
        rs.insert_or_enrich(f.clone());
        rs.insert_or_enrich(f);
        assert_eq!(rs.len(), 1);
    }

    #[test]
    fn enrich_fills_missing_fields_without_overwriting() {
        let rs = ResultSet::new();
        let mut first = feed("https://example.com/feed.xml");
        first.title = Some("Original".to_string());
        rs.insert_or_enrich(first);

        let mut second = feed("https://example.com/feed.xml");
        second.title = Some("Should not overwrite".to_string());
        second.description = Some("New description".to_string());
        rs.insert_or_enrich(second);

        let result = rs.finish(&HashSet::new());
        assert_eq!(result[0].title.as_deref(), Some("Original"));
        assert_eq!(result[0].description.as_deref(), Some("New description"));
    }

    #[test]
    fn scores_seed_host_bonus() {
        let rs = ResultSet::new();
        rs.insert_or_enrich(feed("https://example.com/feed.xml"));
        let mut seeds = HashSet::new();
        seeds.insert("example.com".to_string());
        let result = rs.finish(&seeds);
        assert!(result[0].score >= 10 + 5);
    }

    #[test]
    fn bozo_penalizes_score() {
        let mut clean = feed("https://example.com/feed.xml");
        clean.title = Some("T".to_string());
        let mut bozo = clean.clone();
        bozo.bozo = true;
        assert!(score(&bozo, &HashSet::new()) < score(&clean, &HashSet::new()));
    }

    #[test]
    fn sorted_desc_by_score_then_shorter_path_then_lexicographic() {
        let rs = ResultSet::new();
        let mut high = feed("https://example.com/b/feed.xml");
        high.title = Some("T".to_string());
        high.description = Some("D".to_string());
        rs.insert_or_enrich(high);
        rs.insert_or_enrich(feed("https://example.com/feed.xml"));
        rs.insert_or_enrich(feed("https://example.com/a.xml"));

        let result = rs.finish(&HashSet::new());
        assert_eq!(result[0].url.path(), "/b/feed.xml");
        assert_eq!(result[1].url.path(), "/a.xml");
        assert_eq!(result[2].url.path(), "/feed.xml");
    }

    #[test]
    fn hub_bonus_is_capped() {
        let mut f = feed("https://example.com/feed.xml");
        f.hubs = vec!["a".into(), "b".into(), "c".into()];
        let s = score(&f, &HashSet::new());
        let mut f_two_hubs = feed("https://example.com/feed.xml");
        f_two_hubs.hubs = vec!["a".into(), "b".into()];
        let s_two = score(&f_two_hubs, &HashSet::new());
        assert_eq!(s, s_two);
    }
}
