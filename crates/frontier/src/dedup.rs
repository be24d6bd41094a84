use dashmap::DashSet;
use url::Url;

use feedcrawl_core::dedup_key;

/// Tracks which URLs have been dispatched for fetching, separately from
/// which URLs have been examined by a parsing callback, so a single
/// response can be re-examined by more than one callback without
/// triggering a re-fetch (spec §4.2).
#[derive(Default)]
pub struct DuplicateFilter {
    enqueued: DashSet<String>,
    parsed: DashSet<String>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `url` was newly inserted (i.e. not seen before
    /// for enqueue purposes).
    pub fn check_and_add_enqueue(&self, url: &Url) -> bool {
        self.enqueued.insert(dedup_key(url))
    }

    /// Returns `true` if `url` was newly inserted for parsing purposes.
    pub fn check_and_add_parse(&self, url: &Url) -> bool {
        self.parsed.insert(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_dedup_ignores_query() {
        let filter = DuplicateFilter::new();
        let a = Url::parse("https://example.com/feed?x=1").unwrap();
        let b = Url::parse("https://example.com/feed?x=2").unwrap();
        assert!(filter.check_and_add_enqueue(&a));
        assert!(!filter.check_and_add_enqueue(&b));
    }

    #[test]
    fn parse_dedup_preserves_query() {
        let filter = DuplicateFilter::new();
        let a = Url::parse("https://example.com/feed?x=1").unwrap();
        let b = Url::parse("https://example.com/feed?x=2").unwrap();
        assert!(filter.check_and_add_parse(&a));
        assert!(filter.check_and_add_parse(&b));
    }

    #[test]
    fn enqueue_and_parse_are_independent() {
        let filter = DuplicateFilter::new();
        let a = Url::parse("https://example.com/feed").unwrap();
        assert!(filter.check_and_add_enqueue(&a));
        // Same URL can still be newly "seen for parsing".
        assert!(filter.check_and_add_parse(&a));
    }
}
