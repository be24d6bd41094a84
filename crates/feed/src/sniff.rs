use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const SNIFF_WINDOW: usize = 1024;

static XML_ROOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<(\?xml|rss\b|feed\b|rdf:rdf\b)"#).unwrap());

/// What the feed validator decided a response's body looks like, per the
/// decision order in spec §4.9. `NotAFeed` is not an error — it's the
/// expected outcome for most crawled pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniff {
    JsonFeed,
    Xml,
    NotAFeed,
}

/// Applies §4.9's decision order: JSON Feed sniff first (explicit rule,
/// not the buggy short-circuiting expression from the source — see
/// DESIGN.md), then a tolerant regex over the XML root, else not a feed.
pub fn sniff(json: Option<&Value>, text: Option<&str>) -> Sniff {
    if let Some(json) = json {
        if is_json_feed(json) {
            return Sniff::JsonFeed;
        }
    }
    if let Some(text) = text {
        let window: String = text.chars().take(SNIFF_WINDOW).collect();
        if XML_ROOT_RE.is_match(&window) {
            return Sniff::Xml;
        }
    }
    Sniff::NotAFeed
}

fn is_json_feed(json: &Value) -> bool {
    let version_is_jsonfeed = json
        .get("version")
        .and_then(Value::as_str)
        .map(|v| v.contains("jsonfeed.org"))
        .unwrap_or(false);
    let items_is_list = json.get("items").map(Value::is_array).unwrap_or(false);
    version_is_jsonfeed && items_is_list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_json_feed() {
        let body = json!({"version": "https://jsonfeed.org/version/1.1", "items": []});
        assert_eq!(sniff(Some(&body), None), Sniff::JsonFeed);
    }

    #[test]
    fn rejects_json_feed_with_non_array_items() {
        let body = json!({"version": "https://jsonfeed.org/version/1.1", "items": "oops"});
        assert_eq!(sniff(Some(&body), None), Sniff::NotAFeed);
    }

    #[test]
    fn rejects_unrelated_json_with_feed_url_key() {
        // Guards against the source's short-circuiting expression, which
        // reduced to checking membership of "feed_url" alone.
        let body = json!({"feed_url": "https://example.com/feed", "items": []});
        assert_eq!(sniff(Some(&body), None), Sniff::NotAFeed);
    }

    #[test]
    fn detects_rss_root() {
        assert_eq!(
            sniff(None, Some("<?xml version=\"1.0\"?><rss version=\"2.0\">")),
            Sniff::Xml
        );
    }

    #[test]
    fn detects_atom_root() {
        assert_eq!(
            sniff(None, Some("<feed xmlns=\"http://www.w3.org/2005/Atom\">")),
            Sniff::Xml
        );
    }

    #[test]
    fn plain_html_is_not_a_feed() {
        assert_eq!(sniff(None, Some("<html><body>hi</body></html>")), Sniff::NotAFeed);
    }
}
