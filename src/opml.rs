//! OPML writer (spec §6): a pure function of its input list.

use feedcrawl_core::FeedInfo;

/// Serializes `feeds` as an OPML 2.0 document (spec §6).
pub fn to_opml(feeds: &[FeedInfo]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<opml version=\"2.0\"><head><title>Discovered feeds</title></head><body>\n");
    for feed in feeds {
        let title = feed.title.as_deref().unwrap_or(feed.url.as_str());
        let html_url = feed
            .site_url
            .as_ref()
            .map(|u| u.as_str())
            .unwrap_or("");
        out.push_str(&format!(
            "<outline type=\"rss\" text=\"{}\" xmlUrl=\"{}\" htmlUrl=\"{}\"/>\n",
            escape_attr(title),
            escape_attr(feed.url.as_str()),
            escape_attr(html_url),
        ));
    }
    out.push_str("</body></opml>\n");
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::FeedFormat;
    use url::Url;

    fn feed(url: &str, title: &str) -> FeedInfo {
        FeedInfo {
            url: Url::parse(url).unwrap(),
            title: Some(title.to_string()),
            description: None,
            version: None,
            format: FeedFormat::Rss,
            hubs: Vec::new(),
            self_url: None,
            site_url: Some(Url::parse("https://example.com/").unwrap()),
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
    fn produces_one_outline_per_feed() {
        let feeds = vec![feed("https://example.com/feed.xml", "Example Feed")];
        let doc = to_opml(&feeds);
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("<opml version=\"2.0\">"));
        assert!(doc.contains("xmlUrl=\"https://example.com/feed.xml\""));
        assert!(doc.contains("text=\"Example Feed\""));
        assert!(doc.contains("htmlUrl=\"https://example.com/\""));
    }

    #[test]
    fn escapes_ampersands_in_title() {
        let feeds = vec![feed("https://example.com/feed.xml", "News & Views")];
        let doc = to_opml(&feeds);
        assert!(doc.contains("text=\"News &amp; Views\""));
    }

    #[test]
    fn empty_list_is_a_valid_empty_body() {
        let doc = to_opml(&[]);
        assert!(doc.contains("<body>\n</body>"));
    }
}
