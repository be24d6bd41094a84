pub mod dates;
pub mod json;
pub mod sniff;
pub mod velocity;
pub mod xml;

use feedcrawl_core::{FeedInfo, Response};
use sniff::Sniff;

/// Feed Validator contract (spec §4.9): classifies a response body as
/// RSS/Atom/JSON-Feed or not, extracting metadata on success.
pub fn validate(resp: &Response) -> Option<FeedInfo> {
    match sniff::sniff(resp.json.as_ref(), resp.text.as_deref()) {
        Sniff::JsonFeed => resp
            .json
            .as_ref()
            .map(|j| json::extract(j, &resp.final_url)),
        Sniff::Xml => resp.text.as_deref().and_then(|t| xml::extract(t, &resp.final_url)),
        Sniff::NotAFeed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::{Callback, ErrorType, Request};
    use std::collections::HashMap;
    use std::time::Duration;
    use url::Url;

    fn response_with(text: Option<&str>, json: Option<serde_json::Value>) -> Response {
        let url = Url::parse("https://example.com/feed").unwrap();
        Response {
            request: Request::new(url.clone(), Callback::ParseFeed, 10, 1),
            final_url: url,
            status: 200,
            headers: HashMap::new(),
            text: text.map(str::to_string),
            json,
            bytes: None,
            history: Vec::new(),
            error_type: ErrorType::None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn validates_rss_response() {
        let xml = r#"<rss version="2.0"><channel><title>T</title><item><title>I</title></item></channel></rss>"#;
        let resp = response_with(Some(xml), None);
        let info = validate(&resp).unwrap();
        assert_eq!(info.title.as_deref(), Some("T"));
    }

    #[test]
    fn plain_html_response_is_not_a_feed() {
        let resp = response_with(Some("<html><body>hi</body></html>"), None);
        assert!(validate(&resp).is_none());
    }

    #[test]
    fn validates_json_feed_response() {
        let body = serde_json::json!({
            "version": "https://jsonfeed.org/version/1",
            "title": "J",
            "items": [],
        });
        let resp = response_with(None, Some(body));
        let info = validate(&resp).unwrap();
        assert_eq!(info.title.as_deref(), Some("J"));
    }
}
