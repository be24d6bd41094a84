use async_trait::async_trait;
use feedcrawl_core::{Callback, ErrorType, Response};

use crate::chain::{AfterOutcome, Middleware};

const ACCEPTED: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "text/xml",
    "application/xml",
    "application/rss+xml",
    "application/atom+xml",
    "application/json",
    "application/feed+json",
    "text/plain",
];

/// Re-affirms the downloader's content-type gate on the final response:
/// some servers misreport content-type until the body has arrived
/// (spec §4.6).
pub struct ContentTypeMiddleware;

#[async_trait]
impl Middleware for ContentTypeMiddleware {
    async fn after_response(&self, mut resp: Response) -> AfterOutcome {
        if resp.error_type != ErrorType::None {
            return AfterOutcome::Response(resp);
        }
        if resp.request.callback == Callback::ParseFavicon {
            return AfterOutcome::Response(resp);
        }
        if let Some(ct) = resp.headers.get("content-type") {
            let base = ct.split(';').next().unwrap_or("").trim();
            if !ACCEPTED.contains(&base) {
                resp.error_type = ErrorType::HttpError;
                resp.status = 415;
                resp.text = None;
                resp.json = None;
            }
        }
        AfterOutcome::Response(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::{Callback, Request};
    use std::time::Duration;
    use url::Url;

    fn resp(content_type: &str) -> Response {
        let mut headers = std::collections::HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Response {
            request: Request::new(
                Url::parse("https://example.com/x").unwrap(),
                Callback::ParseHtml,
                100,
                0,
            ),
            final_url: Url::parse("https://example.com/x").unwrap(),
            status: 200,
            headers,
            text: Some("body".to_string()),
            json: None,
            bytes: None,
            history: Vec::new(),
            error_type: ErrorType::None,
            elapsed: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn rejects_binary_content_type_late() {
        let mw = ContentTypeMiddleware;
        let out = mw.after_response(resp("image/png")).await;
        let AfterOutcome::Response(r) = out else { panic!() };
        assert_eq!(r.status, 415);
        assert!(r.text.is_none());
    }

    #[tokio::test]
    async fn passes_html_through() {
        let mw = ContentTypeMiddleware;
        let out = mw.after_response(resp("text/html")).await;
        let AfterOutcome::Response(r) = out else { panic!() };
        assert_eq!(r.status, 200);
        assert!(r.text.is_some());
    }
}
