use std::collections::HashMap;
use std::time::{Duration, Instant};

use feedcrawl_core::{Callback, CrawlConfig, ErrorType, Method, Request, Response};
use tracing::{debug, warn};
use url::Url;

/// Content types the downloader will read a body for (spec §4.5). Anything
/// else is rejected before the body read begins.
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
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

const MAX_REDIRECTS: usize = 10;

/// Executes one HTTP request with timeout, size cap, and redirect
/// tracking (spec §4.5). Shared across all workers; the underlying
/// client's connection pool is sized to `concurrency`.
pub struct Downloader {
    client: reqwest::Client,
    request_timeout: Duration,
    max_content_length: usize,
}

impl Downloader {
    pub fn new(cfg: &CrawlConfig) -> Result<Self, feedcrawl_core::CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(cfg.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(cfg.concurrency.max(1))
            .build()
            .map_err(|e| feedcrawl_core::CrawlError::Config(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: cfg.request_timeout(),
            max_content_length: cfg.max_content_length,
        })
    }

    pub async fn fetch(&self, req: Request) -> Response {
        let start = Instant::now();
        let result = tokio::time::timeout(self.request_timeout, self.fetch_inner(&req)).await;

        match result {
            Ok(Ok(resp)) => resp,
            Ok(Err((error_type, status))) => transport_failure(req, error_type, status, start.elapsed()),
            Err(_) => transport_failure(req, ErrorType::Timeout, -1, start.elapsed()),
        }
    }

    async fn fetch_inner(&self, req: &Request) -> Result<Response, (ErrorType, i32)> {
        let max_len = req.max_content_length.unwrap_or(self.max_content_length);

        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
        };
        let mut builder = self.client.request(method, req.url.clone());
        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }

        debug!(url = %req.url, "fetching");
        let resp = builder.send().await.map_err(classify_reqwest_error)?;

        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        if final_url.scheme() == "http" && req.url.scheme() == "https" {
            warn!(url = %req.url, "redirected from https to http");
        }

        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_lowercase(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        // Favicon fetches are exempt from the feed/HTML content-type gate:
        // the accept-list exists to keep binaries out of the feed pipeline,
        // but the favicon callback exists specifically to fetch one (spec
        // §4.10).
        let is_favicon = req.callback == Callback::ParseFavicon;
        if !is_favicon {
            if let Some(ct) = &content_type {
                if !accepted(ct) {
                    return Err((ErrorType::HttpError, 415));
                }
            }
        }

        if status >= 400 {
            return Ok(build_response(
                req.clone(),
                final_url,
                status as i32,
                headers,
                None,
                None,
                None,
                ErrorType::HttpError,
            ));
        }

        let bytes = read_capped(resp, max_len).await?;

        if is_favicon {
            return Ok(build_response(
                req.clone(),
                final_url,
                status as i32,
                headers,
                None,
                None,
                Some(bytes),
                ErrorType::None,
            ));
        }

        let is_json = content_type
            .as_deref()
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let text = decode_text(&bytes, content_type.as_deref());
        let json = if is_json {
            text.as_deref().and_then(|t| serde_json::from_str(t).ok())
        } else {
            None
        };

        Ok(build_response(
            req.clone(),
            final_url,
            status as i32,
            headers,
            text,
            json,
            Some(bytes),
            ErrorType::None,
        ))
    }
}

async fn read_capped(
    resp: reqwest::Response,
    max_len: usize,
) -> Result<Vec<u8>, (ErrorType, i32)> {
    use futures_core_compat::StreamExt;
    let mut stream = resp.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_reqwest_error)?;
        buf.extend_from_slice(&chunk);
        if buf.len() > max_len {
            return Err((ErrorType::None, 413));
        }
    }
    Ok(buf)
}

fn decode_text(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if let Some(ct) = content_type {
        if let Some(encoding) = charset_from_content_type(ct) {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if !had_errors {
                return Some(decoded.into_owned());
            }
        }
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Some(s),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            Some(decoded.into_owned())
        }
    }
}

fn charset_from_content_type(ct: &str) -> Option<&'static encoding_rs::Encoding> {
    let mime: mime::Mime = ct.parse().ok()?;
    let charset = mime.get_param(mime::CHARSET)?;
    encoding_rs::Encoding::for_label(charset.as_str().as_bytes())
}

fn accepted(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or("").trim();
    ACCEPTED_CONTENT_TYPES.contains(&base)
}

fn classify_reqwest_error(e: reqwest::Error) -> (ErrorType, i32) {
    if e.is_redirect() {
        return (ErrorType::HttpError, -1);
    }
    if e.is_timeout() {
        return (ErrorType::Timeout, -1);
    }
    if e.is_connect() {
        let msg = e.to_string().to_lowercase();
        if msg.contains("dns") || msg.contains("resolve") || msg.contains("lookup") {
            return (ErrorType::DnsFailure, -1);
        }
        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return (ErrorType::SslError, -1);
        }
        return (ErrorType::ConnectionError, -1);
    }
    let msg = e.to_string().to_lowercase();
    if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
        return (ErrorType::SslError, -1);
    }
    (ErrorType::ConnectionError, -1)
}

fn build_response(
    request: Request,
    final_url: Url,
    status: i32,
    headers: HashMap<String, String>,
    text: Option<String>,
    json: Option<serde_json::Value>,
    bytes: Option<Vec<u8>>,
    error_type: ErrorType,
) -> Response {
    let history = if final_url == request.url {
        Vec::new()
    } else {
        vec![request.url.clone()]
    };
    Response {
        request,
        final_url,
        status,
        headers,
        text,
        json,
        bytes,
        history,
        error_type,
        elapsed: Duration::ZERO,
    }
}

fn transport_failure(
    request: Request,
    error_type: ErrorType,
    status: i32,
    elapsed: Duration,
) -> Response {
    let url = request.url.clone();
    Response {
        request,
        final_url: url,
        status,
        headers: HashMap::new(),
        text: None,
        json: None,
        bytes: None,
        history: Vec::new(),
        error_type,
        elapsed,
    }
}

/// `reqwest`'s body stream needs `StreamExt`; re-exported under a local
/// name to avoid pulling in all of `futures-util` for one method.
mod futures_core_compat {
    pub use futures_util::StreamExt;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_html_with_charset_param() {
        assert!(accepted("text/html; charset=utf-8"));
    }

    #[test]
    fn rejects_binary_content_type() {
        assert!(!accepted("image/png"));
    }

    #[test]
    fn accepts_json_feed_content_type() {
        assert!(accepted("application/feed+json"));
    }

    #[test]
    fn decodes_latin1_fallback_on_invalid_utf8() {
        let bytes = vec![0xE9, b'a', b'b']; // invalid UTF-8 lead byte
        let decoded = decode_text(&bytes, None).unwrap();
        assert!(decoded.contains("ab"));
    }
}
