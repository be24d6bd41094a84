use std::time::Duration;

use async_trait::async_trait;
use feedcrawl_core::{ErrorType, Response};

use crate::chain::{AfterOutcome, Middleware};

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const BACKOFF_FACTOR: u32 = 2;
const MAX_BACKOFF: Duration = Duration::from_secs(8);

const RETRIABLE_STATUSES: &[i32] = &[502, 503, 504, 429];

/// Classifies responses for retry and computes exponential backoff
/// (spec §4.6). The engine re-enqueues the returned request and is
/// responsible for skipping a retry whose backoff would exceed the
/// remaining global deadline (spec §5).
pub struct RetryMiddleware {
    max_retries: u32,
}

impl RetryMiddleware {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn should_retry(resp: &Response) -> bool {
        matches!(resp.error_type, ErrorType::Timeout | ErrorType::ConnectionError)
            || RETRIABLE_STATUSES.contains(&resp.status)
    }

    pub fn backoff_for(retry_count: u32) -> Duration {
        let multiplier = BACKOFF_FACTOR.saturating_pow(retry_count);
        (BASE_BACKOFF * multiplier).min(MAX_BACKOFF)
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn after_response(&self, resp: Response) -> AfterOutcome {
        if !Self::should_retry(&resp) || resp.request.retry_count >= self.max_retries {
            return AfterOutcome::Response(resp);
        }
        let mut retry_req = resp.request.clone();
        retry_req.delay = Self::backoff_for(retry_req.retry_count);
        retry_req.retry_count += 1;
        AfterOutcome::Retry(retry_req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::{Callback, Request};
    use url::Url;

    fn response_with(status: i32, error_type: ErrorType, retry_count: u32) -> Response {
        let mut req = Request::new(
            Url::parse("https://example.com/feed").unwrap(),
            Callback::ParseFeed,
            100,
            0,
        );
        req.retry_count = retry_count;
        Response {
            request: req,
            final_url: Url::parse("https://example.com/feed").unwrap(),
            status,
            headers: Default::default(),
            text: None,
            json: None,
            bytes: None,
            history: Vec::new(),
            error_type,
            elapsed: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn retries_on_retriable_status() {
        let mw = RetryMiddleware::new(3);
        let resp = response_with(503, ErrorType::None, 0);
        assert!(matches!(mw.after_response(resp).await, AfterOutcome::Retry(_)));
    }

    #[tokio::test]
    async fn does_not_retry_past_max_retries() {
        let mw = RetryMiddleware::new(3);
        let resp = response_with(503, ErrorType::None, 3);
        assert!(matches!(mw.after_response(resp).await, AfterOutcome::Response(_)));
    }

    #[tokio::test]
    async fn does_not_retry_non_retriable_4xx() {
        let mw = RetryMiddleware::new(3);
        let resp = response_with(404, ErrorType::HttpError, 0);
        assert!(matches!(mw.after_response(resp).await, AfterOutcome::Response(_)));
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(RetryMiddleware::backoff_for(0), Duration::from_millis(500));
        assert_eq!(RetryMiddleware::backoff_for(1), Duration::from_millis(1000));
        assert_eq!(RetryMiddleware::backoff_for(2), Duration::from_millis(2000));
        assert_eq!(RetryMiddleware::backoff_for(10), Duration::from_secs(8));
    }
}
