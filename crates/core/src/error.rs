use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leaf error type. Never crosses the public `search`/`search_with_info`
/// boundary unclassified — callers always see an [`ErrorType`] instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("dns failure: {0}")]
    DnsFailure(String),

    #[error("tls error: {0}")]
    SslError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("http error: status {status}")]
    HttpError { status: u16 },

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            CrawlError::InvalidUrl(_) => ErrorType::InvalidUrl,
            CrawlError::DnsFailure(_) => ErrorType::DnsFailure,
            CrawlError::SslError(_) => ErrorType::SslError,
            CrawlError::ConnectionError(_) => ErrorType::ConnectionError,
            CrawlError::HttpError { .. } => ErrorType::HttpError,
            CrawlError::Timeout(_) => ErrorType::Timeout,
            CrawlError::BodyTooLarge { .. } => ErrorType::None,
            CrawlError::UnsupportedContentType(_) => ErrorType::HttpError,
            CrawlError::Config(_) | CrawlError::Other(_) => ErrorType::Other,
        }
    }
}

/// Tag drawn from spec's closed error taxonomy (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    DnsFailure,
    SslError,
    ConnectionError,
    HttpError,
    Timeout,
    InvalidUrl,
    Other,
    #[default]
    None,
}

/// Classified failure of a root (seed) URL, returned by `search_with_info`
/// when every seed fails at the transport layer (§4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootError {
    pub error_type: ErrorType,
    pub url: String,
    pub status_code: Option<u16>,
}
