//! Concurrent feed-discovery crawler: given one or more seed URLs,
//! discovers and scores RSS/Atom/JSON-Feed endpoints reachable from
//! them (spec §1). This crate never installs a global tracing
//! subscriber — that is the binary's job (`src/main.rs`).

pub mod controller;
pub mod engine;
pub mod opml;

pub use controller::{search, search_blocking, search_with_info, search_with_info_blocking, SearchResult};
pub use feedcrawl_core::{CrawlConfig, CrawlStats, ErrorType, FeedInfo, RootError};
pub use opml::to_opml;
