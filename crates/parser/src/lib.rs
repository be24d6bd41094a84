pub mod favicon;
pub mod link;
pub mod sitemeta;

pub use favicon::favicon_data_uri;
pub use link::{extract_links, host_crawl_candidates, try_url_candidates, LinkCandidate};
pub use sitemeta::{extract_site_meta, SiteMetaResult};

/// Priority assigned to same-origin pages kept in crawl scope purely to
/// keep discovering links (spec §4.8 rule 3 fallthrough, §4.4).
pub const PRIORITY_GENERIC: i32 = 100;

pub(crate) const FEED_TYPE_ATTRS: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
];

pub(crate) const FEED_PATH_KEYWORDS: &[&str] = &[
    "rss.xml", "atom.xml", "feeds/", "-feed", "_feed", "rss.", "feed.", "atom.", "rss", "atom",
    "feed", "xml", "json",
];
