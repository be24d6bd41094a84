pub mod chain;
pub mod content_type;
pub mod metrics;
pub mod retry;
pub mod robots;
pub mod sitemap;

pub use chain::{AfterOutcome, BeforeOutcome, Middleware, MiddlewareChain};
pub use content_type::ContentTypeMiddleware;
pub use metrics::{MetricsMiddleware, StatsCollector};
pub use retry::RetryMiddleware;
pub use robots::RobotsMiddleware;
pub use sitemap::parse_sitemap;
