use std::sync::Arc;

use async_trait::async_trait;
use feedcrawl_core::{Request, Response};

/// Result of a `before_request` hook (spec §4.6).
pub enum BeforeOutcome {
    Continue(Request),
    Drop,
    ShortCircuit(Response),
}

/// Result of an `after_response` hook. `Retry` carries the request to
/// re-enqueue (with bumped retry count and backoff delay); the engine
/// decides whether the remaining deadline allows it (spec §5).
pub enum AfterOutcome {
    Response(Response),
    Retry(Request),
}

/// A pipeline stage. Both hooks are optional — default implementations
/// pass through unchanged (spec §4.6, §9).
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before_request(&self, req: Request) -> BeforeOutcome {
        BeforeOutcome::Continue(req)
    }

    async fn after_response(&self, resp: Response) -> AfterOutcome {
        AfterOutcome::Response(resp)
    }
}

/// Ordered list of middleware: `before_request` runs in registration
/// order, `after_response` in reverse (spec §4.6).
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(stages: Vec<Arc<dyn Middleware>>) -> Self {
        Self { stages }
    }

    pub async fn before(&self, mut req: Request) -> BeforeOutcome {
        for stage in &self.stages {
            match stage.before_request(req).await {
                BeforeOutcome::Continue(r) => req = r,
                other => return other,
            }
        }
        BeforeOutcome::Continue(req)
    }

    /// Runs every stage's `after_response` in reverse registration order.
    /// The first `Retry` verdict short-circuits the remaining stages.
    pub async fn after(&self, mut resp: Response) -> AfterOutcome {
        for stage in self.stages.iter().rev() {
            match stage.after_response(resp).await {
                AfterOutcome::Response(r) => resp = r,
                retry @ AfterOutcome::Retry(_) => return retry,
            }
        }
        AfterOutcome::Response(resp)
    }
}
