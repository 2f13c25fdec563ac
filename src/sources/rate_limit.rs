use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use http::Extensions;
use reqwest_middleware::{Middleware, Next};
use tokio::time::Instant;

/// Names the upstream a request belongs to; attached with
/// `RequestBuilder::with_extension`. Untagged requests are not spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Source(pub &'static str);

/// Minimum spacing between two requests to the same upstream.
///
/// E-utilities allow 3 req/sec anonymously and 10 req/sec with `NCBI_API_KEY`.
pub(crate) fn min_interval(source: &str, has_ncbi_api_key: bool) -> Duration {
    match source {
        "ncbi-eutils" if has_ncbi_api_key => Duration::from_millis(100),
        "ncbi-eutils" => Duration::from_millis(334),
        "dgidb" => Duration::from_millis(250),
        "uniprot" => Duration::from_millis(200),
        _ => Duration::from_millis(100),
    }
}

/// Hands out send slots per upstream. Each caller reserves the next free
/// slot under the lock and sleeps outside it, so waiters queue in order.
#[derive(Debug)]
pub(crate) struct Spacing {
    has_ncbi_api_key: bool,
    next_free: Mutex<HashMap<&'static str, Instant>>,
}

impl Spacing {
    pub(crate) fn new(has_ncbi_api_key: bool) -> Self {
        Self {
            has_ncbi_api_key,
            next_free: Mutex::new(HashMap::new()),
        }
    }

    fn reserve(&self, source: &'static str) -> Instant {
        let interval = min_interval(source, self.has_ncbi_api_key);
        let now = Instant::now();
        let mut next_free = self.next_free.lock().unwrap_or_else(|e| e.into_inner());
        let slot = next_free
            .get(source)
            .copied()
            .filter(|free| *free > now)
            .unwrap_or(now);
        next_free.insert(source, slot + interval);
        slot
    }

    pub(crate) async fn wait_turn(&self, source: &'static str) {
        let slot = self.reserve(source);
        tokio::time::sleep_until(slot).await;
    }
}

fn process_spacing() -> Arc<Spacing> {
    static SPACING: OnceLock<Arc<Spacing>> = OnceLock::new();
    SPACING
        .get_or_init(|| Arc::new(Spacing::new(crate::sources::ncbi_api_key().is_some())))
        .clone()
}

#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    spacing: Arc<Spacing>,
}

impl RateLimitMiddleware {
    pub(crate) fn new() -> Self {
        Self {
            spacing: process_spacing(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        if let Some(Source(name)) = extensions.get::<Source>().copied() {
            self.spacing.wait_turn(name).await;
        }
        next.run(req, extensions).await
    }
}
