//! Bounded, paced fetch/transform scheduling with per-variant failure isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{Instant, sleep_until};

use crate::app::source::{AssetSource, MarkupTransformer};
use crate::domain::errors::FetchFailure;
use crate::domain::model::{VariantGroup, VariantNode};

/// Fragment for a variant, or the reason it could not be produced.
pub type FetchResult = Result<String, FetchFailure>;

/// Per-variant results keyed by variant node id.
pub type FetchResults = HashMap<String, FetchResult>;

/// Resolved asset URLs keyed by node id. `None` marks a node the remote could not render.
pub type AssetUrls = HashMap<String, Option<String>>;

/// Shared admission control for every remote call in a batch.
///
/// At most `concurrency` permits are outstanding at once, and successive dispatches are spaced
/// by at least `interval`. Bursts are not smoothed beyond that fixed spacing.
#[derive(Debug)]
pub struct DispatchLimiter {
    permits: Semaphore,
    interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl DispatchLimiter {
    /// `concurrency` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(concurrency: usize, interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)),
            interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait for a free slot and for the pacing interval, then hand out a permit.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, FetchFailure> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchFailure::Dispatch)?;
        let slot = self.reserve_slot();
        sleep_until(slot).await;
        Ok(permit)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn reserve_slot(&self) -> Instant {
        let now = Instant::now();
        let mut last = self.last_dispatch.lock();
        let slot = match *last {
            Some(previous) => (previous + self.interval).max(now),
            None => now,
        };
        *last = Some(slot);
        slot
    }
}

/// Fetches and transforms every variant of a group against a shared [`DispatchLimiter`].
#[derive(Clone)]
pub struct Scheduler {
    source: Arc<dyn AssetSource>,
    transformer: Arc<dyn MarkupTransformer>,
    limiter: Arc<DispatchLimiter>,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn AssetSource>,
        transformer: Arc<dyn MarkupTransformer>,
        limiter: Arc<DispatchLimiter>,
    ) -> Self {
        Self {
            source,
            transformer,
            limiter,
        }
    }

    /// Look up asset URLs for every variant of `group` in one paced request.
    pub async fn resolve_urls(&self, group: &VariantGroup) -> Result<AssetUrls> {
        let ids = group.variant_ids();
        if ids.is_empty() {
            return Ok(AssetUrls::new());
        }

        let _permit = self.limiter.acquire().await?;
        self.source
            .fetch_asset_urls(&ids)
            .await
            .with_context(|| format!("failed to resolve asset urls for '{}'", group.raw_name))
    }

    /// Produce a result for every variant of `group`. Never fails as a whole.
    pub async fn run(&self, group: &VariantGroup, urls: &AssetUrls) -> FetchResults {
        let tasks = group
            .variants
            .iter()
            .map(|variant| self.run_variant(group, variant, urls));
        join_all(tasks).await.into_iter().collect()
    }

    async fn run_variant(
        &self,
        group: &VariantGroup,
        variant: &VariantNode,
        urls: &AssetUrls,
    ) -> (String, FetchResult) {
        let result = match urls.get(&variant.id).cloned().flatten() {
            Some(url) => self.fetch_and_transform(&url).await,
            None => Err(FetchFailure::MissingUrl),
        };

        if let Err(err) = &result {
            tracing::warn!(
                group = %group.resolved_name,
                node_id = %variant.id,
                variant = %variant.name,
                error = %err,
                "variant asset unavailable"
            );
        }

        (variant.id.clone(), result)
    }

    async fn fetch_and_transform(&self, url: &str) -> FetchResult {
        let _permit = self.limiter.acquire().await?;
        let raw = self
            .source
            .fetch_asset_content(url)
            .await
            .map_err(|err| FetchFailure::Fetch(format!("{err:#}")))?;
        self.transformer
            .transform(&raw)
            .map_err(|err| FetchFailure::Transform(format!("{err:#}")))
    }
}
