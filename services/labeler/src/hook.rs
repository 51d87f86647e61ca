//! Lifecycle entry points: worker connect, configuration change, lookup.
//!
//! The connect hook is the failure-isolation boundary. Everything beneath it
//! returns errors; `on_connect` turns them into a single warning so a worker
//! always finishes connecting, with or without platform tags.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use plabel_facts::{FactRecord, LabelConfig, Tag};
use plabel_reconcile::TagDelta;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::cache::FactCache;
use crate::channel::Channel;
use crate::error::{LabelerError, Unavailable};
use crate::invoker::request_facts;
use crate::reconciler::Reconciler;
use crate::worker::{display_label, Worker, WorkerId, WorkerRegistry};

/// Outcome of a configuration change pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Workers whose facts were collected and applied.
    pub refreshed: usize,
    /// Workers whose collection failed.
    pub failed: usize,
}

/// Collects, caches, and applies platform tags for workers.
pub struct PlatformLabeler {
    cache: Arc<FactCache>,
    reconciler: Reconciler,
    registry: Arc<dyn WorkerRegistry>,

    /// Serializes collect-and-apply cycles per worker.
    cycles: DashMap<WorkerId, Arc<Mutex<()>>>,
}

impl PlatformLabeler {
    pub fn new(registry: Arc<dyn WorkerRegistry>, config: LabelConfig) -> Self {
        Self::with_cache(registry, config, Arc::new(FactCache::new()))
    }

    /// Create a labeler over an existing cache.
    pub fn with_cache(
        registry: Arc<dyn WorkerRegistry>,
        config: LabelConfig,
        cache: Arc<FactCache>,
    ) -> Self {
        Self {
            cache,
            reconciler: Reconciler::new(config),
            registry,
            cycles: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<FactCache> {
        &self.cache
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Called once a worker's transport is ready, before it goes online.
    ///
    /// Never fails. Any error is logged as one warning naming the worker.
    pub async fn on_connect(&self, worker: Option<&dyn Worker>, channel: Option<&dyn Channel>) {
        if let Err(e) = self.cache_and_refresh(worker, channel).await {
            let name = display_label(worker);
            warn!(
                worker = %name,
                error = %e,
                "Ignored platform detail collection failure for '{}' during preOnline phase.",
                name
            );
        }
    }

    /// Invalidate every cached record and re-collect for all known workers.
    ///
    /// Installs `config` first when given. A failing worker is logged and
    /// does not stop the others.
    pub async fn on_configuration_change(&self, config: Option<LabelConfig>) -> RefreshSummary {
        if let Some(config) = config {
            self.reconciler.set_config(config);
        }
        self.cache.invalidate_all();

        let workers = self.registry.workers();
        let results = join_all(workers.iter().map(|worker| async move {
            let channel = worker.channel();
            let result = self
                .cache_and_refresh(Some(worker.as_ref()), channel.as_deref())
                .await;
            if let Err(e) = &result {
                warn!(
                    worker = %display_label(Some(worker.as_ref())),
                    error = %e,
                    "Platform detail refresh failed"
                );
            }
            result.is_ok()
        }))
        .await;

        let refreshed = results.iter().filter(|ok| **ok).count();
        let summary = RefreshSummary {
            refreshed,
            failed: results.len() - refreshed,
        };
        info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            "Platform details refreshed after configuration change"
        );
        summary
    }

    /// Tags the cached facts produce for `worker`, without touching it.
    ///
    /// Empty when the worker is missing or nothing is cached for it.
    pub fn lookup_tags(&self, worker: Option<&dyn Worker>) -> BTreeSet<Tag> {
        let Some(worker) = worker else {
            return BTreeSet::new();
        };
        worker
            .identity()
            .and_then(|id| self.cache.get(&id))
            .map(|record| self.reconciler.desired_tags(worker, &record))
            .unwrap_or_default()
    }

    /// Collect facts and store them. Errors propagate.
    pub async fn cache_labels(
        &self,
        worker: Option<&dyn Worker>,
        channel: Option<&dyn Channel>,
    ) -> Result<Arc<FactRecord>, LabelerError> {
        let _cycle = self.lock_cycle(worker).await?;
        self.collect_and_store(worker, channel).await
    }

    /// Collect facts, store them, and apply them. Errors propagate.
    pub async fn cache_and_refresh(
        &self,
        worker: Option<&dyn Worker>,
        channel: Option<&dyn Channel>,
    ) -> Result<TagDelta, LabelerError> {
        let _cycle = self.lock_cycle(worker).await?;
        let record = self.collect_and_store(worker, channel).await?;
        Ok(self.reconciler.apply(worker, Some(&record)))
    }

    /// Apply whatever is cached for the worker.
    ///
    /// Waits for any cycle already running for the worker.
    pub async fn refresh(&self, worker: Option<&dyn Worker>) -> TagDelta {
        let Ok(_cycle) = self.lock_cycle(worker).await else {
            return TagDelta::default();
        };
        let record = worker
            .and_then(|w| w.identity())
            .and_then(|id| self.cache.get(&id));
        self.reconciler.apply(worker, record.as_deref())
    }

    /// Forget a worker that has been removed for good.
    ///
    /// Waits for any cycle already running for the worker, so its record
    /// cannot reappear afterwards.
    pub async fn forget(&self, id: &WorkerId) {
        let lock = Arc::clone(self.cycles.entry(id.clone()).or_default().value());
        let _cycle = lock.lock_owned().await;

        self.cache.remove(id);
        self.reconciler.forget(id);

        // Only the map and this guard hold the lock: nobody is waiting on it.
        self.cycles
            .remove_if(id, |_, entry| Arc::strong_count(entry) == 2);
    }

    async fn collect_and_store(
        &self,
        worker: Option<&dyn Worker>,
        channel: Option<&dyn Channel>,
    ) -> Result<Arc<FactRecord>, LabelerError> {
        let record = request_facts(worker, channel).await?;
        // request_facts only succeeds for a worker with an identity.
        let id = worker.and_then(|w| w.identity()).ok_or_else(|| {
            LabelerError::unavailable(display_label(worker), Unavailable::NoIdentity)
        })?;
        Ok(self.cache.put(id, record))
    }

    async fn lock_cycle(
        &self,
        worker: Option<&dyn Worker>,
    ) -> Result<OwnedMutexGuard<()>, LabelerError> {
        let name = display_label(worker);
        let Some(worker) = worker else {
            return Err(LabelerError::unavailable(name, Unavailable::NoWorker));
        };
        let Some(id) = worker.identity() else {
            return Err(LabelerError::unavailable(name, Unavailable::NoIdentity));
        };

        let lock = Arc::clone(self.cycles.entry(id).or_default().value());
        Ok(lock.lock_owned().await)
    }
}
