//! Worker, tag set, and registry seams.
//!
//! The orchestrator owns workers and their tags. The labeler only sees them
//! through these traits, and every accessor may return `None`: a worker that
//! cannot report something is a normal, degraded condition.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use plabel_facts::{LabelConfig, Tag};

use crate::channel::Channel;

/// Name used in logs for a worker that cannot report a name.
pub const UNNAMED_AGENT: &str = "unnamed agent";

/// Stable identity of a worker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A worker's live tag set.
pub trait TagSet: Send + Sync {
    fn contains(&self, tag: &Tag) -> bool;

    fn insert(&self, tag: Tag);

    fn remove(&self, tag: &Tag);

    fn snapshot(&self) -> BTreeSet<Tag>;
}

/// A worker as seen by the labeler.
pub trait Worker: Send + Sync {
    fn identity(&self) -> Option<WorkerId>;

    /// Name shown to operators. Defaults to the identity.
    fn display_name(&self) -> Option<String> {
        self.identity().map(|id| id.to_string())
    }

    fn tag_set(&self) -> Option<Arc<dyn TagSet>>;

    fn channel(&self) -> Option<Arc<dyn Channel>>;

    /// Per-worker override of the global label config.
    fn label_config(&self) -> Option<LabelConfig> {
        None
    }
}

/// Enumerates the workers the orchestrator currently knows.
pub trait WorkerRegistry: Send + Sync {
    fn workers(&self) -> Vec<Arc<dyn Worker>>;
}

/// Display name for logs, falling back to [`UNNAMED_AGENT`].
pub fn display_label(worker: Option<&dyn Worker>) -> String {
    worker
        .and_then(|w| w.display_name())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_AGENT.to_string())
}

/// In-memory tag set.
#[derive(Debug, Default)]
pub struct MemoryTagSet {
    tags: DashSet<Tag>,
}

impl MemoryTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let set = Self::new();
        for tag in tags {
            set.tags.insert(tag.into());
        }
        set
    }
}

impl TagSet for MemoryTagSet {
    fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    fn insert(&self, tag: Tag) {
        self.tags.insert(tag);
    }

    fn remove(&self, tag: &Tag) {
        self.tags.remove(tag);
    }

    fn snapshot(&self) -> BTreeSet<Tag> {
        self.tags.iter().map(|tag| tag.key().clone()).collect()
    }
}

/// A plain worker record, for registries that keep workers in memory.
#[derive(Clone, Default)]
pub struct AgentWorker {
    identity: Option<WorkerId>,
    display_name: Option<String>,
    tags: Option<Arc<MemoryTagSet>>,
    channel: Option<Arc<dyn Channel>>,
    label_config: Option<LabelConfig>,
}

impl AgentWorker {
    /// Creates a worker with an identity and an empty tag set.
    pub fn new(identity: impl Into<WorkerId>) -> Self {
        Self {
            identity: Some(identity.into()),
            tags: Some(Arc::new(MemoryTagSet::new())),
            ..Self::default()
        }
    }

    /// Creates a worker that reports nothing.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_tags(mut self, tags: Arc<MemoryTagSet>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn without_tags(mut self) -> Self {
        self.tags = None;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_label_config(mut self, config: LabelConfig) -> Self {
        self.label_config = Some(config);
        self
    }

    /// The worker's tag set, if it has one.
    pub fn tags(&self) -> Option<&Arc<MemoryTagSet>> {
        self.tags.as_ref()
    }
}

impl Worker for AgentWorker {
    fn identity(&self) -> Option<WorkerId> {
        self.identity.clone()
    }

    fn display_name(&self) -> Option<String> {
        self.display_name
            .clone()
            .or_else(|| self.identity.as_ref().map(|id| id.to_string()))
    }

    fn tag_set(&self) -> Option<Arc<dyn TagSet>> {
        self.tags.clone().map(|tags| tags as Arc<dyn TagSet>)
    }

    fn channel(&self) -> Option<Arc<dyn Channel>> {
        self.channel.clone()
    }

    fn label_config(&self) -> Option<LabelConfig> {
        self.label_config
    }
}

/// In-memory registry keyed by worker identity.
#[derive(Default)]
pub struct MemoryRegistry {
    workers: DashMap<WorkerId, Arc<dyn Worker>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a worker. Workers without an identity are ignored.
    pub fn insert(&self, worker: Arc<dyn Worker>) -> Option<WorkerId> {
        let id = worker.identity()?;
        self.workers.insert(id.clone(), worker);
        Some(id)
    }

    pub fn remove(&self, id: &WorkerId) -> Option<Arc<dyn Worker>> {
        self.workers.remove(id).map(|(_, worker)| worker)
    }

    pub fn get(&self, id: &WorkerId) -> Option<Arc<dyn Worker>> {
        self.workers.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

impl WorkerRegistry for MemoryRegistry {
    fn workers(&self) -> Vec<Arc<dyn Worker>> {
        self.workers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
