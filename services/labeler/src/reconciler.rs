//! Reconciliation of fact-derived tags onto a worker's live tag set.
//!
//! The reconciler:
//! - Derives the desired tags from a fact record and the effective label config
//! - Removes tags it applied in an earlier pass that are no longer desired
//! - Never claims a desired tag the worker already carried
//! - Adds desired tags the worker is missing
//! - Leaves every other tag alone

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use plabel_facts::{FactRecord, LabelConfig, Tag};
use plabel_reconcile::{next_applied, plan_delta, AppliedTags, ConvergenceStatus, TagDelta};
use tracing::{debug, info};

use crate::worker::{Worker, WorkerId};

/// Applies fact-derived tags to workers.
pub struct Reconciler {
    /// Global label config. Workers may override it.
    config: ArcSwap<LabelConfig>,

    /// Tags applied by the last pass, per worker.
    applied: AppliedTags<WorkerId>,
}

impl Reconciler {
    pub fn new(config: LabelConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            applied: AppliedTags::new(),
        }
    }

    pub fn config(&self) -> LabelConfig {
        **self.config.load()
    }

    /// Replace the global label config. Takes effect on the next pass.
    pub fn set_config(&self, config: LabelConfig) {
        self.config.store(Arc::new(config));
    }

    /// Tags `record` should produce on `worker`.
    pub fn desired_tags(&self, worker: &dyn Worker, record: &FactRecord) -> BTreeSet<Tag> {
        let config = worker.label_config().unwrap_or_else(|| self.config());
        record.tags(&config)
    }

    /// Tags the last pass applied to the worker.
    pub fn applied_tags(&self, id: &WorkerId) -> BTreeSet<Tag> {
        self.applied.get(id)
    }

    /// Bring the worker's tags in line with `record`.
    ///
    /// A missing worker, identity, tag set, or record is a no-op. A missing
    /// record means nothing is known yet, not that tags should be cleared.
    pub fn apply(&self, worker: Option<&dyn Worker>, record: Option<&FactRecord>) -> TagDelta {
        let (Some(worker), Some(record)) = (worker, record) else {
            return TagDelta::default();
        };
        let Some(id) = worker.identity() else {
            return TagDelta::default();
        };
        let Some(tag_set) = worker.tag_set() else {
            debug!(worker = %id, "Worker has no tag set, skipping reconciliation");
            return TagDelta::default();
        };

        let desired = self.desired_tags(worker, record);
        let previous = self.applied.get(&id);
        let delta = plan_delta(&previous, &desired, &tag_set.snapshot());

        for tag in &delta.remove {
            tag_set.remove(tag);
        }
        for tag in &delta.add {
            tag_set.insert(tag.clone());
        }

        match delta.status() {
            ConvergenceStatus::Converged => {
                debug!(worker = %id, "Worker tags already converged");
            }
            ConvergenceStatus::Converging => {
                info!(
                    worker = %id,
                    added = delta.add.len(),
                    removed = delta.remove.len(),
                    "Worker tags reconciled"
                );
            }
        }

        self.applied
            .record(id, next_applied(&previous, &desired, &delta));
        delta
    }

    /// Drop the applied-tag record for a removed worker.
    pub fn forget(&self, id: &WorkerId) {
        self.applied.forget(id);
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(LabelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{AgentWorker, MemoryTagSet, TagSet};

    fn linux(version: &str) -> FactRecord {
        FactRecord::new("x86_64", "Linux", version, "Linux", "")
    }

    fn live(worker: &AgentWorker) -> BTreeSet<String> {
        worker
            .tags()
            .unwrap()
            .snapshot()
            .into_iter()
            .map(|t| t.to_string())
            .collect()
    }

    fn set(texts: &[&str]) -> BTreeSet<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_apply_is_idempotent() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1");
        let record = linux("5.15.0");

        let first = reconciler.apply(Some(&worker), Some(&record));
        let after_first = live(&worker);
        let second = reconciler.apply(Some(&worker), Some(&record));

        assert_eq!(first.add.len(), 5);
        assert!(second.is_empty());
        assert_eq!(live(&worker), after_first);
    }

    #[test]
    fn test_changed_record_swaps_only_differing_tags() {
        let reconciler = Reconciler::default();
        let tags = Arc::new(MemoryTagSet::with_tags(["gpu"]));
        let worker = AgentWorker::new("agent-1").with_tags(Arc::clone(&tags));

        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));
        let delta = reconciler.apply(Some(&worker), Some(&linux("5.19.0")));

        assert_eq!(delta.remove.len(), 2);
        assert!(delta.remove.contains("Linux-5.15.0"));
        assert!(delta.remove.contains("Linux-x86_64-5.15.0"));
        assert_eq!(delta.add.len(), 2);
        assert_eq!(
            live(&worker),
            set(&[
                "gpu",
                "x86_64",
                "Linux",
                "Linux-x86_64",
                "Linux-5.19.0",
                "Linux-x86_64-5.19.0"
            ])
        );
    }

    #[test]
    fn test_hand_added_tag_matching_derived_text_is_kept_when_not_applied() {
        let reconciler = Reconciler::default();
        let tags = Arc::new(MemoryTagSet::with_tags(["Linux-5.19.0"]));
        let worker = AgentWorker::new("agent-1").with_tags(tags);

        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        assert!(live(&worker).contains("Linux-5.19.0"));
        assert!(!reconciler
            .applied_tags(&WorkerId::new("agent-1"))
            .contains("Linux-5.19.0"));
    }

    #[test]
    fn test_hand_added_tag_survives_os_family_change() {
        let reconciler = Reconciler::default();
        let tags = Arc::new(MemoryTagSet::with_tags(["Linux"]));
        let worker = AgentWorker::new("agent-1").with_tags(tags);

        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));
        assert!(!reconciler
            .applied_tags(&WorkerId::new("agent-1"))
            .contains("Linux"));

        let windows = FactRecord::new("x86_64", "windows", "10.0", "Windows", "");
        reconciler.apply(Some(&worker), Some(&windows));

        assert_eq!(
            live(&worker),
            set(&[
                "Linux",
                "x86_64",
                "windows",
                "Windows",
                "windows-x86_64",
                "windows-10.0",
                "windows-x86_64-10.0"
            ])
        );
    }

    #[test]
    fn test_missing_inputs_are_noops() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1");

        assert!(reconciler.apply(None, Some(&linux("5.15.0"))).is_empty());
        assert!(reconciler.apply(Some(&worker), None).is_empty());
        assert!(reconciler
            .apply(Some(&AgentWorker::anonymous()), Some(&linux("5.15.0")))
            .is_empty());
        assert!(reconciler
            .apply(
                Some(&AgentWorker::new("agent-2").without_tags()),
                Some(&linux("5.15.0"))
            )
            .is_empty());
        assert!(live(&worker).is_empty());
    }

    #[test]
    fn test_missing_record_keeps_existing_tags() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1");
        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        reconciler.apply(Some(&worker), None);

        assert_eq!(live(&worker).len(), 5);
    }

    #[test]
    fn test_config_change_removes_disabled_kind() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1");
        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        reconciler.set_config(LabelConfig {
            architecture_name_version: false,
            ..LabelConfig::default()
        });
        let delta = reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        assert_eq!(delta.remove.len(), 1);
        assert!(delta.remove.contains("Linux-x86_64-5.15.0"));
        assert!(!live(&worker).contains("Linux-x86_64-5.15.0"));
    }

    #[test]
    fn test_worker_override_wins() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1").with_label_config(LabelConfig {
            name_version: false,
            architecture_name_version: false,
            ..LabelConfig::default()
        });

        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        assert_eq!(live(&worker), set(&["x86_64", "Linux", "Linux-x86_64"]));
    }

    #[test]
    fn test_forget() {
        let reconciler = Reconciler::default();
        let worker = AgentWorker::new("agent-1");
        reconciler.apply(Some(&worker), Some(&linux("5.15.0")));

        reconciler.forget(&WorkerId::new("agent-1"));

        assert!(reconciler.applied_tags(&WorkerId::new("agent-1")).is_empty());
    }
}
