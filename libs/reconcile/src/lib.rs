//! Tag reconciliation primitives.
//!
//! This library provides helpers for converging a worker's live tag set to
//! the tags derived from its platform facts. Key concepts:
//!
//! - **Desired tags**: What the facts say the worker should carry.
//! - **Applied tags**: What a previous reconciliation pass added.
//! - **Live tags**: What the worker actually carries, including tags its
//!   owner added by hand.
//!
//! # Invariants
//!
//! - Only applied tags are ever removed; hand-added tags survive
//! - A pass only claims tags it added itself or already owned
//! - Planning is deterministic given the same inputs
//! - Applying the same desired set twice yields an empty second delta

use std::collections::BTreeSet;
use std::hash::Hash;

use dashmap::DashMap;
use plabel_facts::Tag;

/// Convergence status for a worker's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// Live tags already match the desired tags.
    Converged,

    /// Tags must be added or removed.
    Converging,
}

impl ConvergenceStatus {
    /// Returns true if nothing needs to change.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// Changes needed to bring live tags in line with desired tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Previously applied tags that are no longer desired.
    pub remove: BTreeSet<Tag>,

    /// Desired tags missing from the live set.
    pub add: BTreeSet<Tag>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }

    pub fn status(&self) -> ConvergenceStatus {
        if self.is_empty() {
            ConvergenceStatus::Converged
        } else {
            ConvergenceStatus::Converging
        }
    }
}

/// Plan the delta for one worker.
///
/// Removes `applied \ desired` and adds `desired \ live`.
pub fn plan_delta(
    applied: &BTreeSet<Tag>,
    desired: &BTreeSet<Tag>,
    live: &BTreeSet<Tag>,
) -> TagDelta {
    TagDelta {
        remove: applied.difference(desired).cloned().collect(),
        add: desired.difference(live).cloned().collect(),
    }
}

/// Tags owned by reconciliation after `delta` has been applied.
///
/// This is `(applied ∩ desired) ∪ delta.add`. A desired tag the worker
/// already carried by hand is not claimed, so a later change never
/// removes it.
pub fn next_applied(
    applied: &BTreeSet<Tag>,
    desired: &BTreeSet<Tag>,
    delta: &TagDelta,
) -> BTreeSet<Tag> {
    applied
        .intersection(desired)
        .chain(delta.add.iter())
        .cloned()
        .collect()
}

/// Ledger of the tags each worker last received from reconciliation.
///
/// Keyed by worker identity. Entries for different workers live in
/// different shards, so updates for one worker never block another.
#[derive(Debug)]
pub struct AppliedTags<K: Eq + Hash> {
    entries: DashMap<K, BTreeSet<Tag>>,
}

impl<K: Eq + Hash> Default for AppliedTags<K> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> AppliedTags<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags applied to `key` by the last pass, empty if none.
    pub fn get(&self, key: &K) -> BTreeSet<Tag> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Record the tags a pass applied.
    pub fn record(&self, key: K, tags: BTreeSet<Tag>) {
        self.entries.insert(key, tags);
    }

    /// Drop the record for a worker that no longer exists.
    pub fn forget(&self, key: &K) -> Option<BTreeSet<Tag>> {
        self.entries.remove(key).map(|(_, tags)| tags)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
