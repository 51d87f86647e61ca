//! # plabel-facts
//!
//! Platform facts for workers: what they run, normalized into a record that
//! projects onto a set of tags.
//!
//! ## Design Principles
//!
//! - Collection is total: missing or unreadable values become sentinels,
//!   never errors
//! - Records are immutable; every derived tag is a pure function of the
//!   stored fields
//! - The worker-side probe and the pure collector are separate so the
//!   collector can be exercised with any raw input
//!
//! ## Derived tags
//!
//! For a record with architecture `x86_64`, family `Linux` and version
//! `5.15.0`:
//!
//! - `x86_64`
//! - `Linux`
//! - `Linux-x86_64`
//! - `Linux-5.15.0`
//! - `Linux-x86_64-5.15.0`
//!
//! plus the display name and, on Windows, the feature update identifier.

mod collector;
mod label_config;
mod probe;
mod record;
mod release;
mod tag;

pub use collector::{collect, Distribution, FactCollector, FeatureUpdateLookup, UNKNOWN_VALUE};
pub use label_config::{LabelConfig, TagKind};
pub use probe::{probe_local, CollectFacts, RegistryFeatureUpdate};
pub use record::FactRecord;
pub use release::{LsbRelease, OsRelease};
pub use tag::Tag;
