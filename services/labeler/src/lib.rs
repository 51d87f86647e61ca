//! plabel Labeler Library
//!
//! Collects platform facts from connected workers, caches them per worker,
//! and reconciles them into each worker's tag set.
//!
//! ## Architecture
//!
//! ```text
//! PlatformLabeler (hook)
//! ├── request_facts   (collect over the worker's channel)
//! ├── FactCache       (latest record per worker)
//! └── Reconciler      (derived tags -> live tag set)
//! ```
//!
//! ## Modules
//!
//! - `worker`: Worker, tag set, and registry seams
//! - `channel`: Channel seam and the in-process channel
//! - `hook`: Connect, configuration-change, and lookup entry points

pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod hook;
pub mod invoker;
pub mod reconciler;
pub mod worker;

// Re-export commonly used types
pub use cache::FactCache;
pub use channel::{Channel, LocalChannel};
pub use error::{ChannelError, LabelerError, Unavailable};
pub use hook::{PlatformLabeler, RefreshSummary};
pub use invoker::request_facts;
pub use reconciler::Reconciler;
pub use worker::{
    AgentWorker, MemoryRegistry, MemoryTagSet, TagSet, Worker, WorkerId, WorkerRegistry,
    UNNAMED_AGENT,
};
