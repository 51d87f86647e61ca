//! Channel interface and the in-process implementation.
//!
//! A channel runs the [`CollectFacts`] task on the worker side of a
//! connection and hands back the record. Timeouts, retries, and framing are
//! the transport's business.

use async_trait::async_trait;
use plabel_facts::{CollectFacts, FactRecord};
use tracing::debug;

use crate::error::ChannelError;

/// Live communication handle to a worker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Run `task` on the worker and wait for its record.
    async fn call(&self, task: CollectFacts) -> Result<FactRecord, ChannelError>;
}

/// Channel to the current process.
///
/// The probe shells out to system tools, so it runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalChannel;

impl LocalChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Channel for LocalChannel {
    async fn call(&self, task: CollectFacts) -> Result<FactRecord, ChannelError> {
        debug!("Running fact collection in-process");
        tokio::task::spawn_blocking(move || task.run())
            .await
            .map_err(|e| ChannelError::Remote(e.to_string()))
    }
}
