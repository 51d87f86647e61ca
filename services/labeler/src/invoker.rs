//! Remote fact collection over a worker's channel.

use plabel_facts::{CollectFacts, FactRecord};
use tracing::debug;

use crate::channel::Channel;
use crate::error::{LabelerError, Unavailable};
use crate::worker::{display_label, Worker};

/// Collect facts from `worker` over `channel`.
///
/// Waits for the remote side with no timeout of its own. Fails with
/// [`LabelerError::ConnectionUnavailable`] when the worker or channel is
/// missing, the worker has no identity, or the call fails in transit or on
/// the remote side.
pub async fn request_facts(
    worker: Option<&dyn Worker>,
    channel: Option<&dyn Channel>,
) -> Result<FactRecord, LabelerError> {
    let name = display_label(worker);

    let Some(worker) = worker else {
        return Err(LabelerError::unavailable(name, Unavailable::NoWorker));
    };
    let Some(id) = worker.identity() else {
        return Err(LabelerError::unavailable(name, Unavailable::NoIdentity));
    };
    let Some(channel) = channel else {
        return Err(LabelerError::unavailable(name, Unavailable::NoChannel));
    };

    debug!(worker = %id, "Requesting platform facts");
    let record = channel
        .call(CollectFacts)
        .await
        .map_err(|e| LabelerError::unavailable(name, e))?;

    debug!(
        worker = %id,
        architecture = record.architecture(),
        name = record.name(),
        version = record.version(),
        "Platform facts received"
    );
    Ok(record)
}
