use thiserror::Error;

use tmplsync_bus::BusError;
use tmplsync_source::SourceError;

/// Failures that stop the sync loop. Everything else is logged and absorbed
/// within a cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("baseline load failed: {0}")]
    Baseline(#[source] SourceError),

    #[error("publish failed: {0}")]
    Publish(#[from] BusError),
}
