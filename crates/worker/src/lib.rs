//! Template synchronization pipeline.
//!
//! Polls the upstream template service, drops templates the downstream
//! consumer already has, normalizes the rest and publishes them.

pub mod dedup;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod transform;

pub use dedup::select_new;
pub use error::SyncError;
pub use scheduler::{CycleReport, Scheduler};
pub use state::{Baseline, SyncState, TemplateCache};
pub use transform::transform;
