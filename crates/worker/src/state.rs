//! Mutable state owned by the scheduler's control loop.

use std::collections::{HashMap, HashSet};

use tmplsync_core::{CanonicalTemplate, DateWindow, ExternalId};
use tmplsync_source::Credential;

/// Templates published during the current epoch, keyed by external id.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    templates: HashMap<ExternalId, CanonicalTemplate>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Remember a template. Returns `false` if the id was already cached.
    pub fn insert(&mut self, template: CanonicalTemplate) -> bool {
        self.templates
            .insert(template.external_id.clone(), template)
            .is_none()
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalTemplate> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Ids the downstream consumer already had when the epoch started.
/// Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    ids: HashSet<ExternalId>,
}

impl Baseline {
    pub fn new(ids: HashSet<ExternalId>) -> Self {
        Self { ids }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<ExternalId> for Baseline {
    fn from_iter<I: IntoIterator<Item = ExternalId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Everything one epoch of synchronization needs.
///
/// The credential outlives epochs; [`SyncState::begin_epoch`] replaces the
/// rest.
#[derive(Debug, Clone)]
pub struct SyncState {
    pub epoch: u64,
    pub cache: TemplateCache,
    pub baseline: Baseline,
    pub window: DateWindow,
    pub credential: Credential,
}

impl SyncState {
    pub fn new(baseline: Baseline, window: DateWindow, credential: Credential) -> Self {
        Self {
            epoch: 1,
            cache: TemplateCache::new(),
            baseline,
            window,
            credential,
        }
    }

    /// Discard the cache and window and start over with a fresh baseline.
    pub fn begin_epoch(&mut self, baseline: Baseline, window: DateWindow) {
        self.epoch += 1;
        self.cache = TemplateCache::new();
        self.baseline = baseline;
        self.window = window;
    }
}
