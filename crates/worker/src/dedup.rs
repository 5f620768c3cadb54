//! Which fetched templates are genuinely new.

use std::collections::HashSet;

use tmplsync_core::RawTemplate;

use crate::state::{Baseline, TemplateCache};

/// Records whose id is neither cached this epoch nor in the baseline.
///
/// Identity is the external id alone, so re-serialized copies of a known
/// record are recognised. A batch that repeats an id yields it once, at its
/// first position. Pure: the cache is not touched.
pub fn select_new<'a>(
    fetched: &'a [RawTemplate],
    cache: &TemplateCache,
    baseline: &Baseline,
) -> Vec<&'a RawTemplate> {
    let mut seen = HashSet::with_capacity(fetched.len());
    fetched
        .iter()
        .filter(|record| !cache.contains(&record.id) && !baseline.contains(&record.id))
        .filter(|record| seen.insert(record.id.as_str()))
        .collect()
}
