//! Synthetic upstream records for local runs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use tmplsync_core::{RawQuestion, RawTemplate};

/// Mints a new, never-seen-before template on every call.
#[derive(Debug, Default)]
pub struct MockGenerator {
    minted: AtomicU64,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates minted so far.
    pub fn minted(&self) -> u64 {
        self.minted.load(Ordering::Relaxed)
    }

    pub fn next_template(&self) -> RawTemplate {
        let seq = self.minted.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        RawTemplate {
            id: Uuid::new_v4().to_string(),
            name: Some(format!("Mock template #{seq}")),
            description: Some("Generated locally, not from the template service".into()),
            modified: Some(now),
            created: Some(now),
            questions: Some(vec![
                RawQuestion {
                    kind: Some("checkbox".into()),
                    value: Some("Which channels do you use?".into()),
                    mandatory: Some(true),
                    options: Some(vec!["Email".into(), "Phone".into(), "Chat".into()]),
                },
                RawQuestion {
                    kind: Some("text".into()),
                    value: Some("Tell us more".into()),
                    mandatory: Some(false),
                    options: None,
                },
                // Upstream occasionally omits fields; keep that shape in local runs.
                RawQuestion {
                    kind: Some("rating".into()),
                    value: None,
                    mandatory: None,
                    options: None,
                },
            ]),
        }
    }
}
