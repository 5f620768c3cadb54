//! The sync control loop.
//!
//! One task owns the [`SyncState`]. Each poll cycle runs to completion before
//! the interval wait starts, so cycles never overlap. The epoch reset is a
//! deadline checked once after every cycle; it never interrupts one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use tmplsync_bus::TemplatePublisher;
use tmplsync_core::config::SchedulerConfig;
use tmplsync_core::DateWindow;
use tmplsync_source::{Credential, FetchOutcome, TemplateSource};

use crate::dedup::select_new;
use crate::error::SyncError;
use crate::state::{Baseline, SyncState};
use crate::transform::transform;

/// Used when the reset interval does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + interval`, saturating instead of overflowing.
fn deadline_after(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(interval)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Source of "today" for the date window.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub selected: usize,
    pub published: usize,
    pub degraded: bool,
}

pub struct Scheduler {
    source: Arc<dyn TemplateSource>,
    publisher: TemplatePublisher,
    config: SchedulerConfig,
    clock: Clock,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn TemplateSource>,
        publisher: TemplatePublisher,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            publisher,
            config,
            clock: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Replace the UTC wall-clock date used for date windows.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    async fn load_baseline(
        &self,
        credential: &mut Credential,
        window: &DateWindow,
    ) -> Result<Baseline, SyncError> {
        let ids = self
            .source
            .fetch_existing_ids(credential, window)
            .await
            .map_err(SyncError::Baseline)?;
        info!(count = ids.len(), window = %window, "loaded baseline of existing template ids");
        Ok(Baseline::new(ids))
    }

    /// Load the baseline and build the state for a first epoch.
    pub async fn start_epoch(
        &self,
        mut credential: Credential,
        today: NaiveDate,
    ) -> Result<SyncState, SyncError> {
        let window = DateWindow::starting(today);
        let baseline = self.load_baseline(&mut credential, &window).await?;
        Ok(SyncState::new(baseline, window, credential))
    }

    /// Reload the baseline and discard the cache and date window in place.
    #[instrument(skip_all, fields(epoch = state.epoch))]
    pub async fn reset_epoch(&self, state: &mut SyncState, today: NaiveDate) -> Result<(), SyncError> {
        let window = DateWindow::starting(today);
        let baseline = self.load_baseline(&mut state.credential, &window).await?;
        let dropped = state.cache.len();
        state.begin_epoch(baseline, window);
        info!(epoch = state.epoch, dropped, "epoch reset");
        Ok(())
    }

    /// Fetch, filter, transform and publish once.
    ///
    /// A degraded fetch leaves the window where it was. A publish failure
    /// aborts the cycle; ids already cached stay cached.
    #[instrument(skip_all, fields(epoch = state.epoch))]
    pub async fn poll_cycle(
        &self,
        state: &mut SyncState,
        today: NaiveDate,
    ) -> Result<CycleReport, SyncError> {
        state.window.roll_to(today);

        let fetched = match self
            .source
            .fetch_templates(&mut state.credential, &state.window)
            .await
        {
            FetchOutcome::Fetched(templates) => templates,
            FetchOutcome::Degraded(e) => {
                warn!(error = %e, window = %state.window, "upstream unavailable, cycle degraded");
                return Ok(CycleReport {
                    degraded: true,
                    ..CycleReport::default()
                });
            }
        };

        let selected = select_new(&fetched, &state.cache, &state.baseline);
        let mut report = CycleReport {
            fetched: fetched.len(),
            selected: selected.len(),
            ..CycleReport::default()
        };

        for raw in selected {
            let canonical = transform(raw);
            state.cache.insert(canonical.clone());
            self.publisher.publish(&canonical).await?;
            report.published += 1;
        }

        state.window.advance();
        debug!(window = %state.window, cached = state.cache.len(), "cycle complete");
        Ok(report)
    }

    /// Poll forever. Returns only on a fatal error.
    pub async fn run(&self) -> Result<(), SyncError> {
        self.run_with(Credential::default()).await
    }

    pub async fn run_with(&self, credential: Credential) -> Result<(), SyncError> {
        let mut state = self.start_epoch(credential, self.today()).await?;
        let mut reset_at = deadline_after(self.config.reset_interval());
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            reset_interval_secs = self.config.reset_interval_secs,
            routing_key = %self.publisher.routing_key(),
            "scheduler started"
        );

        loop {
            let report = self.poll_cycle(&mut state, self.today()).await?;
            info!(
                fetched = report.fetched,
                selected = report.selected,
                published = report.published,
                degraded = report.degraded,
                "poll cycle finished"
            );

            if Instant::now() >= reset_at {
                self.reset_epoch(&mut state, self.today()).await?;
                reset_at = deadline_after(self.config.reset_interval());
            }

            sleep(self.config.poll_interval()).await;
        }
    }
}
