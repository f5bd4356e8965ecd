//! The live-view state machine.
//!
//! [`SyncController`] owns everything the view renders: the current batch,
//! the phase, the error and the filters. It is driven by explicit calls
//! (viewport events, timer ticks, fetch completions) and answers with
//! [`FetchRequest`]s for the caller to execute. Apart from cache access it
//! performs no I/O, and none of its methods fail.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TtlCache};
use crate::error::{Error, Result};
use crate::filter::{apply_filters, Filters};
use crate::model::{Entity, EntityBatch, Region};
use crate::scheduler::{warm_start_available, FetchRequest, FetchScheduler, SettleDecision};
use crate::store::KeyValueStore;
use crate::tracker::RegionTracker;

/// Where the view is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing to show yet and nothing requested.
    #[default]
    Idle,
    /// A user-visible fetch is in flight.
    Loading,
    /// A batch is available, fresh or stale.
    Ready,
    /// No batch was ever obtained.
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Preferences persisted under [`CacheKey::UserPreferences`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// The last applied filters.
    pub filters: Filters,
}

/// A fetch failure as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFault {
    /// Human-readable description.
    pub message: String,
    /// Whether there is nothing else to show.
    pub blocking: bool,
}

/// A render-ready snapshot of the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    /// Current phase.
    pub phase: Phase,
    /// Entities of the current batch that pass the filters.
    pub entities: Vec<Entity>,
    /// Size of the current batch before filtering.
    pub total: usize,
    /// Show a loading indicator.
    pub loading: bool,
    /// A background refresh is running.
    pub refreshing: bool,
    /// The latest fetch error, if not yet superseded by a success.
    pub error: Option<String>,
    /// Whether `error` leaves nothing to display.
    pub blocking: bool,
    /// The region the view is showing or about to show.
    pub region: Option<Region>,
    /// When the current batch was fetched.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Synchronous controller for one live view.
#[derive(Debug)]
pub struct SyncController<S> {
    cache: TtlCache<S>,
    tracker: RegionTracker,
    scheduler: FetchScheduler,
    batch: Option<EntityBatch>,
    phase: Phase,
    loading: bool,
    refreshing: bool,
    fault: Option<SyncFault>,
    filters: Filters,
    region: Option<Region>,
}

impl<S: KeyValueStore> SyncController<S> {
    /// Create a controller over `cache` with the given debounce window.
    ///
    /// Filters start from the stored user preferences, if any.
    #[must_use]
    pub fn new(cache: TtlCache<S>, debounce: Duration) -> Self {
        let filters = cache
            .get::<UserPreferences>(CacheKey::UserPreferences)
            .map(|prefs| prefs.filters)
            .unwrap_or_default();

        Self {
            cache,
            tracker: RegionTracker::new(debounce),
            scheduler: FetchScheduler::new(),
            batch: None,
            phase: Phase::Idle,
            loading: false,
            refreshing: false,
            fault: None,
            filters,
            region: None,
        }
    }

    /// The cache this controller reads and writes.
    #[must_use]
    pub fn cache(&self) -> &TtlCache<S> {
        &self.cache
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The batch currently displayed, before filtering.
    #[must_use]
    pub fn batch(&self) -> Option<&EntityBatch> {
        self.batch.as_ref()
    }

    /// The latest unresolved fetch failure.
    #[must_use]
    pub fn fault(&self) -> Option<&SyncFault> {
        self.fault.as_ref()
    }

    /// Active filters.
    #[must_use]
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Initialize the view from the cache.
    ///
    /// Restores the stored viewport (if any) as the first settled region and
    /// serves a fresh cached batch right away when it covers that region.
    /// Without a stored viewport a warm batch's own region is settled, so
    /// periodic refreshes start. Returns the fetch to start, if the cache
    /// could not serve the region.
    pub fn mount(&mut self) -> Option<FetchRequest> {
        let restored = self.tracker.restore(&self.cache);
        let cached = self
            .cache
            .get::<EntityBatch>(CacheKey::FlightData)
            .filter(|batch| restored.as_ref().map_or(true, |r| batch.region.same_bounds(r)));
        let last_fetch = self.cache.get::<DateTime<Utc>>(CacheKey::LastFetch);

        if warm_start_available(cached.is_some(), last_fetch, self.cache.now(), self.cache.ttl()) {
            if let Some(batch) = cached {
                info!(
                    entities = batch.len(),
                    region = %batch.region,
                    "Serving cached batch"
                );
                self.region = Some(batch.region.clone());
                self.batch = Some(batch);
                self.phase = Phase::Ready;
            }
        }

        let region = restored.or_else(|| self.batch.as_ref().map(|b| b.region.clone()))?;
        self.settle(region)
    }

    /// Feed a raw viewport event observed at `now`.
    pub fn observe_viewport(&mut self, region: Region, now: Instant) {
        self.tracker.observe(region, now);
    }

    /// When the pending viewport event settles.
    #[must_use]
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.tracker.deadline()
    }

    /// Settle the pending viewport event if its deadline has passed.
    pub fn poll_tracker(&mut self, now: Instant) -> Option<FetchRequest> {
        let region = self.tracker.fire(now, &self.cache)?;
        self.settle(region)
    }

    /// Act on a settled region.
    pub fn settle(&mut self, region: Region) -> Option<FetchRequest> {
        self.region = Some(region.clone());
        let warm = self
            .batch
            .as_ref()
            .is_some_and(|b| b.region.same_bounds(&region))
            && warm_start_available(
                true,
                self.cache.get::<DateTime<Utc>>(CacheKey::LastFetch),
                self.cache.now(),
                self.cache.ttl(),
            );

        match self.scheduler.on_settled(region, warm) {
            SettleDecision::WarmStart => {
                self.phase = Phase::Ready;
                self.loading = false;
                None
            }
            SettleDecision::Fetch(request) => {
                self.phase = Phase::Loading;
                self.loading = true;
                Some(request)
            }
            SettleDecision::Queued => {
                self.phase = Phase::Loading;
                self.loading = true;
                None
            }
        }
    }

    /// Act on a refresh timer tick.
    pub fn tick(&mut self) -> Option<FetchRequest> {
        let request = self.scheduler.on_tick(self.tracker.is_pending())?;
        self.refreshing = true;
        Some(request)
    }

    /// Apply the outcome of the fetch identified by `ticket`.
    ///
    /// Outcomes for superseded or unknown fetches are dropped. Returns the
    /// next fetch to start, if a newer region was waiting.
    pub fn complete(&mut self, ticket: u64, outcome: Result<Vec<Entity>>) -> Option<FetchRequest> {
        let done = self.scheduler.on_complete(ticket)?;

        if done.apply {
            match outcome {
                Ok(entities) => self.accept(done.region, entities),
                Err(e) => self.reject(&e, done.silent),
            }
        } else {
            debug!(ticket, region = %done.region, "Dropping superseded outcome");
        }

        self.refreshing = false;
        self.loading = done.next.as_ref().is_some_and(|next| !next.silent);
        if done.next.is_some() {
            self.phase = Phase::Loading;
        }
        done.next
    }

    /// Replace the filters and persist them.
    pub fn apply_filters(&mut self, filters: Filters) {
        debug!(?filters, "Applying filters");
        self.cache.set(
            CacheKey::UserPreferences,
            &UserPreferences {
                filters: filters.clone(),
            },
        );
        self.filters = filters;
    }

    /// Snapshot for presentation.
    #[must_use]
    pub fn view(&self) -> ViewState {
        let (entities, total, fetched_at) = match &self.batch {
            Some(batch) => (
                apply_filters(&batch.entities, &self.filters),
                batch.len(),
                Some(batch.fetched_at),
            ),
            None => (Vec::new(), 0, None),
        };

        ViewState {
            phase: self.phase,
            entities,
            total,
            loading: self.loading,
            refreshing: self.refreshing,
            error: self.fault.as_ref().map(|f| f.message.clone()),
            blocking: self.fault.as_ref().is_some_and(|f| f.blocking),
            region: self.region.clone(),
            fetched_at,
        }
    }

    fn accept(&mut self, region: Region, entities: Vec<Entity>) {
        let batch = EntityBatch::new(self.cache.now(), region, entities);
        info!(entities = batch.len(), region = %batch.region, "Applied batch");

        self.cache.set(CacheKey::FlightData, &batch);
        self.cache.set(CacheKey::LastFetch, &batch.fetched_at);

        self.batch = Some(batch);
        self.fault = None;
        self.phase = Phase::Ready;
    }

    fn reject(&mut self, error: &Error, silent: bool) {
        if self.batch.is_some() {
            warn!(error = %error, silent, "Fetch failed, keeping previous batch");
            self.fault = Some(SyncFault {
                message: error.to_string(),
                blocking: false,
            });
            self.phase = Phase::Ready;
        } else {
            warn!(error = %error, silent, "Fetch failed with nothing to show");
            self.fault = Some(SyncFault {
                message: format!("{}: {error}", Error::NoData),
                blocking: true,
            });
            self.phase = Phase::Error;
        }
    }
}
