//! Viewport tracking with trailing-edge debounce.
//!
//! Raw viewport events arrive continuously while the user drags or zooms.
//! The tracker keeps only the newest one and reports it as *settled* once no
//! further event has arrived for the debounce window:
//!
//! - **start**: the first event of a burst arms a deadline `window` from now;
//! - **reset**: every further event replaces the pending region and pushes the
//!   deadline out again;
//! - **fire**: once the deadline has passed, [`RegionTracker::fire`] hands out
//!   the pending region exactly once and disarms.
//!
//! The tracker owns no timer. The caller sleeps until
//! [`RegionTracker::deadline`] and then calls `fire`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::cache::{CacheKey, TtlCache};
use crate::model::Region;
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
struct Pending {
    region: Region,
    deadline: Instant,
}

/// Debounces raw viewport events into settled regions.
#[derive(Debug)]
pub struct RegionTracker {
    window: Duration,
    pending: Option<Pending>,
    restore_attempted: bool,
    discarded: u64,
}

impl RegionTracker {
    /// Create a tracker with the given debounce window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            restore_attempted: false,
            discarded: 0,
        }
    }

    /// The debounce window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Emit the stored viewport region, once per tracker, without debounce.
    ///
    /// Returns `None` on every call after the first, and when nothing valid
    /// was stored.
    pub fn restore<S: KeyValueStore>(&mut self, cache: &TtlCache<S>) -> Option<Region> {
        if self.restore_attempted {
            return None;
        }
        self.restore_attempted = true;

        let region = cache.get::<Region>(CacheKey::MapViewState)?;
        if let Err(e) = Region::new(region.north, region.south, region.east, region.west) {
            warn!(error = %e, "Ignoring stored viewport");
            return None;
        }
        debug!(%region, "Restored stored viewport");
        Some(region)
    }

    /// Record a raw viewport event observed at `now`.
    pub fn observe(&mut self, region: Region, now: Instant) {
        let deadline = now + self.window;
        if let Some(previous) = self.pending.replace(Pending { region, deadline }) {
            self.discarded += 1;
            trace!(superseded = %previous.region, "Viewport event superseded");
        }
    }

    /// When the pending region will settle, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Whether a region is waiting for its deadline.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of intermediate events dropped so far.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Emit the pending region if its deadline has passed.
    ///
    /// Every emission also persists the region under
    /// [`CacheKey::MapViewState`] so it can be restored later.
    pub fn fire<S: KeyValueStore>(&mut self, now: Instant, cache: &TtlCache<S>) -> Option<Region> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        let Pending { region, .. } = self.pending.take()?;

        cache.set(CacheKey::MapViewState, &region);
        debug!(%region, "Region settled");
        Some(region)
    }
}
