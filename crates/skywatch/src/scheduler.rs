//! Fetch scheduling decisions.
//!
//! The scheduler performs no I/O. It is told about settled regions, timer
//! ticks and fetch completions, and answers with what to do next. It keeps at
//! most one fetch in flight; regions that settle meanwhile collapse into a
//! single "latest desired region" that is fetched as soon as the in-flight
//! request completes.
//!
//! Every fetch gets a ticket. A completion is only applied when its ticket is
//! the in-flight one *and* its region is still the latest desired region, so a
//! superseded fetch can never overwrite a newer batch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::Region;

/// A fetch the caller must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Identifies this fetch when it completes.
    pub ticket: u64,
    /// The region to fetch.
    pub region: Region,
    /// Background refresh: no loading indicator.
    pub silent: bool,
}

/// What to do about a newly settled region.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleDecision {
    /// Serve the cached batch; no network call.
    WarmStart,
    /// Start this fetch now.
    Fetch(FetchRequest),
    /// A fetch is in flight; the region was recorded and will be fetched after it.
    Queued,
}

/// What to do with a finished fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Whether the result belongs to the latest desired region and may be applied.
    pub apply: bool,
    /// The region the completed fetch was for.
    pub region: Region,
    /// Whether the completed fetch was a background refresh.
    pub silent: bool,
    /// A follow-up fetch to start immediately.
    pub next: Option<FetchRequest>,
}

/// Whether a mount may serve cached data instead of fetching.
///
/// Requires a cached batch and a last-fetch timestamp no older than `ttl`.
#[must_use]
pub fn warm_start_available(
    has_cached_batch: bool,
    last_fetch: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> bool {
    if !has_cached_batch {
        return false;
    }
    last_fetch.is_some_and(|at| (now - at).to_std().unwrap_or(Duration::ZERO) <= ttl)
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: u64,
    region: Region,
    silent: bool,
}

/// Single-flight fetch scheduler.
#[derive(Debug, Default)]
pub struct FetchScheduler {
    next_ticket: u64,
    in_flight: Option<InFlight>,
    desired: Option<Region>,
    queued: bool,
    settled_once: bool,
}

impl FetchScheduler {
    /// Create a scheduler that has seen nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The region the view wants data for, once any region has settled.
    #[must_use]
    pub fn desired_region(&self) -> Option<&Region> {
        self.desired.as_ref()
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the outstanding fetch is a background refresh.
    #[must_use]
    pub fn in_flight_is_silent(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|f| f.silent)
    }

    /// Whether a region is waiting for the in-flight fetch to finish.
    #[must_use]
    pub fn has_queued(&self) -> bool {
        self.queued
    }

    /// Decide what to do about a settled region.
    ///
    /// `warm` says whether the cache could serve the view right now; it is
    /// only honoured for the first region to settle.
    pub fn on_settled(&mut self, region: Region, warm: bool) -> SettleDecision {
        let first = !self.settled_once;
        self.settled_once = true;
        self.desired = Some(region.clone());

        if first && warm {
            debug!(%region, "Warm start, serving cached batch");
            return SettleDecision::WarmStart;
        }

        if let Some(flight) = &self.in_flight {
            debug!(%region, in_flight = flight.ticket, "Fetch in flight, queueing region");
            self.queued = true;
            return SettleDecision::Queued;
        }

        SettleDecision::Fetch(self.issue(region, false))
    }

    /// Decide whether a timer tick should refresh the current region.
    ///
    /// Ticks are ignored until a region has settled, while a new region is
    /// still debouncing (`region_pending`), and while any fetch is
    /// outstanding or queued.
    pub fn on_tick(&mut self, region_pending: bool) -> Option<FetchRequest> {
        if region_pending || self.in_flight.is_some() || self.queued {
            debug!(
                region_pending,
                in_flight = self.in_flight.is_some(),
                "Skipping refresh tick"
            );
            return None;
        }
        let region = self.desired.clone()?;
        Some(self.issue(region, true))
    }

    /// Record that the fetch with `ticket` finished, successfully or not.
    pub fn on_complete(&mut self, ticket: u64) -> Option<Completion> {
        if self.in_flight.as_ref().map(|f| f.ticket) != Some(ticket) {
            debug!(ticket, "Ignoring completion for unknown ticket");
            return None;
        }
        let flight = self.in_flight.take()?;

        let current = self
            .desired
            .as_ref()
            .is_some_and(|d| d.same_bounds(&flight.region));

        let next = if self.queued {
            self.queued = false;
            match self.desired.clone() {
                Some(region) if !current => Some(self.issue(region, false)),
                _ => None,
            }
        } else {
            None
        };

        if !current {
            debug!(ticket, region = %flight.region, "Discarding superseded fetch");
        }

        Some(Completion {
            apply: current,
            region: flight.region,
            silent: flight.silent,
            next,
        })
    }

    fn issue(&mut self, region: Region, silent: bool) -> FetchRequest {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(InFlight {
            ticket,
            region: region.clone(),
            silent,
        });
        debug!(ticket, %region, silent, "Issuing fetch");
        FetchRequest {
            ticket,
            region,
            silent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: f64) -> Region {
        Region::new(10.0 + offset, offset, 10.0 + offset, offset).unwrap()
    }

    fn expect_fetch(decision: SettleDecision) -> FetchRequest {
        match decision {
            SettleDecision::Fetch(request) => request,
            other => panic!("Expected Fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_warm_start_requires_batch_and_fresh_timestamp() {
        let now = Utc::now();
        let ttl = Duration::from_secs(300);
        let recent = Some(now - chrono::Duration::seconds(200));
        let stale = Some(now - chrono::Duration::seconds(301));

        assert!(warm_start_available(true, recent, now, ttl));
        assert!(!warm_start_available(false, recent, now, ttl));
        assert!(!warm_start_available(true, stale, now, ttl));
        assert!(!warm_start_available(true, None, now, ttl));
    }

    #[test]
    fn test_first_settle_warm_skips_fetch() {
        let mut scheduler = FetchScheduler::new();
        assert_eq!(
            scheduler.on_settled(region(0.0), true),
            SettleDecision::WarmStart
        );
        assert!(!scheduler.is_in_flight());
        assert!(scheduler.desired_region().is_some());
    }

    #[test]
    fn test_warm_only_honoured_once() {
        let mut scheduler = FetchScheduler::new();
        scheduler.on_settled(region(0.0), true);

        let request = expect_fetch(scheduler.on_settled(region(1.0), true));
        assert!(!request.silent);
        assert!(request.region.same_bounds(&region(1.0)));
    }

    #[test]
    fn test_cold_settle_fetches() {
        let mut scheduler = FetchScheduler::new();
        let request = expect_fetch(scheduler.on_settled(region(0.0), false));

        assert_eq!(request.ticket, 1);
        assert!(scheduler.is_in_flight());
    }

    #[test]
    fn test_tick_inert_before_any_region() {
        let mut scheduler = FetchScheduler::new();
        assert!(scheduler.on_tick(false).is_none());
    }

    #[test]
    fn test_tick_refreshes_silently() {
        let mut scheduler = FetchScheduler::new();
        let first = expect_fetch(scheduler.on_settled(region(0.0), false));
        scheduler.on_complete(first.ticket).unwrap();

        let refresh = scheduler.on_tick(false).unwrap();
        assert!(refresh.silent);
        assert!(refresh.region.same_bounds(&region(0.0)));
        assert!(scheduler.in_flight_is_silent());
    }

    #[test]
    fn test_tick_after_warm_start_refreshes() {
        let mut scheduler = FetchScheduler::new();
        scheduler.on_settled(region(0.0), true);
        assert!(scheduler.on_tick(false).is_some());
    }

    #[test]
    fn test_tick_skipped_while_busy_or_pending() {
        let mut scheduler = FetchScheduler::new();
        let first = expect_fetch(scheduler.on_settled(region(0.0), false));

        assert!(scheduler.on_tick(false).is_none(), "fetch in flight");
        scheduler.on_complete(first.ticket).unwrap();
        assert!(scheduler.on_tick(true).is_none(), "region pending");
    }

    #[test]
    fn test_single_flight_and_coalescing() {
        let mut scheduler = FetchScheduler::new();
        let a = expect_fetch(scheduler.on_settled(region(0.0), false));

        assert_eq!(
            scheduler.on_settled(region(1.0), false),
            SettleDecision::Queued
        );
        assert_eq!(
            scheduler.on_settled(region(2.0), false),
            SettleDecision::Queued
        );

        let done = scheduler.on_complete(a.ticket).unwrap();
        assert!(!done.apply, "A was superseded");
        let next = done.next.unwrap();
        assert!(next.region.same_bounds(&region(2.0)), "only the newest matters");
        assert!(!next.silent);

        let done = scheduler.on_complete(next.ticket).unwrap();
        assert!(done.apply);
        assert!(done.next.is_none());
        assert!(!scheduler.is_in_flight());
    }

    #[test]
    fn test_queued_same_region_needs_no_refetch() {
        let mut scheduler = FetchScheduler::new();
        let a = expect_fetch(scheduler.on_settled(region(0.0), false));
        scheduler.on_settled(region(5.0), false);
        scheduler.on_settled(region(0.0), false);

        let done = scheduler.on_complete(a.ticket).unwrap();
        assert!(done.apply);
        assert!(done.next.is_none());
        assert!(!scheduler.has_queued());
    }

    #[test]
    fn test_silent_refresh_superseded_by_region_change() {
        let mut scheduler = FetchScheduler::new();
        let a = expect_fetch(scheduler.on_settled(region(0.0), false));
        scheduler.on_complete(a.ticket).unwrap();

        let refresh = scheduler.on_tick(false).unwrap();
        assert_eq!(
            scheduler.on_settled(region(3.0), false),
            SettleDecision::Queued
        );

        let done = scheduler.on_complete(refresh.ticket).unwrap();
        assert!(!done.apply);
        assert!(done.silent);
        let next = done.next.unwrap();
        assert!(!next.silent);
        assert!(next.region.same_bounds(&region(3.0)));
    }

    #[test]
    fn test_unknown_ticket_ignored() {
        let mut scheduler = FetchScheduler::new();
        let a = expect_fetch(scheduler.on_settled(region(0.0), false));

        assert!(scheduler.on_complete(a.ticket + 7).is_none());
        assert!(scheduler.is_in_flight());

        assert!(scheduler.on_complete(a.ticket).is_some());
        assert!(scheduler.on_complete(a.ticket).is_none(), "completed twice");
    }

    #[test]
    fn test_tickets_increase() {
        let mut scheduler = FetchScheduler::new();
        let a = expect_fetch(scheduler.on_settled(region(0.0), false));
        scheduler.on_complete(a.ticket);
        let b = expect_fetch(scheduler.on_settled(region(1.0), false));
        assert!(b.ticket > a.ticket);
    }
}
