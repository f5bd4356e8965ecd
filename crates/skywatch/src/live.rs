//! Async driver wiring a [`SyncController`] to real timers and a data source.
//!
//! The driver is a single task looping over four event sources: presentation
//! commands, the debounce deadline, the refresh interval and fetch
//! completions. Fetches run as spawned tasks that report back through a
//! channel, so the controller is only ever touched from the loop.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::Result;
use crate::filter::Filters;
use crate::model::{Entity, Region};
use crate::scheduler::FetchRequest;
use crate::source::DataSource;
use crate::store::KeyValueStore;
use crate::sync::{SyncController, ViewState};

/// Input from the presentation layer.
#[derive(Debug, Clone)]
pub enum ViewCommand {
    /// A raw viewport change.
    Viewport(Region),
    /// Replace the display filters.
    SetFilters(Filters),
    /// Stop the driver.
    Shutdown,
}

type Outcome = (u64, Result<Vec<Entity>>);

/// A running live view.
#[derive(Debug)]
pub struct LiveView<S, D> {
    controller: SyncController<S>,
    source: Arc<D>,
    refresh_interval: Duration,
    state_tx: watch::Sender<ViewState>,
}

impl<S, D> LiveView<S, D>
where
    S: KeyValueStore,
    D: DataSource + 'static,
{
    /// Create a driver and the receiver its view states are published on.
    #[must_use]
    pub fn new(
        controller: SyncController<S>,
        source: Arc<D>,
        refresh_interval: Duration,
    ) -> (Self, watch::Receiver<ViewState>) {
        let (state_tx, state_rx) = watch::channel(controller.view());
        (
            Self {
                controller,
                source,
                refresh_interval,
                state_tx,
            },
            state_rx,
        )
    }

    /// Run until [`ViewCommand::Shutdown`] or until every command sender is
    /// dropped. Returns the controller in its final state.
    ///
    /// Must be called from within a tokio runtime; fetches are spawned onto it.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>) -> SyncController<S> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Outcome>();

        info!(source = self.source.name(), "Live view started");
        if let Some(request) = self.controller.mount() {
            self.spawn_fetch(request, &done_tx);
        }
        self.publish();

        let mut ticker = time::interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.controller.debounce_deadline();

            let request = tokio::select! {
                command = commands.recv() => match command {
                    Some(ViewCommand::Viewport(region)) => {
                        self.controller.observe_viewport(region, Instant::now());
                        None
                    }
                    Some(ViewCommand::SetFilters(filters)) => {
                        self.controller.apply_filters(filters);
                        None
                    }
                    Some(ViewCommand::Shutdown) | None => break,
                },
                () = wait_until(deadline) => self.controller.poll_tracker(Instant::now()),
                _ = ticker.tick() => self.controller.tick(),
                Some((ticket, outcome)) = done_rx.recv() => self.controller.complete(ticket, outcome),
            };

            if let Some(request) = request {
                self.spawn_fetch(request, &done_tx);
            }
            self.publish();
        }

        info!("Live view stopped");
        self.controller
    }

    fn spawn_fetch(&self, request: FetchRequest, done_tx: &mpsc::UnboundedSender<Outcome>) {
        let source = Arc::clone(&self.source);
        let done_tx = done_tx.clone();
        debug!(ticket = request.ticket, region = %request.region, silent = request.silent, "Starting fetch");

        tokio::spawn(async move {
            let outcome = source.fetch_entities_in_region(&request.region).await;
            // The driver may already be gone
            let _ = done_tx.send((request.ticket, outcome));
        });
    }

    fn publish(&self) {
        let view = self.controller.view();
        self.state_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
