//! `skywatch` - Live aircraft view synchronization and caching
//!
//! This library keeps a live view of positioned entities inside a map region:
//! viewport events are debounced into settled regions, fetches are scheduled
//! one at a time, results are cached with a TTL for warm starts, and the
//! displayed batch is filtered on the way out.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod live;
pub mod logging;
pub mod model;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod sync;
pub mod tracker;

pub use cache::{CacheKey, CacheRecord, RecordInfo, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{apply_filters, Filters};
pub use live::{LiveView, ViewCommand};
pub use logging::init_logging;
pub use model::{Entity, EntityBatch, Position, Region, Viewport};
pub use scheduler::{FetchRequest, FetchScheduler, SettleDecision};
pub use source::{DataSource, OpenSkySource};
pub use store::{KeyValueStore, SqliteStore, StoreStats};
pub use sync::{Phase, SyncController, SyncFault, UserPreferences, ViewState};
pub use tracker::RegionTracker;
