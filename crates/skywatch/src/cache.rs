//! TTL cache over a [`KeyValueStore`].
//!
//! Every payload is wrapped in a [`CacheRecord`] envelope that remembers when
//! it was written. Reads past the TTL behave like misses and delete the stale
//! record. The cache never reports failure: store and serialization errors are
//! logged and turned into misses (on read) or dropped writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::store::KeyValueStore;

/// The fixed namespace of records kept for the live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The last applied [`EntityBatch`](crate::model::EntityBatch).
    FlightData,
    /// Timestamp of the last successful fetch.
    LastFetch,
    /// The last settled region with its viewport. Never expires.
    MapViewState,
    /// Persisted user preferences (filters).
    UserPreferences,
}

impl CacheKey {
    /// Every key, in display order.
    pub const ALL: [CacheKey; 4] = [
        CacheKey::FlightData,
        CacheKey::LastFetch,
        CacheKey::MapViewState,
        CacheKey::UserPreferences,
    ];

    /// The string stored in the underlying store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FlightData => "FLIGHT_DATA",
            Self::LastFetch => "LAST_FETCH",
            Self::MapViewState => "MAP_VIEW_STATE",
            Self::UserPreferences => "USER_PREFERENCES",
        }
    }

    /// Whether records under this key are subject to the TTL.
    #[must_use]
    pub fn expires(self) -> bool {
        !matches!(self, Self::MapViewState)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The envelope written for every cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// The cached value.
    pub payload: T,
    /// When the value was written.
    pub stored_at: DateTime<Utc>,
}

/// Metadata about a stored record, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    /// When the record was written.
    pub stored_at: DateTime<Utc>,
    /// Time elapsed since `stored_at`.
    pub age: Duration,
    /// Whether a `get` right now would return the payload.
    pub fresh: bool,
}

#[derive(Deserialize)]
struct StoredAt {
    stored_at: DateTime<Utc>,
}

/// A TTL-aware cache in front of a [`KeyValueStore`].
#[derive(Debug)]
pub struct TtlCache<S> {
    store: S,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> TtlCache<S> {
    /// Create a cache using the system clock.
    #[must_use]
    pub fn new(store: S, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    #[must_use]
    pub fn with_clock(store: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    /// The configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current time according to the cache's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The wrapped store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Time elapsed since `at`; timestamps in the future count as zero age.
    #[must_use]
    pub fn age_of(&self, at: DateTime<Utc>) -> Duration {
        (self.clock.now() - at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether something written at `at` is still within the TTL.
    #[must_use]
    pub fn is_fresh(&self, at: DateTime<Utc>) -> bool {
        self.age_of(at) <= self.ttl
    }

    /// Store `payload` under `key`, stamped with the current time.
    ///
    /// Failures are logged and swallowed.
    pub fn set<T: Serialize>(&self, key: CacheKey, payload: &T) {
        let record = CacheRecord {
            payload,
            stored_at: self.clock.now(),
        };
        let result = serde_json::to_string(&record)
            .map_err(Error::from)
            .and_then(|json| self.store.set(key.as_str(), &json));

        if let Err(e) = result {
            warn!(%key, error = %e, "Cache write failed, continuing without it");
        }
    }

    /// Read the payload under `key`.
    ///
    /// Returns `None` when the key was never set, was removed, is past the
    /// TTL (the record is deleted), or cannot be read or decoded.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        self.get_record(key).map(|record| record.payload)
    }

    /// Read the full record under `key`, with the same rules as [`get`](Self::get).
    #[must_use]
    pub fn get_record<T: DeserializeOwned>(&self, key: CacheKey) -> Option<CacheRecord<T>> {
        let raw = self.read_raw(key)?;

        let record: CacheRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "Unreadable cache record, treating as absent");
                return None;
            }
        };

        if key.expires() && !self.is_fresh(record.stored_at) {
            debug!(%key, stored_at = %record.stored_at, "Cache record expired");
            self.remove(key);
            return None;
        }

        Some(record)
    }

    /// Delete the record under `key`. Failures are logged and swallowed.
    pub fn remove(&self, key: CacheKey) {
        if let Err(e) = self.store.remove(key.as_str()) {
            warn!(%key, error = %e, "Cache delete failed");
        }
    }

    /// Delete every namespaced record.
    pub fn clear(&self) {
        for key in CacheKey::ALL {
            self.remove(key);
        }
    }

    /// Describe the record under `key` without decoding its payload or
    /// deleting it.
    #[must_use]
    pub fn inspect(&self, key: CacheKey) -> Option<RecordInfo> {
        let raw = self.read_raw(key)?;
        let StoredAt { stored_at } = serde_json::from_str(&raw).ok()?;
        let age = self.age_of(stored_at);
        Some(RecordInfo {
            stored_at,
            age,
            fresh: !key.expires() || age <= self.ttl,
        })
    }

    fn read_raw(&self, key: CacheKey) -> Option<String> {
        match self.store.get(key.as_str()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%key, error = %e, "Cache read failed, treating as absent");
                None
            }
        }
    }
}
