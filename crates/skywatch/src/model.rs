//! Core live-view types for skywatch.
//!
//! This module defines the fetch scope ([`Region`]), the positioned objects
//! shown on the map ([`Entity`]), and the immutable result of one successful
//! fetch ([`EntityBatch`]).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Map camera state, kept only to restore the display after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Map center.
    pub center: Position,
    /// Map zoom level.
    pub zoom: f64,
}

/// A bounding box used as the fetch scope.
///
/// East and west are treated as a plain rectangle; there is no antimeridian
/// handling. The optional [`Viewport`] never influences fetch decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Northern latitude bound.
    pub north: f64,
    /// Southern latitude bound.
    pub south: f64,
    /// Eastern longitude bound.
    pub east: f64,
    /// Western longitude bound.
    pub west: f64,
    /// Display state captured alongside the bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl Region {
    /// Create a region from its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegion`] unless `north > south`.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        // NaN bounds compare as None and are rejected too
        if north.partial_cmp(&south) != Some(Ordering::Greater) {
            return Err(Error::InvalidRegion { north, south });
        }
        Ok(Self {
            north,
            south,
            east,
            west,
            viewport: None,
        })
    }

    /// Attach the camera state this region was observed with.
    #[must_use]
    pub fn with_viewport(mut self, center: Position, zoom: f64) -> Self {
        self.viewport = Some(Viewport { center, zoom });
        self
    }

    /// Whether two regions cover the same bounding box, ignoring viewport.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_bounds(&self, other: &Region) -> bool {
        self.north == other.north
            && self.south == other.south
            && self.east == other.east
            && self.west == other.west
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[N {:.3} S {:.3} E {:.3} W {:.3}]",
            self.north, self.south, self.east, self.west
        )
    }
}

/// A positioned aircraft.
///
/// Equality and hashing use `id` only: two snapshots of the same aircraft
/// at different positions are the same entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier (ICAO 24-bit address for OpenSky).
    pub id: String,
    /// Flight callsign, if broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Last known position.
    pub position: Position,
    /// True track in degrees, `[0, 360)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Altitude in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Ground speed in meters per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Country of registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
    /// Whether the aircraft reports being on the ground.
    #[serde(default)]
    pub on_ground: bool,
}

impl Entity {
    /// Create an airborne entity with only identity and position set.
    #[must_use]
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            callsign: None,
            position,
            heading: None,
            altitude: None,
            speed: None,
            origin_country: None,
            on_ground: false,
        }
    }

    /// Set the callsign.
    #[must_use]
    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = Some(callsign.into());
        self
    }

    /// Set the origin country.
    #[must_use]
    pub fn with_origin_country(mut self, country: impl Into<String>) -> Self {
        self.origin_country = Some(country.into());
        self
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The result of one successful fetch.
///
/// Batches are never merged: the next batch, for any region, replaces this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBatch {
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// The region the fetch was scoped to.
    pub region: Region,
    /// Entities returned by the data source.
    pub entities: Vec<Entity>,
}

impl EntityBatch {
    /// Create a batch.
    #[must_use]
    pub fn new(fetched_at: DateTime<Utc>, region: Region, entities: Vec<Entity>) -> Self {
        Self {
            fetched_at,
            region,
            entities,
        }
    }

    /// Number of entities in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the batch holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
