//! Data sources for positioned entities.
//!
//! A [`DataSource`] answers one question: which entities are inside a region
//! right now. Sources must only return entities that have a position.

pub mod opensky;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Entity, Region};

pub use opensky::OpenSkySource;

/// An asynchronous provider of entities scoped to a region.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Fetch every positioned entity currently inside `region`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`](crate::Error::Fetch) or
    /// [`Error::Timeout`](crate::Error::Timeout) when the source cannot be
    /// reached or answers with something unusable.
    async fn fetch_entities_in_region(&self, region: &Region) -> Result<Vec<Entity>>;
}
