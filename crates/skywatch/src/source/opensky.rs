//! OpenSky Network `states/all` adapter.
//!
//! Each state vector is a positional JSON array:
//!
//! | Index | Field | Used as |
//! |---|---|---|
//! | 0 | `icao24` | `id` |
//! | 1 | `callsign` | `callsign`, trimmed, empty means none |
//! | 2 | `origin_country` | `origin_country` |
//! | 5 | `longitude` | `position.lon` |
//! | 6 | `latitude` | `position.lat` |
//! | 7 | `baro_altitude` | `altitude` |
//! | 8 | `on_ground` | `on_ground` |
//! | 9 | `velocity` | `speed` |
//! | 10 | `true_track` | `heading` |
//! | 13 | `geo_altitude` | `altitude` when barometric is missing |

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use super::DataSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Entity, Position, Region};

const SOURCE_NAME: &str = "opensky";

const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const ORIGIN_COUNTRY: usize = 2;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const GEO_ALTITUDE: usize = 13;

/// Fetches aircraft from the OpenSky Network REST API.
#[derive(Debug, Clone)]
pub struct OpenSkySource {
    client: reqwest::Client,
    base_url: String,
}

impl OpenSkySource {
    /// Create a source for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skywatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a source from the `[source]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.source.base_url.clone(), config.source_timeout())
    }

    /// The `states/all` endpoint.
    #[must_use]
    pub fn states_url(&self) -> String {
        format!("{}/states/all", self.base_url)
    }

    fn map_transport_error(e: &reqwest::Error, region: &Region) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                operation: format!("{SOURCE_NAME} request for {region}"),
            }
        } else {
            Error::fetch(SOURCE_NAME, e.to_string())
        }
    }
}

#[async_trait]
impl DataSource for OpenSkySource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_entities_in_region(&self, region: &Region) -> Result<Vec<Entity>> {
        debug!(%region, "Requesting OpenSky states");

        let response = self
            .client
            .get(self.states_url())
            .query(&[
                ("lamin", region.south),
                ("lomin", region.west),
                ("lamax", region.north),
                ("lomax", region.east),
            ])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e, region))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(SOURCE_NAME, format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Self::map_transport_error(&e, region))?;

        let entities = parse_states(&body)?;
        debug!(count = entities.len(), "Parsed OpenSky states");
        Ok(entities)
    }
}

/// Convert a `states/all` response body into entities.
///
/// Rows without a latitude or longitude, or without an `icao24`, are
/// skipped. A `null` or missing `states` field means no aircraft.
///
/// # Errors
///
/// Returns [`Error::Fetch`] if the body is not an object or `states` is
/// neither `null` nor an array.
pub fn parse_states(body: &Value) -> Result<Vec<Entity>> {
    let object = body
        .as_object()
        .ok_or_else(|| Error::fetch(SOURCE_NAME, "response is not a JSON object"))?;

    let rows = match object.get("states") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(Error::fetch(SOURCE_NAME, "`states` is not an array")),
    };

    Ok(rows.iter().filter_map(parse_row).collect())
}

fn parse_row(row: &Value) -> Option<Entity> {
    let fields = row.as_array()?;
    let field = |index: usize| fields.get(index).filter(|v| !v.is_null());

    let id = field(ICAO24)?.as_str()?.trim();
    let (Some(lat), Some(lon)) = (
        field(LATITUDE).and_then(Value::as_f64),
        field(LONGITUDE).and_then(Value::as_f64),
    ) else {
        trace!(id, "Skipping state without position");
        return None;
    };

    let mut entity = Entity::new(id, Position::new(lat, lon));
    entity.callsign = field(CALLSIGN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from);
    entity.origin_country = field(ORIGIN_COUNTRY)
        .and_then(Value::as_str)
        .map(String::from);
    entity.altitude = field(BARO_ALTITUDE)
        .or_else(|| field(GEO_ALTITUDE))
        .and_then(Value::as_f64);
    entity.on_ground = field(ON_GROUND).and_then(Value::as_bool).unwrap_or(false);
    entity.speed = field(VELOCITY).and_then(Value::as_f64);
    entity.heading = field(TRUE_TRACK)
        .and_then(Value::as_f64)
        .map(|track| track.rem_euclid(360.0));

    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "time": 1_700_000_000,
            "states": [
                ["34718e", "IBE123  ", "Spain", 1_700_000_000, 1_700_000_000,
                 -3.7, 40.4, 10_972.8, false, 230.5, 45.0, 0.0, null, 11_000.0, "1000", false, 0],
                ["4ca123", "", "Ireland", null, 1_700_000_000,
                 null, 53.4, null, true, 0.0, null, null, null, null, null, false, 0],
                ["3c6444", null, "Germany", 1_700_000_000, 1_700_000_000,
                 8.5, 50.0, null, false, 200.0, 360.0, 0.0, null, 9_000.0, null, false, 0]
            ]
        })
    }

    #[test]
    fn test_parse_full_row() {
        let entities = parse_states(&sample_body()).unwrap();
        let iberia = &entities[0];

        assert_eq!(iberia.id, "34718e");
        assert_eq!(iberia.callsign.as_deref(), Some("IBE123"));
        assert_eq!(iberia.origin_country.as_deref(), Some("Spain"));
        assert_eq!(iberia.position, Position::new(40.4, -3.7));
        assert_eq!(iberia.altitude, Some(10_972.8));
        assert_eq!(iberia.speed, Some(230.5));
        assert_eq!(iberia.heading, Some(45.0));
        assert!(!iberia.on_ground);
    }

    #[test]
    fn test_rows_without_position_dropped() {
        let entities = parse_states(&sample_body()).unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["34718e", "3c6444"]);
    }

    #[test]
    fn test_geo_altitude_fallback_and_heading_wrap() {
        let entities = parse_states(&sample_body()).unwrap();
        let lufthansa = &entities[1];

        assert!(lufthansa.callsign.is_none());
        assert_eq!(lufthansa.altitude, Some(9_000.0));
        assert_eq!(lufthansa.heading, Some(0.0));
    }

    #[test]
    fn test_blank_callsign_is_none() {
        let body = json!({"states": [["abc", "   ", "France", null, null, 2.0, 48.0]]});
        let entities = parse_states(&body).unwrap();
        assert!(entities[0].callsign.is_none());
        assert!(entities[0].altitude.is_none());
    }

    #[test]
    fn test_null_states_means_empty() {
        assert!(parse_states(&json!({"time": 1, "states": null})).unwrap().is_empty());
        assert!(parse_states(&json!({"time": 1})).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_is_fetch_error() {
        let err = parse_states(&json!([1, 2, 3])).unwrap_err();
        assert!(err.is_transient());

        let err = parse_states(&json!({"states": "nope"})).unwrap_err();
        assert!(matches!(err, Error::Fetch { source_name: "opensky", .. }));
    }

    #[test]
    fn test_non_array_rows_skipped() {
        let body = json!({"states": ["garbage", ["ok", null, null, null, null, 1.0, 2.0]]});
        let entities = parse_states(&body).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "ok");
    }

    #[test]
    fn test_states_url_trims_trailing_slash() {
        let source =
            OpenSkySource::new("https://example.test/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(source.states_url(), "https://example.test/api/states/all");
        assert_eq!(source.name(), "opensky");
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.source.base_url = "http://localhost:8080/".to_string();
        let source = OpenSkySource::from_config(&config).unwrap();
        assert_eq!(source.states_url(), "http://localhost:8080/states/all");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let source = OpenSkySource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let region = Region::new(41.0, 40.0, -3.0, -4.0).unwrap();

        let err = source.fetch_entities_in_region(&region).await.unwrap_err();
        assert!(err.is_transient());
    }
}
