//! Nearest subway station lookup over a precomputed GTFS table
//!
//! The table is loaded once at startup into an immutable [`TransitIndex`]
//! and shared by reference with whoever needs it.

use crate::error::{CafeHopError, Result};
use crate::types::NearestStation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Precomputed GTFS data as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitFeed {
    /// `[lat, lon]` per stop, in radians
    pub station_coords: Vec<[f64; 2]>,
    pub stop_names: Vec<String>,
    pub stop_ids: Vec<String>,
    pub stop_to_routes: HashMap<String, Vec<String>>,
    pub route_id_to_name: HashMap<String, String>,
    /// Parent station per stop; empty or null when the stop is its own station
    pub parent_stations: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
struct Stop {
    id: String,
    name: String,
    lat_rad: f64,
    lon_rad: f64,
    /// Parent station id, or the stop's own id
    station_id: String,
}

/// Immutable spatial lookup over transit stops
#[derive(Debug, Clone)]
pub struct TransitIndex {
    stops: Vec<Stop>,
    stop_index: HashMap<String, usize>,
    stop_to_routes: HashMap<String, Vec<String>>,
    route_id_to_name: HashMap<String, String>,
}

impl TransitIndex {
    /// Build an index, checking that the per-stop columns line up
    pub fn from_feed(feed: TransitFeed) -> Result<Self> {
        let count = feed.stop_ids.len();
        let columns = [
            ("station_coords", feed.station_coords.len()),
            ("stop_names", feed.stop_names.len()),
            ("parent_stations", feed.parent_stations.len()),
        ];
        for (name, len) in columns {
            if len != count {
                return Err(CafeHopError::TransitDataInvalid {
                    reason: format!("{} has {} rows, expected {}", name, len, count),
                }
                .into());
            }
        }

        let stops: Vec<Stop> = feed
            .stop_ids
            .into_iter()
            .zip(feed.stop_names)
            .zip(feed.station_coords)
            .zip(feed.parent_stations)
            .map(|(((id, name), [lat_rad, lon_rad]), parent)| {
                let station_id = parent
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| id.clone());
                Stop {
                    id,
                    name,
                    lat_rad,
                    lon_rad,
                    station_id,
                }
            })
            .collect();

        let stop_index = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| (stop.id.clone(), i))
            .collect();

        Ok(Self {
            stops,
            stop_index,
            stop_to_routes: feed.stop_to_routes,
            route_id_to_name: feed.route_id_to_name,
        })
    }

    /// Load and index a precomputed feed from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| CafeHopError::TransitDataInvalid {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;

        if raw.trim().is_empty() {
            return Err(CafeHopError::TransitDataInvalid {
                reason: format!("{} is empty", path.display()),
            }
            .into());
        }

        let feed: TransitFeed =
            serde_json::from_str(&raw).map_err(|e| CafeHopError::TransitDataInvalid {
                reason: format!("Failed to parse {}: {}", path.display(), e),
            })?;

        let index = Self::from_feed(feed)?;
        info!(
            "Loaded transit data from {} ({} stops)",
            path.display(),
            index.stop_count()
        );
        Ok(index)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Closest station to a coordinate in decimal degrees
    ///
    /// Lines are aggregated over every stop sharing the closest stop's parent
    /// station. Route names containing `X` (express variants) are dropped.
    pub fn nearest_station(&self, latitude: f64, longitude: f64) -> Option<NearestStation> {
        let lat_rad = latitude.to_radians();
        let lon_rad = longitude.to_radians();

        let (closest, distance_m) = self
            .stops
            .iter()
            .map(|stop| {
                let d = haversine_radians(lat_rad, lon_rad, stop.lat_rad, stop.lon_rad);
                (stop, d)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

        let station_id = &closest.station_id;
        let mut station_stop_ids: HashSet<&str> = self
            .stops
            .iter()
            .filter(|stop| &stop.station_id == station_id)
            .map(|stop| stop.id.as_str())
            .collect();
        station_stop_ids.insert(station_id.as_str());

        let route_ids: HashSet<&str> = station_stop_ids
            .iter()
            .filter_map(|id| self.stop_to_routes.get(*id))
            .flatten()
            .map(String::as_str)
            .collect();

        let lines: Vec<String> = route_ids
            .iter()
            .filter_map(|rid| self.route_id_to_name.get(*rid))
            // Route ids that share a display name collapse to one line
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|name| !name.contains('X'))
            .map(|name| name.to_lowercase())
            .collect();

        let station = self
            .stop_index
            .get(station_id)
            .map(|&i| self.stops[i].name.clone())
            .unwrap_or_else(|| closest.name.clone());

        debug!(
            "Nearest station to ({}, {}) is {} at {:.1}m",
            latitude, longitude, station, distance_m
        );

        Some(NearestStation {
            station,
            distance_m,
            lines,
        })
    }
}

/// Great circle distance in meters between two points given in degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_radians(
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    )
}

fn haversine_radians(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
