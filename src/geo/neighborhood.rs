//! Neighborhood resolution for cafe coordinates

use crate::error::{CafeHopError, Result};
use crate::geo::transit::haversine_distance;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COMMUNITY_BOARD_PREFIX: &str = "Manhattan Community Board";

/// Manhattan community districts and the neighborhoods they cover
const COMMUNITY_BOARDS: [(&str, &str); 12] = [
    ("Manhattan Community Board 1", "Financial District, Tribeca, Battery Park City"),
    ("Manhattan Community Board 2", "Greenwich Village, SoHo, NoHo"),
    ("Manhattan Community Board 3", "Lower East Side, Chinatown, East Village"),
    ("Manhattan Community Board 4", "Chelsea, Hell's Kitchen (Clinton)"),
    ("Manhattan Community Board 5", "Midtown, Flatiron, Times Square"),
    ("Manhattan Community Board 6", "Murray Hill, Kips Bay, Gramercy"),
    ("Manhattan Community Board 7", "Upper West Side"),
    ("Manhattan Community Board 8", "Upper East Side, Yorkville"),
    ("Manhattan Community Board 9", "Morningside Heights, Manhattanville"),
    ("Manhattan Community Board 10", "Harlem"),
    ("Manhattan Community Board 11", "East Harlem"),
    ("Manhattan Community Board 12", "Washington Heights, Inwood"),
];

/// First neighborhood of a Manhattan community district, if `board` names one
pub fn translate_community_board(board: &str) -> Option<String> {
    COMMUNITY_BOARDS
        .iter()
        .find(|(name, _)| *name == board)
        .and_then(|(_, neighborhoods)| neighborhoods.split(',').next())
        .map(|first| first.trim().to_string())
}

/// Trait for resolving the neighborhood of a coordinate
#[async_trait]
pub trait NeighborhoodResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Option<String>>;
}

/// Named circular area used by the offline resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodRegion {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// Offline resolver over a fixed list of regions
///
/// Returns the region whose center is closest among those containing the
/// point.
#[derive(Debug, Clone, Default)]
pub struct StaticNeighborhoodResolver {
    regions: Vec<NeighborhoodRegion>,
}

impl StaticNeighborhoodResolver {
    pub fn new(regions: Vec<NeighborhoodRegion>) -> Self {
        Self { regions }
    }

    /// Load regions from a JSON array
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| CafeHopError::ConfigurationError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let regions: Vec<NeighborhoodRegion> =
            serde_json::from_str(&raw).map_err(|e| CafeHopError::ConfigurationError {
                message: format!("Failed to parse {}: {}", path.display(), e),
            })?;
        Ok(Self::new(regions))
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

#[async_trait]
impl NeighborhoodResolver for StaticNeighborhoodResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        let closest = self
            .regions
            .iter()
            .map(|region| {
                let d = haversine_distance(latitude, longitude, region.latitude, region.longitude);
                (region, d)
            })
            .filter(|(region, d)| *d <= region.radius_m)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        // Community district names are swapped for a neighborhood name
        Ok(closest.and_then(|(region, _)| {
            if region.name.starts_with(COMMUNITY_BOARD_PREFIX) {
                translate_community_board(&region.name)
            } else {
                Some(region.name.clone())
            }
        }))
    }
}
