//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use cafe_hop::config::RatingConfig;
use cafe_hop::error::{CafeHopError, Result};
use cafe_hop::geo::{NeighborhoodRegion, NeighborhoodResolver, TransitFeed};
use cafe_hop::rating::{CatalogEntry, EloRatingEngine, InMemoryCatalog};
use cafe_hop::upload::{UploadRequest, UploadService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Resolver that always answers with the same neighborhood and counts calls
#[derive(Debug)]
pub struct FixedResolver {
    name: String,
    calls: AtomicUsize,
}

impl FixedResolver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NeighborhoodResolver for FixedResolver {
    async fn resolve(&self, _latitude: f64, _longitude: f64) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.name.clone()))
    }
}

/// Resolver standing in for an unreachable geocoding service
#[derive(Debug, Default)]
pub struct FailingResolver;

#[async_trait]
impl NeighborhoodResolver for FailingResolver {
    async fn resolve(&self, _latitude: f64, _longitude: f64) -> Result<Option<String>> {
        Err(CafeHopError::InternalError {
            message: "geocoder timed out".to_string(),
        }
        .into())
    }
}

/// Build a catalog from `(id, rating, has_compared)` triples
pub fn seeded_catalog(cafes: &[(&str, f64, bool)]) -> Arc<InMemoryCatalog> {
    let entries = cafes
        .iter()
        .map(|(id, rating, has_compared)| {
            CatalogEntry::rated(*id, id.replace('_', " "), *rating, *has_compared)
        })
        .collect();
    Arc::new(InMemoryCatalog::with_entries(entries))
}

/// Upload service over `catalog` with the default Elo engine and a fixed seed
pub fn upload_service(catalog: Arc<InMemoryCatalog>) -> UploadService {
    UploadService::new(
        catalog,
        Arc::new(EloRatingEngine::default()),
        RatingConfig::default(),
    )
    .with_rng_seed(1234)
}

pub fn upload_request(cafe_name: &str, comparisons: &[(&str, f64)]) -> UploadRequest {
    UploadRequest {
        cafe_name: cafe_name.to_string(),
        comparisons: comparisons
            .iter()
            .map(|(id, outcome)| (id.to_string(), *outcome))
            .collect(),
        ..Default::default()
    }
}

fn coord(lat_deg: f64, lon_deg: f64) -> [f64; 2] {
    [lat_deg.to_radians(), lon_deg.to_radians()]
}

/// Two stations: Bedford Av (L) and 14 St-Union Sq (4/5/6 and N/Q/R)
pub fn sample_transit_feed() -> TransitFeed {
    TransitFeed {
        station_coords: vec![
            coord(40.7178, -73.9570),
            coord(40.7177, -73.9571),
            coord(40.7359, -73.9906),
            coord(40.7355, -73.9910),
            coord(40.7349, -73.9903),
        ],
        stop_names: vec![
            "Bedford Av".to_string(),
            "Bedford Av".to_string(),
            "14 St-Union Sq".to_string(),
            "14 St-Union Sq".to_string(),
            "14 St-Union Sq".to_string(),
        ],
        stop_ids: vec![
            "L08".to_string(),
            "L08N".to_string(),
            "635".to_string(),
            "635N".to_string(),
            "R20N".to_string(),
        ],
        stop_to_routes: HashMap::from([
            ("L08N".to_string(), vec!["L".to_string()]),
            (
                "635N".to_string(),
                vec!["4".to_string(), "5".to_string(), "6".to_string(), "6X".to_string()],
            ),
            (
                "R20N".to_string(),
                vec!["N".to_string(), "Q".to_string(), "R".to_string()],
            ),
        ]),
        route_id_to_name: ["L", "4", "5", "6", "6X", "N", "Q", "R"]
            .iter()
            .map(|r| (r.to_string(), r.to_string()))
            .collect(),
        parent_stations: vec![
            None,
            Some("L08".to_string()),
            None,
            Some("635".to_string()),
            Some("635".to_string()),
        ],
    }
}

pub fn sample_regions() -> Vec<NeighborhoodRegion> {
    vec![
        NeighborhoodRegion {
            name: "Williamsburg".to_string(),
            latitude: 40.7140,
            longitude: -73.9610,
            radius_m: 1_500.0,
        },
        NeighborhoodRegion {
            name: "Manhattan Community Board 3".to_string(),
            latitude: 40.7265,
            longitude: -73.9815,
            radius_m: 1_500.0,
        },
    ]
}

/// Write `value` as JSON to a unique file under the system temp directory
pub fn write_temp_json(prefix: &str, value: &impl serde::Serialize) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}.json", prefix, uuid::Uuid::new_v4()));
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}
