//! Upload processing
//!
//! An upload is validated, enriched with location details, rated against
//! existing cafes and written to the catalog together with every opponent
//! whose rating changed. Catalog reads and writes for one upload happen under
//! a single commit lock so concurrent uploads never interleave their
//! read-modify-write cycles.

use crate::config::RatingConfig;
use crate::error::{is_client_error, CafeHopError, Result};
use crate::geo::{NeighborhoodResolver, TransitIndex};
use crate::metrics::MetricsCollector;
use crate::rating::{CatalogEntry, CatalogStore, RatingEngine};
use crate::types::{
    BatchUpdate, CafeId, CafeMetadata, Comparison, ComparisonOutcome, ComparisonSource,
};
use crate::upload::receipt::{CafeSummary, UploadReceipt};
use crate::upload::request::{GeoOverrides, UploadRequest, ValidatedUpload};
use crate::utils::{generate_upload_id, object_key};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const CAFE_NAME_KEY: &str = "cafe-name";
pub const NOTES_KEY: &str = "notes";
pub const RATING_KEY: &str = "rating";
pub const LATITUDE_KEY: &str = "latitude";
pub const LONGITUDE_KEY: &str = "longitude";
pub const NEIGHBORHOOD_KEY: &str = "neighborhood";
pub const SUBWAY_STATION_KEY: &str = "closest_subway_station";
pub const SUBWAY_LINES_KEY: &str = "closest_subway_lines";
pub const ELO_RATING_KEY: &str = "elo_rating";
pub const ELO_STAR_RATING_KEY: &str = "elo_star_rating";

/// Location details attached to an upload; empty strings when unknown
#[derive(Debug, Clone, Default, PartialEq)]
struct GeoDetails {
    neighborhood: String,
    closest_subway_station: String,
    closest_subway_lines: String,
}

/// Comparisons chosen for one upload plus a snapshot of their opponents
struct RatingBatch {
    source: ComparisonSource,
    comparisons: Vec<Comparison>,
    opponents: HashMap<CafeId, CatalogEntry>,
}

struct RatingOutcome {
    update: BatchUpdate,
    fallback: bool,
}

/// Handles uploads against a catalog and a rating engine
pub struct UploadService {
    catalog: Arc<dyn CatalogStore>,
    engine: Arc<dyn RatingEngine>,
    transit: Option<Arc<TransitIndex>>,
    resolver: Option<Arc<dyn NeighborhoodResolver>>,
    settings: RatingConfig,
    metrics: Option<Arc<MetricsCollector>>,
    /// Commit lock; also owns the RNG used for opponent sampling
    commit: Mutex<StdRng>,
}

impl UploadService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        engine: Arc<dyn RatingEngine>,
        settings: RatingConfig,
    ) -> Self {
        Self {
            catalog,
            engine,
            transit: None,
            resolver: None,
            settings,
            metrics: None,
            commit: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_transit(mut self, transit: Arc<TransitIndex>) -> Self {
        self.transit = Some(transit);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NeighborhoodResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Use a deterministic RNG for opponent sampling
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.commit = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn catalog(&self) -> Arc<dyn CatalogStore> {
        self.catalog.clone()
    }

    pub fn settings(&self) -> &RatingConfig {
        &self.settings
    }

    pub fn has_transit(&self) -> bool {
        self.transit.is_some()
    }

    /// Process one upload end to end
    pub async fn handle_upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let start_time = Instant::now();
        let result = self.process_upload(request).await;

        let status = match &result {
            Ok(_) => "accepted",
            Err(e) if is_client_error(e) => "rejected",
            Err(_) => "failed",
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_upload(status, start_time.elapsed());
        }
        if let Err(e) = &result {
            warn!("Upload {} - error: {}", status, e);
        }

        result
    }

    /// Catalog entries ordered by rating, best first
    pub fn ranked_cafes(&self, limit: Option<usize>) -> Result<Vec<CafeSummary>> {
        Ok(self
            .catalog
            .ranked_entries(limit)?
            .into_iter()
            .map(|entry| CafeSummary::from_entry(entry, &self.settings.display))
            .collect())
    }

    pub fn get_cafe(&self, cafe_id: &CafeId) -> Result<CafeSummary> {
        let entry = self
            .catalog
            .get_entry(cafe_id)?
            .ok_or_else(|| CafeHopError::CafeNotFound {
                cafe_id: cafe_id.clone(),
            })?;
        Ok(CafeSummary::from_entry(entry, &self.settings.display))
    }

    async fn process_upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let upload = request.validate()?;
        let cafe_id = object_key(&upload.cafe_name, upload.star_rating);

        if upload.comparisons.iter().any(|(id, _)| *id == cafe_id) {
            return Err(CafeHopError::InvalidUploadRequest {
                reason: format!("Cafe {} cannot be compared with itself", cafe_id),
            }
            .into());
        }

        let geo = self
            .enrich_location(upload.coordinates, &upload.overrides)
            .await;

        let mut rng = self.commit.lock().await;

        let batch = self.select_batch(&cafe_id, &upload, &mut *rng)?;
        let outcome = self.rate(&cafe_id, &batch);
        let new_rating = outcome.update.new_rating;
        let elo_star_rating = self.settings.display.project(new_rating);
        let metadata = build_metadata(&upload, &geo, new_rating, elo_star_rating);

        let entries = self.build_entries(&cafe_id, &upload, &batch, &outcome, metadata.clone())?;
        self.catalog.store_entries(entries)?;
        drop(rng);

        self.update_catalog_gauges();

        info!(
            "Stored upload {} - source: {}, comparisons: {}, elo: {:.2}, stars: {:.1}, fallback: {}",
            cafe_id,
            batch.source.as_str(),
            batch.comparisons.len(),
            new_rating,
            elo_star_rating,
            outcome.fallback
        );

        Ok(UploadReceipt {
            upload_id: generate_upload_id(),
            object_key: cafe_id.clone(),
            cafe_id,
            content_type: upload.content_type,
            elo_rating: new_rating,
            elo_star_rating,
            comparison_source: batch.source,
            fallback: outcome.fallback,
            updated_opponents: outcome.update.updated_opponents,
            metadata,
        })
    }

    /// Nearest station and neighborhood; lookup failures are never fatal
    async fn enrich_location(
        &self,
        coordinates: Option<(f64, f64)>,
        overrides: &GeoOverrides,
    ) -> GeoDetails {
        let mut details = GeoDetails::default();

        if let Some((latitude, longitude)) = coordinates {
            if let Some(transit) = &self.transit {
                match transit.nearest_station(latitude, longitude) {
                    Some(station) => {
                        debug!(
                            "Nearest station to ({}, {}): {} at {} [{}]",
                            latitude,
                            longitude,
                            station.station,
                            station.distance_label(),
                            station.lines_label()
                        );
                        details.closest_subway_lines = station.lines_label();
                        details.closest_subway_station = station.station;
                    }
                    None => debug!("No transit stop near ({}, {})", latitude, longitude),
                }
            }

            if let Some(resolver) = &self.resolver {
                match resolver.resolve(latitude, longitude).await {
                    Ok(Some(neighborhood)) => details.neighborhood = neighborhood,
                    Ok(None) => debug!("No neighborhood for ({}, {})", latitude, longitude),
                    Err(e) => warn!(
                        "Neighborhood lookup failed for ({}, {}): {}",
                        latitude, longitude, e
                    ),
                }
            }
        }

        if let Some(neighborhood) = &overrides.neighborhood {
            details.neighborhood = neighborhood.clone();
        }
        if let Some(station) = &overrides.closest_subway_station {
            details.closest_subway_station = station.clone();
        }
        if let Some(lines) = &overrides.closest_subway_lines {
            details.closest_subway_lines = lines.clone();
        }

        details
    }

    /// Explicit comparisons when given, otherwise neutral comparisons against
    /// a random sample of rated cafes
    fn select_batch<R: Rng + ?Sized>(
        &self,
        cafe_id: &CafeId,
        upload: &ValidatedUpload,
        rng: &mut R,
    ) -> Result<RatingBatch> {
        if !upload.comparisons.is_empty() {
            let ids: Vec<CafeId> = upload.comparisons.iter().map(|(id, _)| id.clone()).collect();
            let opponents = self.catalog.get_entries(&ids)?;
            let comparisons = upload
                .comparisons
                .iter()
                .map(|(id, outcome)| Comparison::new(id.clone(), outcome.score()))
                .collect();

            return Ok(RatingBatch {
                source: ComparisonSource::Explicit,
                comparisons,
                opponents,
            });
        }

        let mut candidates: Vec<CatalogEntry> = self
            .catalog
            .rated_entries()?
            .into_iter()
            .filter(|entry| &entry.cafe_id != cafe_id)
            .collect();
        // Stable order so a seeded RNG picks the same opponents every run
        candidates.sort_by(|a, b| a.cafe_id.cmp(&b.cafe_id));

        let sampled: Vec<CatalogEntry> = candidates
            .choose_multiple(rng, self.settings.sample_size)
            .cloned()
            .collect();

        if sampled.is_empty() {
            return Ok(RatingBatch {
                source: ComparisonSource::None,
                comparisons: Vec::new(),
                opponents: HashMap::new(),
            });
        }

        let comparisons = sampled
            .iter()
            .map(|entry| Comparison::new(entry.cafe_id.clone(), ComparisonOutcome::Tie.score()))
            .collect();
        let opponents = sampled
            .into_iter()
            .map(|entry| (entry.cafe_id.clone(), entry))
            .collect();

        Ok(RatingBatch {
            source: ComparisonSource::Sampled,
            comparisons,
            opponents,
        })
    }

    /// Run the engine; any failure keeps the seed rating and touches no opponent
    fn rate(&self, cafe_id: &CafeId, batch: &RatingBatch) -> RatingOutcome {
        let initial_rating = self.engine.initial_rating();
        let existing_ratings: HashMap<CafeId, f64> = batch
            .opponents
            .iter()
            .filter_map(|(id, entry)| entry.elo_rating().map(|r| (id.clone(), r)))
            .collect();
        let existing_has_participated: HashMap<CafeId, bool> = batch
            .opponents
            .iter()
            .map(|(id, entry)| (id.clone(), entry.has_compared()))
            .collect();

        let start_time = Instant::now();
        match self.engine.apply_batch(
            initial_rating,
            &batch.comparisons,
            &existing_ratings,
            &existing_has_participated,
        ) {
            Ok(update) => {
                if let Some(metrics) = &self.metrics {
                    let deltas = update.updated_opponents.iter().map(|(id, rating)| {
                        rating - existing_ratings.get(id).copied().unwrap_or(*rating)
                    });
                    metrics.record_rating_batch(batch.source, deltas, start_time.elapsed());
                }
                RatingOutcome {
                    update,
                    fallback: false,
                }
            }
            Err(e) => {
                warn!(
                    "Rating failed for {} ({} comparisons), storing seed rating {}: {}",
                    cafe_id,
                    batch.comparisons.len(),
                    initial_rating,
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rating_fallback();
                }
                RatingOutcome {
                    update: BatchUpdate {
                        new_rating: initial_rating,
                        updated_opponents: HashMap::new(),
                    },
                    fallback: true,
                }
            }
        }
    }

    fn build_entries(
        &self,
        cafe_id: &CafeId,
        upload: &ValidatedUpload,
        batch: &RatingBatch,
        outcome: &RatingOutcome,
        metadata: CafeMetadata,
    ) -> Result<Vec<CatalogEntry>> {
        let explicit = batch.source == ComparisonSource::Explicit && !outcome.fallback;

        let mut entry = CatalogEntry::new(cafe_id.clone(), upload.cafe_name.clone());
        if let Some(existing) = self.catalog.get_entry(cafe_id)? {
            entry.created_at = existing.created_at;
        }
        let compared = if explicit {
            batch.comparisons.len() as u64
        } else {
            0
        };
        entry.record_rating(outcome.update.new_rating, compared);
        entry.metadata = metadata;

        let mut entries = vec![entry];
        for (id, rating) in &outcome.update.updated_opponents {
            let Some(mut opponent) = batch.opponents.get(id).cloned() else {
                continue;
            };
            let compared = if explicit {
                batch
                    .comparisons
                    .iter()
                    .filter(|c| &c.opponent_id == id)
                    .count() as u64
            } else {
                0
            };
            opponent.record_rating(*rating, compared);
            opponent
                .metadata
                .insert(ELO_RATING_KEY.to_string(), format!("{:.2}", rating));
            opponent.metadata.insert(
                ELO_STAR_RATING_KEY.to_string(),
                format!("{:.1}", self.settings.display.project(*rating)),
            );
            entries.push(opponent);
        }

        Ok(entries)
    }

    fn update_catalog_gauges(&self) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        match (self.catalog.entry_count(), self.catalog.rated_entries()) {
            (Ok(total), Ok(rated)) => metrics.update_catalog_size(total, rated.len()),
            (Err(e), _) | (_, Err(e)) => debug!("Skipping catalog gauges: {}", e),
        }
    }
}

fn build_metadata(
    upload: &ValidatedUpload,
    geo: &GeoDetails,
    elo_rating: f64,
    elo_star_rating: f64,
) -> CafeMetadata {
    let (latitude, longitude) = upload
        .coordinates
        .map(|(lat, lon)| (format!("{:?}", lat), format!("{:?}", lon)))
        .unwrap_or_default();

    CafeMetadata::from([
        (CAFE_NAME_KEY.to_string(), upload.cafe_name.clone()),
        (NOTES_KEY.to_string(), upload.notes.clone()),
        (
            RATING_KEY.to_string(),
            upload
                .star_rating
                .filter(|r| *r != 0.0)
                .map(|r| format!("{:?}", r))
                .unwrap_or_default(),
        ),
        (LATITUDE_KEY.to_string(), latitude),
        (LONGITUDE_KEY.to_string(), longitude),
        (NEIGHBORHOOD_KEY.to_string(), geo.neighborhood.clone()),
        (
            SUBWAY_STATION_KEY.to_string(),
            geo.closest_subway_station.clone(),
        ),
        (SUBWAY_LINES_KEY.to_string(), geo.closest_subway_lines.clone()),
        (ELO_RATING_KEY.to_string(), format!("{:.2}", elo_rating)),
        (ELO_STAR_RATING_KEY.to_string(), format!("{:.1}", elo_star_rating)),
    ])
}
