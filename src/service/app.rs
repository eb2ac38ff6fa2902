//! Main application state and service wiring
//!
//! This module builds the production AppState: the catalog, the rating
//! engine, optional geolocation data and the metrics collector, all shared by
//! the HTTP handlers.

use crate::config::AppConfig;
use crate::geo::{NeighborhoodResolver, StaticNeighborhoodResolver, TransitIndex};
use crate::metrics::MetricsCollector;
use crate::rating::{CatalogStore, EloRatingEngine, InMemoryCatalog};
use crate::upload::UploadService;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Upload pipeline over the catalog and rating engine
    uploads: Arc<UploadService>,

    /// Prometheus collectors
    metrics: Arc<MetricsCollector>,

    started_at: DateTime<Utc>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} service", config.service.name);

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let engine = EloRatingEngine::new(config.rating.elo.clone(), config.rating.default_rating)
            .map_err(|e| ServiceError::Configuration {
                message: format!("Invalid rating settings: {}", e),
            })?;

        let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalog::new());
        let mut uploads =
            UploadService::new(catalog, Arc::new(engine), config.rating.clone())
                .with_metrics(metrics.clone());

        if let Some(transit) = Self::load_transit(&config) {
            uploads = uploads.with_transit(transit);
        }
        if let Some(resolver) = Self::load_resolver(&config) {
            uploads = uploads.with_resolver(resolver);
        }

        Ok(Self::from_parts(config, uploads, metrics))
    }

    /// Assemble state from prebuilt components
    pub fn from_parts(
        config: AppConfig,
        uploads: UploadService,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            uploads: Arc::new(uploads),
            metrics,
            started_at: Utc::now(),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Mark the service as accepting requests
    pub async fn start(&self) {
        *self.is_running.write().await = true;
        info!("✅ {} service started", self.config.service.name);
    }

    /// Mark the service as stopped and log final catalog size
    pub async fn shutdown(&self) {
        *self.is_running.write().await = false;

        match self.uploads.catalog().entry_count() {
            Ok(count) => info!("Final catalog size: {} cafes", count),
            Err(e) => warn!("Failed to read final catalog size: {}", e),
        }
        info!("✅ {} service shutdown completed", self.config.service.name);
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn uploads(&self) -> Arc<UploadService> {
        self.uploads.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Missing or broken transit data only disables subway lookups
    fn load_transit(config: &AppConfig) -> Option<Arc<TransitIndex>> {
        let path = config.geo.gtfs_path.as_ref()?;
        match TransitIndex::load(path) {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                warn!(
                    "Transit data unavailable ({}), subway lookups disabled: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    fn load_resolver(config: &AppConfig) -> Option<Arc<dyn NeighborhoodResolver>> {
        let path = config.geo.neighborhoods_path.as_ref()?;
        match StaticNeighborhoodResolver::load(path) {
            Ok(resolver) => {
                info!(
                    "Loaded {} neighborhood regions from {}",
                    resolver.region_count(),
                    path.display()
                );
                Some(Arc::new(resolver))
            }
            Err(e) => {
                warn!(
                    "Neighborhood data unavailable ({}), lookups disabled: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}
