//! Metrics collection using Prometheus
//!
//! Upload, rating and catalog metrics for the cafe-hop service.

use crate::types::ComparisonSource;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the cafe-hop service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Upload request metrics
    upload_metrics: UploadMetrics,

    /// Rating engine metrics
    rating_metrics: RatingMetrics,

    /// Catalog size metrics
    catalog_metrics: CatalogMetrics,
}

/// Upload request metrics
#[derive(Clone)]
pub struct UploadMetrics {
    /// Upload requests by outcome (accepted, rejected, failed)
    pub uploads_total: IntCounterVec,

    /// End-to-end upload handling time
    pub upload_duration: Histogram,
}

/// Rating engine metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Rating batches by comparison source
    pub rating_batches_total: IntCounterVec,

    /// Uploads that fell back to the default rating
    pub rating_fallbacks_total: IntCounter,

    /// Clamped rating change applied to each opponent
    pub opponent_delta: Histogram,

    /// Rating calculation time
    pub rating_calculation_duration: Histogram,
}

/// Catalog metrics
#[derive(Clone)]
pub struct CatalogMetrics {
    /// Number of cafes in the catalog
    pub catalog_entries: IntGauge,

    /// Number of cafes with an Elo rating
    pub rated_entries: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let upload_metrics = UploadMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let catalog_metrics = CatalogMetrics::new(&registry)?;

        Ok(Self {
            registry,
            upload_metrics,
            rating_metrics,
            catalog_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn upload(&self) -> &UploadMetrics {
        &self.upload_metrics
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn catalog(&self) -> &CatalogMetrics {
        &self.catalog_metrics
    }

    /// Record a finished upload request
    pub fn record_upload(&self, status: &str, duration: Duration) {
        self.upload_metrics
            .uploads_total
            .with_label_values(&[status])
            .inc();

        self.upload_metrics
            .upload_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a rating batch and the opponent deltas it produced
    pub fn record_rating_batch(
        &self,
        source: ComparisonSource,
        opponent_deltas: impl IntoIterator<Item = f64>,
        duration: Duration,
    ) {
        self.rating_metrics
            .rating_batches_total
            .with_label_values(&[source.as_str()])
            .inc();

        for delta in opponent_deltas {
            self.rating_metrics.opponent_delta.observe(delta);
        }

        self.rating_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an upload that kept the default rating because rating failed
    pub fn record_rating_fallback(&self) {
        self.rating_metrics.rating_fallbacks_total.inc();
    }

    /// Update catalog gauges
    pub fn update_catalog_size(&self, total: usize, rated: usize) {
        self.catalog_metrics.catalog_entries.set(total as i64);
        self.catalog_metrics.rated_entries.set(rated as i64);
    }
}

impl UploadMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uploads_total = IntCounterVec::new(
            Opts::new("cafe_hop_uploads_total", "Total upload requests"),
            &["status"],
        )?;
        registry.register(Box::new(uploads_total.clone()))?;

        let upload_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cafe_hop_upload_duration_seconds",
                "Upload handling time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(upload_duration.clone()))?;

        Ok(Self {
            uploads_total,
            upload_duration,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_batches_total = IntCounterVec::new(
            Opts::new("cafe_hop_rating_batches_total", "Total rating batches"),
            &["source"],
        )?;
        registry.register(Box::new(rating_batches_total.clone()))?;

        let rating_fallbacks_total = IntCounter::new(
            "cafe_hop_rating_fallbacks_total",
            "Uploads that kept the default rating after a rating failure",
        )?;
        registry.register(Box::new(rating_fallbacks_total.clone()))?;

        let opponent_delta = Histogram::with_opts(
            HistogramOpts::new(
                "cafe_hop_opponent_rating_delta",
                "Rating change applied to existing cafes",
            )
            .buckets(vec![-5.0, -3.0, -1.0, -0.1, 0.1, 1.0, 3.0, 5.0]),
        )?;
        registry.register(Box::new(opponent_delta.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cafe_hop_rating_calculation_duration_seconds",
                "Rating calculation time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        Ok(Self {
            rating_batches_total,
            rating_fallbacks_total,
            opponent_delta,
            rating_calculation_duration,
        })
    }
}

impl CatalogMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let catalog_entries =
            IntGauge::new("cafe_hop_catalog_entries", "Cafes in the catalog")?;
        registry.register(Box::new(catalog_entries.clone()))?;

        let rated_entries =
            IntGauge::new("cafe_hop_rated_entries", "Cafes with an Elo rating")?;
        registry.register(Box::new(rated_entries.clone()))?;

        Ok(Self {
            catalog_entries,
            rated_entries,
        })
    }
}
