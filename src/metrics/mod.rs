//! Metrics and monitoring for the cafe-hop service
//!
//! Prometheus collectors plus text encoding for the `/metrics` endpoint.

pub mod collector;

pub use collector::{CatalogMetrics, MetricsCollector, RatingMetrics, UploadMetrics};

use anyhow::Result;
use prometheus::{Encoder, TextEncoder};

/// Encode every metric in the collector's registry in Prometheus text format
pub fn encode_metrics(collector: &MetricsCollector) -> Result<(String, String)> {
    let metric_families = collector.registry().gather();
    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&metric_families)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;

    Ok((encoder.format_type().to_string(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_rating_fallback();

        let (content_type, body) = encode_metrics(&collector).unwrap();
        assert!(content_type.contains("text/plain"));
        assert!(body.contains("cafe_hop_rating_fallbacks_total 1"));
    }
}
