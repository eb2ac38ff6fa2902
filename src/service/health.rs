//! Health checks for the cafe-hop service
//!
//! The catalog must be readable for the service to be healthy; missing
//! transit data only degrades it.

use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl ComponentCheck {
    fn finish(
        name: &str,
        start: Instant,
        result: std::result::Result<(), (HealthStatus, String)>,
    ) -> Self {
        let (status, message) = match result {
            Ok(()) => (HealthStatus::Healthy, None),
            Err((status, message)) => (status, Some(message)),
        };
        Self {
            name: name.to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub catalog_entries: usize,
    pub rated_entries: usize,
    pub uptime_seconds: i64,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let checks = vec![
            Self::check_service_running(&app_state).await,
            Self::check_catalog(&app_state),
            Self::check_transit(&app_state),
        ];

        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Ok(HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(&app_state),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();
        let result = if app_state.is_running().await {
            Ok(())
        } else {
            Err((HealthStatus::Unhealthy, "Service is not running".to_string()))
        };
        ComponentCheck::finish("service_running", start, result)
    }

    fn check_catalog(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();
        let result = app_state
            .uploads()
            .catalog()
            .entry_count()
            .map(|_| ())
            .map_err(|e| {
                error!("Catalog health check failed: {}", e);
                (HealthStatus::Unhealthy, format!("Catalog unreadable: {}", e))
            });
        ComponentCheck::finish("catalog", start, result)
    }

    /// Uploads still succeed without transit data, only without subway details
    fn check_transit(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();
        let result = if app_state.uploads().has_transit() {
            Ok(())
        } else {
            Err((HealthStatus::Degraded, "No transit data loaded".to_string()))
        };
        ComponentCheck::finish("transit_index", start, result)
    }

    fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let catalog = app_state.uploads().catalog();
        ServiceStats {
            catalog_entries: catalog.entry_count().unwrap_or_default(),
            rated_entries: catalog.rated_entries().map(|e| e.len()).unwrap_or_default(),
            uptime_seconds: (chrono::Utc::now() - app_state.started_at()).num_seconds(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
