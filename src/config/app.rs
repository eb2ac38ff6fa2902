//! Main application configuration
//!
//! This module defines the primary configuration structures for the cafe-hop
//! service, including environment variable and TOML loading and validation.

use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub geo: GeoSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP server binds to
    pub http_host: String,
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Origin allowed to call the upload endpoint from a browser
    pub allowed_origin: String,
}

/// Geolocation data sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Precomputed GTFS JSON for subway lookups
    pub gtfs_path: Option<PathBuf>,
    /// JSON list of neighborhood regions
    pub neighborhoods_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "cafe-hop".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
            allowed_origin: "*".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(host) = lookup("HTTP_HOST") {
            config.service.http_host = host;
        }
        if let Some(port) = lookup("HTTP_PORT") {
            config.service.http_port = parse_var("HTTP_PORT", &port)?;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(origin) = lookup("ALLOWED_ORIGIN") {
            config.service.allowed_origin = origin;
        }

        // Rating settings
        if let Some(rating) = lookup("DEFAULT_RATING") {
            config.rating.default_rating = parse_var("DEFAULT_RATING", &rating)?;
        }
        if let Some(size) = lookup("ELO_SAMPLE_SIZE") {
            config.rating.sample_size = parse_var("ELO_SAMPLE_SIZE", &size)?;
        }
        if let Some(k) = lookup("ELO_K_NEW") {
            config.rating.elo.k_new = parse_var("ELO_K_NEW", &k)?;
        }
        if let Some(k) = lookup("ELO_K_EXISTING_FIRST_TIME") {
            config.rating.elo.k_existing_first_time = parse_var("ELO_K_EXISTING_FIRST_TIME", &k)?;
        }
        if let Some(k) = lookup("ELO_K_EXISTING_VETERAN") {
            config.rating.elo.k_existing_veteran = parse_var("ELO_K_EXISTING_VETERAN", &k)?;
        }
        if let Some(cap) = lookup("ELO_MAX_EXISTING_DELTA") {
            config.rating.elo.max_existing_delta = parse_var("ELO_MAX_EXISTING_DELTA", &cap)?;
        }

        // Geo settings
        if let Some(path) = lookup("GTFS_PATH") {
            config.geo.gtfs_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("NEIGHBORHOODS_PATH") {
            config.geo.neighborhoods_path = Some(PathBuf::from(path));
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.allowed_origin.is_empty() {
        return Err(anyhow!("Allowed origin cannot be empty"));
    }

    config.rating.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HTTP_PORT", "9000"),
            ("ALLOWED_ORIGIN", "https://example.github.io"),
            ("ELO_K_NEW", "40"),
            ("ELO_SAMPLE_SIZE", "3"),
            ("GTFS_PATH", "/data/gtfs_precomputed.json"),
        ]))
        .unwrap();

        assert_eq!(config.service.http_port, 9000);
        assert_eq!(config.service.allowed_origin, "https://example.github.io");
        assert_eq!(config.rating.elo.k_new, 40.0);
        assert_eq!(config.rating.sample_size, 3);
        assert_eq!(
            config.geo.gtfs_path,
            Some(PathBuf::from("/data/gtfs_precomputed.json"))
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("HTTP_PORT", "eighty")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LOG_LEVEL", "loud")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("ELO_MAX_EXISTING_DELTA", "-1")])).is_err());
    }

    #[test]
    fn test_toml_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [service]
            http_port = 3000
            log_level = "debug"

            [rating.display]
            rating_floor = 1200.0
            "#,
        )
        .unwrap();

        assert_eq!(config.service.http_port, 3000);
        assert_eq!(config.service.name, "cafe-hop");
        assert_eq!(config.rating.display.rating_floor, 1200.0);
        assert_eq!(config.rating.display.rating_ceiling, 1700.0);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AppConfig::from_file("/nonexistent/cafe-hop.toml").is_err());
    }
}
