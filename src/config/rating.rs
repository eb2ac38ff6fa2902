//! Rating system configuration

use crate::rating::{DisplayScale, EloConfig};
use crate::types::DEFAULT_RATING;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Rating settings for new uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Seed rating for a new cafe and the fallback when rating fails
    pub default_rating: f64,
    /// How many rated cafes to compare against when none are given
    pub sample_size: usize,
    pub elo: EloConfig,
    pub display: DisplayScale,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            default_rating: DEFAULT_RATING,
            sample_size: 5,
            elo: EloConfig::default(),
            display: DisplayScale::default(),
        }
    }
}

impl RatingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.default_rating.is_finite() {
            return Err(anyhow!("Default rating must be finite"));
        }
        self.elo.validate()?;
        self.display.validate()?;
        Ok(())
    }
}
