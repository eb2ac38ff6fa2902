//! Projection of Elo ratings onto the star scale shown to users

use crate::error::{CafeHopError, Result};
use serde::{Deserialize, Serialize};

/// Linear rating band mapped onto `1..=scale_max` stars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayScale {
    /// Rating shown as one star
    pub rating_floor: f64,
    /// Rating shown as `scale_max` stars
    pub rating_ceiling: f64,
    pub scale_max: f64,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self {
            rating_floor: 1300.0,
            rating_ceiling: 1700.0,
            scale_max: 5.0,
        }
    }
}

impl DisplayScale {
    pub fn validate(&self) -> Result<()> {
        if !(self.rating_floor.is_finite() && self.rating_ceiling.is_finite()) {
            return Err(CafeHopError::ConfigurationError {
                message: "Display scale bounds must be finite".to_string(),
            }
            .into());
        }

        if self.rating_ceiling <= self.rating_floor {
            return Err(CafeHopError::ConfigurationError {
                message: format!(
                    "Display ceiling {} must be above floor {}",
                    self.rating_ceiling, self.rating_floor
                ),
            }
            .into());
        }

        if !self.scale_max.is_finite() || self.scale_max < 1.0 {
            return Err(CafeHopError::ConfigurationError {
                message: format!("Display scale max must be at least 1, got {}", self.scale_max),
            }
            .into());
        }

        Ok(())
    }

    /// Stars for `rating`, see [`rating_to_display_scale`]
    pub fn project(&self, rating: f64) -> f64 {
        rating_to_display_scale(rating, self.rating_floor, self.rating_ceiling, self.scale_max)
    }
}

/// Map a rating to the star scale, rounded to the nearest half star.
///
/// The result is deliberately not clamped: ratings outside
/// `[rating_floor, rating_ceiling]` land outside `[1, scale_max]`. Ties in the
/// doubled value round to even.
pub fn rating_to_display_scale(
    rating: f64,
    rating_floor: f64,
    rating_ceiling: f64,
    scale_max: f64,
) -> f64 {
    let raw = 1.0 + (rating - rating_floor) / (rating_ceiling - rating_floor) * (scale_max - 1.0);
    round_to_half(raw)
}

fn round_to_half(raw: f64) -> f64 {
    (raw * 2.0).round_ties_even() / 2.0
}
