//! Common types used throughout the cafe-hop service

use crate::error::CafeHopError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Unique identifier for a cafe in the catalog (its object key)
pub type CafeId = String;

/// Seed rating for a cafe with no rating history
pub const DEFAULT_RATING: f64 = 1500.0;

/// One pairwise judgment between the new cafe and an existing one.
///
/// `outcome` is from the new cafe's point of view: 1.0 means the new cafe was
/// preferred, 0.0 means the opponent was preferred and 0.5 is a tie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub opponent_id: CafeId,
    pub outcome: f64,
}

impl Comparison {
    pub fn new(opponent_id: impl Into<CafeId>, outcome: f64) -> Self {
        Self {
            opponent_id: opponent_id.into(),
            outcome,
        }
    }
}

/// Canonical pairwise outcome accepted at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOutcome {
    /// The new cafe was preferred
    Win,
    Tie,
    /// The existing cafe was preferred
    Loss,
}

impl ComparisonOutcome {
    /// Score from the new cafe's point of view
    pub fn score(self) -> f64 {
        match self {
            ComparisonOutcome::Win => 1.0,
            ComparisonOutcome::Tie => 0.5,
            ComparisonOutcome::Loss => 0.0,
        }
    }
}

impl TryFrom<f64> for ComparisonOutcome {
    type Error = CafeHopError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == 1.0 {
            Ok(ComparisonOutcome::Win)
        } else if value == 0.5 {
            Ok(ComparisonOutcome::Tie)
        } else if value == 0.0 {
            Ok(ComparisonOutcome::Loss)
        } else {
            Err(CafeHopError::InvalidOutcome { value })
        }
    }
}

impl std::fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOutcome::Win => write!(f, "win"),
            ComparisonOutcome::Tie => write!(f, "tie"),
            ComparisonOutcome::Loss => write!(f, "loss"),
        }
    }
}

/// Result of one batch update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    /// The new cafe's rating after the batch
    pub new_rating: f64,
    /// Updated ratings for every opponent referenced by the batch
    pub updated_opponents: HashMap<CafeId, f64>,
}

/// Where the comparisons of a rating event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSource {
    /// Supplied by the uploader
    Explicit,
    /// Neutral outcomes against randomly sampled cafes
    Sampled,
    /// No comparisons were possible (empty catalog)
    None,
}

impl ComparisonSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonSource::Explicit => "explicit",
            ComparisonSource::Sampled => "sampled",
            ComparisonSource::None => "none",
        }
    }
}

/// Nearest transit station to a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStation {
    pub station: String,
    pub distance_m: f64,
    /// Route names serving the station, lowercased and sorted
    pub lines: Vec<String>,
}

impl NearestStation {
    /// Distance formatted the way it is stored in metadata, e.g. `123.4m`
    pub fn distance_label(&self) -> String {
        format!("{:.1}m", self.distance_m)
    }

    /// Comma separated route names
    pub fn lines_label(&self) -> String {
        self.lines.join(",")
    }
}

/// String metadata stored alongside an uploaded cafe
pub type CafeMetadata = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parsing() {
        assert_eq!(ComparisonOutcome::try_from(1.0), Ok(ComparisonOutcome::Win));
        assert_eq!(ComparisonOutcome::try_from(0.5), Ok(ComparisonOutcome::Tie));
        assert_eq!(ComparisonOutcome::try_from(0.0), Ok(ComparisonOutcome::Loss));
        assert_eq!(
            ComparisonOutcome::try_from(0.75),
            Err(CafeHopError::InvalidOutcome { value: 0.75 })
        );
        assert!(ComparisonOutcome::try_from(-1.0).is_err());
        assert!(ComparisonOutcome::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_outcome_score() {
        for outcome in [
            ComparisonOutcome::Win,
            ComparisonOutcome::Tie,
            ComparisonOutcome::Loss,
        ] {
            assert_eq!(ComparisonOutcome::try_from(outcome.score()), Ok(outcome));
        }
    }

    #[test]
    fn test_nearest_station_labels() {
        let station = NearestStation {
            station: "Bedford Av".to_string(),
            distance_m: 123.456,
            lines: vec!["l".to_string()],
        };
        assert_eq!(station.distance_label(), "123.5m");
        assert_eq!(station.lines_label(), "l");
    }
}
