//! Batched Elo update for a newly added cafe
//!
//! A new cafe is rated once, at upload time, from a batch of pairwise
//! comparisons against cafes already in the catalog. Every expectation in the
//! batch is computed against the new cafe's pre-batch rating, so the result
//! does not depend on the order of the comparisons.

use crate::error::{CafeHopError, Result};
use crate::rating::calculator::RatingEngine;
use crate::types::{BatchUpdate, CafeId, Comparison, DEFAULT_RATING};
use serde::{Deserialize, Serialize};
use skillratings::elo::EloRating;
use std::collections::HashMap;
use tracing::debug;

/// Learning rates and safety cap for the batched update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Learning rate for the new cafe
    pub k_new: f64,
    /// Learning rate for an opponent that has never been compared before
    pub k_existing_first_time: f64,
    /// Learning rate for an opponent with comparison history
    pub k_existing_veteran: f64,
    /// Absolute cap on the total change applied to one opponent per batch
    pub max_existing_delta: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_new: 32.0,
            k_existing_first_time: 6.0,
            k_existing_veteran: 10.0,
            max_existing_delta: 5.0,
        }
    }
}

impl EloConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("k_new", self.k_new),
            ("k_existing_first_time", self.k_existing_first_time),
            ("k_existing_veteran", self.k_existing_veteran),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(CafeHopError::ConfigurationError {
                    message: format!("{} must be a non-negative number, got {}", name, value),
                }
                .into());
            }
        }

        if !self.max_existing_delta.is_finite() || self.max_existing_delta < 0.0 {
            return Err(CafeHopError::ConfigurationError {
                message: format!(
                    "max_existing_delta must be a non-negative number, got {}",
                    self.max_existing_delta
                ),
            }
            .into());
        }

        Ok(())
    }

    /// Learning rate for an opponent given its participation flag
    pub fn opponent_k(&self, has_participated: bool) -> f64 {
        if has_participated {
            self.k_existing_veteran
        } else {
            self.k_existing_first_time
        }
    }
}

/// Logistic Elo expectation that `rating` beats `opponent_rating`
pub fn expected_score(rating: f64, opponent_rating: f64) -> f64 {
    let (expected, _) = skillratings::elo::expected_score(
        &EloRating { rating },
        &EloRating {
            rating: opponent_rating,
        },
    );
    expected
}

/// Apply one batch of comparisons for a new cafe.
///
/// Returns the new cafe's rating and the updated rating of every opponent the
/// batch references. Opponent deltas are summed per opponent and then clamped
/// to `config.max_existing_delta`; the new cafe's delta is never clamped.
///
/// Fails with [`CafeHopError::ConfigurationError`] if `config` does not
/// validate, and with [`CafeHopError::MissingOpponent`] if a comparison names
/// a cafe that is not in `existing_ratings`. Both are checked before any work
/// is done. Outcomes are applied as given; validating them is the caller's
/// job.
pub fn apply_batch_update(
    initial_rating: f64,
    comparisons: &[Comparison],
    existing_ratings: &HashMap<CafeId, f64>,
    existing_has_participated: &HashMap<CafeId, bool>,
    config: &EloConfig,
) -> Result<BatchUpdate> {
    config.validate()?;

    if let Some(missing) = comparisons
        .iter()
        .find(|c| !existing_ratings.contains_key(&c.opponent_id))
    {
        return Err(CafeHopError::MissingOpponent {
            opponent_id: missing.opponent_id.clone(),
        }
        .into());
    }

    let mut delta_new = 0.0;
    let mut delta_existing: HashMap<CafeId, f64> = HashMap::new();

    for comparison in comparisons {
        let opponent_rating = existing_ratings[&comparison.opponent_id];
        let expected = expected_score(initial_rating, opponent_rating);

        delta_new += config.k_new * (comparison.outcome - expected);

        let has_participated = existing_has_participated
            .get(&comparison.opponent_id)
            .copied()
            .unwrap_or(false);
        let k_opponent = config.opponent_k(has_participated);

        // The opponent's result mirrors the new cafe's.
        *delta_existing
            .entry(comparison.opponent_id.clone())
            .or_insert(0.0) += k_opponent * ((1.0 - comparison.outcome) - (1.0 - expected));
    }

    let cap = config.max_existing_delta;
    let updated_opponents = delta_existing
        .into_iter()
        .map(|(opponent_id, delta)| {
            let rating = existing_ratings[&opponent_id] + delta.clamp(-cap, cap);
            (opponent_id, rating)
        })
        .collect();

    debug!(
        comparisons = comparisons.len(),
        delta_new, "Applied batch rating update"
    );

    Ok(BatchUpdate {
        new_rating: initial_rating + delta_new,
        updated_opponents,
    })
}

/// Rating engine backed by the batched Elo update
#[derive(Debug, Clone)]
pub struct EloRatingEngine {
    config: EloConfig,
    initial_rating: f64,
}

impl EloRatingEngine {
    /// Create a new engine, rejecting invalid tunables
    pub fn new(config: EloConfig, initial_rating: f64) -> Result<Self> {
        config.validate()?;
        validate_initial_rating(initial_rating)?;

        Ok(Self {
            config,
            initial_rating,
        })
    }
}

impl Default for EloRatingEngine {
    fn default() -> Self {
        Self {
            config: EloConfig::default(),
            initial_rating: DEFAULT_RATING,
        }
    }
}

fn validate_initial_rating(initial_rating: f64) -> Result<()> {
    if !initial_rating.is_finite() {
        return Err(CafeHopError::ConfigurationError {
            message: format!("Initial rating must be finite, got {}", initial_rating),
        }
        .into());
    }
    Ok(())
}

impl RatingEngine for EloRatingEngine {
    fn apply_batch(
        &self,
        initial_rating: f64,
        comparisons: &[Comparison],
        existing_ratings: &HashMap<CafeId, f64>,
        existing_has_participated: &HashMap<CafeId, bool>,
    ) -> Result<BatchUpdate> {
        apply_batch_update(
            initial_rating,
            comparisons,
            existing_ratings,
            existing_has_participated,
            &self.config,
        )
    }

    fn initial_rating(&self) -> f64 {
        self.initial_rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(entries: &[(&str, f64)]) -> HashMap<CafeId, f64> {
        entries
            .iter()
            .map(|(id, rating)| (id.to_string(), *rating))
            .collect()
    }

    fn flags(entries: &[(&str, bool)]) -> HashMap<CafeId, bool> {
        entries
            .iter()
            .map(|(id, flag)| (id.to_string(), *flag))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = EloConfig::default();
        assert_eq!(config.k_new, 32.0);
        assert_eq!(config.k_existing_first_time, 6.0);
        assert_eq!(config.k_existing_veteran, 10.0);
        assert_eq!(config.max_existing_delta, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EloConfig::default();
        config.k_new = -1.0;
        assert!(config.validate().is_err());

        config = EloConfig::default();
        config.k_existing_veteran = f64::NAN;
        assert!(config.validate().is_err());

        config = EloConfig::default();
        config.max_existing_delta = -0.5;
        assert!(config.validate().is_err());

        config = EloConfig::default();
        config.max_existing_delta = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expected_score() {
        assert_eq!(expected_score(1500.0, 1500.0), 0.5);
        assert!(expected_score(1700.0, 1300.0) > 0.9);
        assert!(expected_score(1300.0, 1700.0) < 0.1);

        let forward = expected_score(1550.0, 1480.0);
        let backward = expected_score(1480.0, 1550.0);
        assert!((forward + backward - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_is_identity() {
        let result = apply_batch_update(
            1523.0,
            &[],
            &HashMap::new(),
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        assert_eq!(result.new_rating, 1523.0);
        assert!(result.updated_opponents.is_empty());
    }

    #[test]
    fn test_single_fair_win() {
        let existing = ratings(&[("Devoción", 1500.0)]);
        let comparisons = vec![Comparison::new("Devoción", 1.0)];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        assert_eq!(result.new_rating, 1516.0);
        assert_eq!(result.updated_opponents["Devoción"], 1497.0);
    }

    #[test]
    fn test_veteran_and_first_time_rates() {
        let existing = ratings(&[("veteran", 1500.0), ("rookie", 1500.0)]);
        let participation = flags(&[("veteran", true), ("rookie", false)]);
        let comparisons = vec![
            Comparison::new("veteran", 1.0),
            Comparison::new("rookie", 1.0),
        ];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &participation,
            &EloConfig::default(),
        )
        .unwrap();

        assert_eq!(result.updated_opponents["veteran"], 1495.0);
        assert_eq!(result.updated_opponents["rookie"], 1497.0);
        assert_eq!(result.new_rating, 1532.0);
    }

    #[test]
    fn test_missing_participation_defaults_to_first_time() {
        let existing = ratings(&[("unknown_history", 1500.0)]);
        let comparisons = vec![Comparison::new("unknown_history", 0.0)];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        assert_eq!(result.updated_opponents["unknown_history"], 1503.0);
        assert_eq!(result.new_rating, 1484.0);
    }

    #[test]
    fn test_accumulation_before_cap() {
        let existing = ratings(&[("Abraço", 1500.0)]);
        let comparisons = vec![
            Comparison::new("Abraço", 1.0),
            Comparison::new("Abraço", 0.5),
        ];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        // -3.0 from the win plus 0.0 from the tie
        assert_eq!(result.updated_opponents["Abraço"], 1497.0);
        assert_eq!(result.new_rating, 1516.0);
    }

    #[test]
    fn test_cap_applies_to_sum_not_each_comparison() {
        let existing = ratings(&[("Sey", 1500.0)]);
        let comparisons: Vec<_> = (0..3).map(|_| Comparison::new("Sey", 1.0)).collect();

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        // Each win is worth -3.0, under the cap alone; the -9.0 total is capped.
        assert_eq!(result.updated_opponents["Sey"], 1495.0);
        // The new cafe keeps all three contributions.
        assert_eq!(result.new_rating, 1548.0);
    }

    #[test]
    fn test_missing_opponent_fails_without_partial_output() {
        let existing = ratings(&[("known", 1500.0)]);
        let comparisons = vec![
            Comparison::new("known", 1.0),
            Comparison::new("ghost", 1.0),
        ];

        let err = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<CafeHopError>(),
            Some(&CafeHopError::MissingOpponent {
                opponent_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn test_untouched_cafes_are_omitted() {
        let existing = ratings(&[("a", 1520.0), ("b", 1480.0), ("c", 1610.0)]);
        let comparisons = vec![Comparison::new("b", 0.5)];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        assert_eq!(result.updated_opponents.len(), 1);
        assert!(result.updated_opponents.contains_key("b"));
    }

    #[test]
    fn test_batch_uses_pre_batch_rating() {
        let existing = ratings(&[("a", 1500.0), ("b", 1500.0)]);
        let comparisons = vec![Comparison::new("a", 1.0), Comparison::new("b", 1.0)];

        let result = apply_batch_update(
            1500.0,
            &comparisons,
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        // A sequential update would expect more than 0.5 in the second game.
        assert_eq!(result.new_rating, 1532.0);
        assert_eq!(result.updated_opponents["a"], result.updated_opponents["b"]);
    }

    #[test]
    fn test_invalid_cap_is_rejected_not_applied() {
        let existing = ratings(&[("Sey", 1500.0)]);
        let comparisons = vec![Comparison::new("Sey", 1.0)];

        for cap in [-1.0, f64::NAN] {
            let config = EloConfig {
                max_existing_delta: cap,
                ..EloConfig::default()
            };

            let err = apply_batch_update(1500.0, &comparisons, &existing, &HashMap::new(), &config)
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CafeHopError>(),
                Some(CafeHopError::ConfigurationError { .. })
            ));
        }
    }

    #[test]
    fn test_stronger_opponent_win_is_worth_more() {
        let existing = ratings(&[("strong", 1700.0), ("weak", 1300.0)]);

        let beat_strong = apply_batch_update(
            1500.0,
            &[Comparison::new("strong", 1.0)],
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();
        let beat_weak = apply_batch_update(
            1500.0,
            &[Comparison::new("weak", 1.0)],
            &existing,
            &HashMap::new(),
            &EloConfig::default(),
        )
        .unwrap();

        assert!(beat_strong.new_rating > beat_weak.new_rating);
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EloConfig {
            k_new: -4.0,
            ..EloConfig::default()
        };
        assert!(EloRatingEngine::new(config, 1500.0).is_err());
        assert!(EloRatingEngine::new(EloConfig::default(), f64::INFINITY).is_err());

        let engine = EloRatingEngine::default();
        assert_eq!(engine.initial_rating(), 1500.0);
    }

    #[test]
    fn test_engine_applies_its_own_config() {
        let config = EloConfig {
            max_existing_delta: 1.0,
            ..EloConfig::default()
        };
        let engine = EloRatingEngine::new(config, 1500.0).unwrap();
        let existing = ratings(&[("Hi-Collar", 1500.0)]);

        let result = engine
            .apply_batch(
                1500.0,
                &[Comparison::new("Hi-Collar", 1.0)],
                &existing,
                &HashMap::new(),
            )
            .unwrap();

        assert_eq!(result.updated_opponents["Hi-Collar"], 1499.0);
    }
}
