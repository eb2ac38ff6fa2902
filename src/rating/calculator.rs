//! Rating engine trait and a recording mock
//!
//! This module defines the interface the upload flow uses to rate a new cafe.
//! The upload service only sees `dyn RatingEngine`, so tests can swap in
//! [`MockRatingEngine`] to drive the fallback path.

use crate::error::{CafeHopError, Result};
use crate::types::{BatchUpdate, CafeId, Comparison, DEFAULT_RATING};
use std::collections::HashMap;

/// Trait for rating a new cafe against existing ones
pub trait RatingEngine: Send + Sync {
    /// Apply one batch of comparisons for a new cafe
    ///
    /// # Arguments
    /// * `initial_rating` - The new cafe's rating before the batch
    /// * `comparisons` - Pairwise outcomes from the new cafe's point of view
    /// * `existing_ratings` - Current rating of every referenced opponent
    /// * `existing_has_participated` - Comparison history per opponent (missing = never)
    fn apply_batch(
        &self,
        initial_rating: f64,
        comparisons: &[Comparison],
        existing_ratings: &HashMap<CafeId, f64>,
        existing_has_participated: &HashMap<CafeId, bool>,
    ) -> Result<BatchUpdate>;

    /// Seed rating for a cafe with no history
    fn initial_rating(&self) -> f64;
}

type RecordedCall = (f64, Vec<Comparison>);

/// Mock rating engine for testing
#[derive(Debug)]
pub struct MockRatingEngine {
    calls: std::sync::Mutex<Vec<RecordedCall>>,
    failure: std::sync::RwLock<Option<CafeHopError>>,
    initial_rating: f64,
}

impl Default for MockRatingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRatingEngine {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            failure: std::sync::RwLock::new(None),
            initial_rating: DEFAULT_RATING,
        }
    }

    /// Make every subsequent batch fail with `error`
    pub fn fail_with(&self, error: CafeHopError) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(error);
        }
    }

    /// Get all batches applied so far (for testing)
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RatingEngine for MockRatingEngine {
    fn apply_batch(
        &self,
        initial_rating: f64,
        comparisons: &[Comparison],
        _existing_ratings: &HashMap<CafeId, f64>,
        _existing_has_participated: &HashMap<CafeId, bool>,
    ) -> Result<BatchUpdate> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((initial_rating, comparisons.to_vec()));
        }

        if let Ok(failure) = self.failure.read() {
            if let Some(error) = failure.as_ref() {
                return Err(error.clone().into());
            }
        }

        Ok(BatchUpdate {
            new_rating: initial_rating,
            updated_opponents: HashMap::new(),
        })
    }

    fn initial_rating(&self) -> f64 {
        self.initial_rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_engine_records_calls() {
        let engine = MockRatingEngine::new();
        let comparisons = vec![Comparison::new("a", 1.0), Comparison::new("b", 0.0)];

        let result = engine
            .apply_batch(1510.0, &comparisons, &HashMap::new(), &HashMap::new())
            .unwrap();
        assert_eq!(result.new_rating, 1510.0);
        assert!(result.updated_opponents.is_empty());

        let calls = engine.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 1510.0);
        assert_eq!(calls[0].1, comparisons);
    }

    #[test]
    fn test_mock_engine_failure() {
        let engine = MockRatingEngine::new();
        engine.fail_with(CafeHopError::InternalError {
            message: "boom".to_string(),
        });

        let err = engine
            .apply_batch(1500.0, &[], &HashMap::new(), &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        // Failed batches are still recorded
        assert_eq!(engine.get_calls().len(), 1);
    }
}
