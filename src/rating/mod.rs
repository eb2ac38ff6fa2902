//! Pairwise Elo rating for newly uploaded cafes
//!
//! This module provides the batched Elo update, the star-scale projection,
//! the engine trait used by the upload flow and the catalog storage interface.

pub mod calculator;
pub mod display;
pub mod elo;
pub mod storage;

// Re-export commonly used types
pub use calculator::{MockRatingEngine, RatingEngine};
pub use display::{rating_to_display_scale, DisplayScale};
pub use elo::{apply_batch_update, expected_score, EloConfig, EloRatingEngine};
pub use storage::{CafeEntryRating, CatalogEntry, CatalogStore, InMemoryCatalog};
