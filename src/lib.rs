//! Cafe Hop - cafe catalog service with pairwise Elo rating
//!
//! This crate rates newly uploaded cafes against existing ones with a batched
//! Elo update, projects ratings onto a star scale, and serves the catalog over
//! HTTP with subway and neighborhood enrichment.

pub mod config;
pub mod error;
pub mod geo;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;
pub mod upload;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{CafeHopError, Result};
pub use types::*;

// Re-export key components
pub use rating::{
    apply_batch_update, rating_to_display_scale, CatalogStore, EloConfig, EloRatingEngine,
    InMemoryCatalog, RatingEngine,
};
pub use upload::{UploadRequest, UploadService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
