//! Geolocation enrichment for uploaded cafes
//!
//! Nearest subway station from a precomputed transit table and neighborhood
//! names from a pluggable resolver.

pub mod neighborhood;
pub mod transit;

pub use neighborhood::{
    translate_community_board, NeighborhoodRegion, NeighborhoodResolver,
    StaticNeighborhoodResolver,
};
pub use transit::{haversine_distance, TransitFeed, TransitIndex};
