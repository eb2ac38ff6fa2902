//! Responses returned by the upload service

use crate::rating::{CatalogEntry, DisplayScale};
use crate::types::{CafeId, CafeMetadata, ComparisonSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of a stored upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub upload_id: Uuid,
    pub cafe_id: CafeId,
    /// Object key the photo is stored under; equal to `cafe_id`
    pub object_key: String,
    pub content_type: String,
    pub elo_rating: f64,
    pub elo_star_rating: f64,
    pub comparison_source: ComparisonSource,
    /// True when rating failed and the seed rating was stored instead
    pub fallback: bool,
    pub updated_opponents: HashMap<CafeId, f64>,
    pub metadata: CafeMetadata,
}

/// Public view of a catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeSummary {
    pub cafe_id: CafeId,
    pub cafe_name: String,
    pub elo_rating: Option<f64>,
    pub elo_star_rating: Option<f64>,
    pub has_compared: bool,
    pub metadata: CafeMetadata,
}

impl CafeSummary {
    pub fn from_entry(entry: CatalogEntry, scale: &DisplayScale) -> Self {
        let elo_rating = entry.elo_rating();
        Self {
            has_compared: entry.has_compared(),
            elo_star_rating: elo_rating.map(|r| scale.project(r)),
            elo_rating,
            cafe_id: entry.cafe_id,
            cafe_name: entry.cafe_name,
            metadata: entry.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_projects_rating() {
        let entry = CatalogEntry::rated("Sey_5_STARS.jpg", "Sey", 1600.0, true);
        let summary = CafeSummary::from_entry(entry, &DisplayScale::default());

        assert_eq!(summary.elo_rating, Some(1600.0));
        assert_eq!(summary.elo_star_rating, Some(4.0));
        assert!(summary.has_compared);
    }

    #[test]
    fn test_summary_unrated() {
        let entry = CatalogEntry::new("Sey_unvisited.jpg", "Sey");
        let summary = CafeSummary::from_entry(entry, &DisplayScale::default());

        assert_eq!(summary.elo_rating, None);
        assert_eq!(summary.elo_star_rating, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["cafeId"], "Sey_unvisited.jpg");
        assert!(json["eloStarRating"].is_null());
    }
}
