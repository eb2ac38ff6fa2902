//! Upload request parsing and validation

use crate::error::{CafeHopError, Result};
use crate::types::{CafeId, ComparisonOutcome};
use serde::{Deserialize, Serialize};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// JSON body of an upload request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadRequest {
    pub cafe_name: String,
    pub content_type: Option<String>,
    /// The uploader's own star rating; a number or a numeric string
    pub rating: Option<serde_json::Value>,
    pub notes: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub neighborhood: String,
    pub closest_subway_station: String,
    pub closest_subway_lines: String,
    /// `[opponent_id, outcome]` pairs from the new cafe's point of view
    pub comparisons: Vec<(CafeId, f64)>,
}

/// Geolocation values supplied by the uploader, which win over computed ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoOverrides {
    pub neighborhood: Option<String>,
    pub closest_subway_station: Option<String>,
    pub closest_subway_lines: Option<String>,
}

/// An upload request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub cafe_name: String,
    pub content_type: String,
    pub star_rating: Option<f64>,
    pub notes: String,
    /// Present only when both coordinates were given
    pub coordinates: Option<(f64, f64)>,
    pub overrides: GeoOverrides,
    pub comparisons: Vec<(CafeId, ComparisonOutcome)>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl UploadRequest {
    /// Star rating as a number; unparseable values count as no rating
    pub fn star_rating(&self) -> Option<f64> {
        match self.rating.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|r| r.is_finite())
    }

    pub fn validate(&self) -> Result<ValidatedUpload> {
        let cafe_name = non_empty(&self.cafe_name).ok_or_else(|| {
            CafeHopError::InvalidUploadRequest {
                reason: "Cafe name is required".to_string(),
            }
        })?;

        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(CafeHopError::InvalidUploadRequest {
                        reason: format!("Coordinates out of range: ({}, {})", lat, lon),
                    }
                    .into());
                }
                Some((lat, lon))
            }
            _ => None,
        };

        let comparisons = self
            .comparisons
            .iter()
            .map(|(opponent_id, outcome)| {
                if opponent_id.trim().is_empty() {
                    return Err(CafeHopError::InvalidUploadRequest {
                        reason: "Comparison opponent id cannot be empty".to_string(),
                    });
                }
                Ok((opponent_id.clone(), ComparisonOutcome::try_from(*outcome)?))
            })
            .collect::<std::result::Result<Vec<_>, CafeHopError>>()?;

        Ok(ValidatedUpload {
            cafe_name,
            content_type: self
                .content_type
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            star_rating: self.star_rating(),
            notes: self.notes.trim().to_string(),
            coordinates,
            overrides: GeoOverrides {
                neighborhood: non_empty(&self.neighborhood),
                closest_subway_station: non_empty(&self.closest_subway_station),
                closest_subway_lines: non_empty(&self.closest_subway_lines),
            },
            comparisons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> UploadRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_minimal_request() {
        let request = parse(serde_json::json!({ "cafeName": "  Sey Coffee  " }));
        let upload = request.validate().unwrap();

        assert_eq!(upload.cafe_name, "Sey Coffee");
        assert_eq!(upload.content_type, "image/jpeg");
        assert_eq!(upload.star_rating, None);
        assert_eq!(upload.coordinates, None);
        assert!(upload.comparisons.is_empty());
    }

    #[test]
    fn test_missing_name_rejected() {
        let err = parse(serde_json::json!({ "cafeName": "   " }))
            .validate()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CafeHopError>(),
            Some(CafeHopError::InvalidUploadRequest { .. })
        ));
    }

    #[test]
    fn test_full_request() {
        let request = parse(serde_json::json!({
            "cafeName": "Devoción",
            "contentType": "image/png",
            "rating": "4.5",
            "notes": " great light ",
            "latitude": 40.7163,
            "longitude": -73.9645,
            "neighborhood": "Williamsburg",
            "closestSubwayStation": "",
            "comparisons": [["Sey_5_STARS.jpg", 1], ["Partners_4_STARS.jpg", 0.5]]
        }));
        let upload = request.validate().unwrap();

        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.star_rating, Some(4.5));
        assert_eq!(upload.notes, "great light");
        assert_eq!(upload.coordinates, Some((40.7163, -73.9645)));
        assert_eq!(upload.overrides.neighborhood, Some("Williamsburg".to_string()));
        assert_eq!(upload.overrides.closest_subway_station, None);
        assert_eq!(
            upload.comparisons,
            vec![
                ("Sey_5_STARS.jpg".to_string(), ComparisonOutcome::Win),
                ("Partners_4_STARS.jpg".to_string(), ComparisonOutcome::Tie),
            ]
        );
    }

    #[test]
    fn test_star_rating_parsing() {
        let numeric = parse(serde_json::json!({ "cafeName": "a", "rating": 4 }));
        assert_eq!(numeric.star_rating(), Some(4.0));

        let garbage = parse(serde_json::json!({ "cafeName": "a", "rating": "great" }));
        assert_eq!(garbage.star_rating(), None);

        let empty = parse(serde_json::json!({ "cafeName": "a", "rating": "" }));
        assert_eq!(empty.star_rating(), None);
    }

    #[test]
    fn test_invalid_outcome_rejected() {
        let err = parse(serde_json::json!({
            "cafeName": "a",
            "comparisons": [["b", 0.7]]
        }))
        .validate()
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<CafeHopError>(),
            Some(&CafeHopError::InvalidOutcome { value: 0.7 })
        );
    }

    #[test]
    fn test_single_coordinate_ignored() {
        let upload = parse(serde_json::json!({ "cafeName": "a", "latitude": 40.7 }))
            .validate()
            .unwrap();
        assert_eq!(upload.coordinates, None);
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let result = parse(serde_json::json!({
            "cafeName": "a",
            "latitude": 140.0,
            "longitude": -73.9
        }))
        .validate();
        assert!(result.is_err());
    }
}
