//! Utility functions for the cafe-hop service

use uuid::Uuid;

/// Generate a new unique upload ID
pub fn generate_upload_id() -> Uuid {
    Uuid::new_v4()
}

/// Replace path separators so a cafe name is safe to use in an object key
pub fn sanitize_cafe_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// Format a user star rating for an object key: `4` for 4.0, `4.5` for 4.5
pub fn format_star_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{:.0}", rating)
    } else {
        format!("{}", rating)
    }
}

/// Object key for an uploaded cafe photo
///
/// Rated cafes get `{name}_{rating}_STARS.jpg`, anything else (no rating or a
/// non-positive one) gets `{name}_unvisited.jpg`.
pub fn object_key(cafe_name: &str, star_rating: Option<f64>) -> String {
    let safe_name = sanitize_cafe_name(cafe_name);
    match star_rating {
        Some(rating) if rating > 0.0 => {
            format!("{}_{}_STARS.jpg", safe_name, format_star_rating(rating))
        }
        _ => format!("{}_unvisited.jpg", safe_name),
    }
}
