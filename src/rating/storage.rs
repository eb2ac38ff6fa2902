//! Catalog storage interface and implementations
//!
//! This module defines the interface for persisting and retrieving catalog
//! entries and their ratings, with an in-memory implementation.

use crate::error::{CafeHopError, Result};
use crate::types::{CafeId, CafeMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One cafe in the catalog with its rating state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeEntryRating {
    pub elo_rating: f64,
    /// Whether the cafe has taken part in an explicit comparison
    pub has_compared: bool,
    pub comparisons_count: u64,
}

/// Storage entry for a cafe with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub cafe_id: CafeId,
    pub cafe_name: String,
    /// `None` for cafes uploaded before they were ever rated
    pub rating: Option<CafeEntryRating>,
    pub metadata: CafeMetadata,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl CatalogEntry {
    /// Create an unrated entry
    pub fn new(cafe_id: impl Into<CafeId>, cafe_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            cafe_id: cafe_id.into(),
            cafe_name: cafe_name.into(),
            rating: None,
            metadata: CafeMetadata::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Create an entry that already carries a rating
    pub fn rated(
        cafe_id: impl Into<CafeId>,
        cafe_name: impl Into<String>,
        elo_rating: f64,
        has_compared: bool,
    ) -> Self {
        let mut entry = Self::new(cafe_id, cafe_name);
        entry.rating = Some(CafeEntryRating {
            elo_rating,
            has_compared,
            comparisons_count: 0,
        });
        entry
    }

    pub fn elo_rating(&self) -> Option<f64> {
        self.rating.as_ref().map(|r| r.elo_rating)
    }

    pub fn has_compared(&self) -> bool {
        self.rating.as_ref().is_some_and(|r| r.has_compared)
    }

    /// Record a new rating; `comparisons` counts explicit comparisons only
    pub fn record_rating(&mut self, elo_rating: f64, comparisons: u64) {
        let rating = self.rating.get_or_insert(CafeEntryRating {
            elo_rating,
            has_compared: false,
            comparisons_count: 0,
        });
        rating.elo_rating = elo_rating;
        rating.comparisons_count += comparisons;
        rating.has_compared |= comparisons > 0;
        self.last_updated = Utc::now();
    }
}

/// Trait for catalog storage operations
pub trait CatalogStore: Send + Sync {
    /// Get a cafe's entry
    fn get_entry(&self, cafe_id: &CafeId) -> Result<Option<CatalogEntry>>;

    /// Get entries for multiple cafes; unknown ids are left out
    fn get_entries(&self, cafe_ids: &[CafeId]) -> Result<HashMap<CafeId, CatalogEntry>>;

    /// Store multiple entries under one write
    fn store_entries(&self, entries: Vec<CatalogEntry>) -> Result<()>;

    /// All entries that carry a rating, in no particular order
    fn rated_entries(&self) -> Result<Vec<CatalogEntry>>;

    /// Rated entries sorted by rating (descending), unrated ones last by name
    fn ranked_entries(&self, limit: Option<usize>) -> Result<Vec<CatalogEntry>>;

    fn entry_count(&self) -> Result<usize>;
}

/// In-memory catalog implementation
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<HashMap<CafeId, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog preloaded with `entries`
    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        let catalog = Self::new();
        if let Ok(mut map) = catalog.entries.write() {
            map.extend(entries.into_iter().map(|e| (e.cafe_id.clone(), e)));
        }
        catalog
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<CafeId, CatalogEntry>>> {
        self.entries.read().map_err(|_| {
            CafeHopError::InternalError {
                message: "Failed to acquire catalog read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<CafeId, CatalogEntry>>> {
        self.entries.write().map_err(|_| {
            CafeHopError::InternalError {
                message: "Failed to acquire catalog write lock".to_string(),
            }
            .into()
        })
    }
}

impl CatalogStore for InMemoryCatalog {
    fn get_entry(&self, cafe_id: &CafeId) -> Result<Option<CatalogEntry>> {
        Ok(self.read()?.get(cafe_id).cloned())
    }

    fn get_entries(&self, cafe_ids: &[CafeId]) -> Result<HashMap<CafeId, CatalogEntry>> {
        let entries = self.read()?;

        Ok(cafe_ids
            .iter()
            .filter_map(|id| entries.get(id).map(|e| (id.clone(), e.clone())))
            .collect())
    }

    fn store_entries(&self, entries: Vec<CatalogEntry>) -> Result<()> {
        let mut stored = self.write()?;
        for entry in entries {
            stored.insert(entry.cafe_id.clone(), entry);
        }
        Ok(())
    }

    fn rated_entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .read()?
            .values()
            .filter(|e| e.rating.is_some())
            .cloned()
            .collect())
    }

    fn ranked_entries(&self, limit: Option<usize>) -> Result<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self.read()?.values().cloned().collect();

        entries.sort_by(|a, b| match (a.elo_rating(), b.elo_rating()) {
            (Some(x), Some(y)) => y
                .partial_cmp(&x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cafe_name.cmp(&b.cafe_name)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cafe_name.cmp(&b.cafe_name),
        });

        if let Some(limit) = limit {
            entries.truncate(limit);
        }

        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CatalogEntry::new("Sey_5_STARS.jpg", "Sey");
        assert_eq!(entry.cafe_id, "Sey_5_STARS.jpg");
        assert!(entry.elo_rating().is_none());
        assert!(!entry.has_compared());

        let rated = CatalogEntry::rated("Kaigo.jpg", "Kaigo", 1544.0, true);
        assert_eq!(rated.elo_rating(), Some(1544.0));
        assert!(rated.has_compared());
    }

    #[test]
    fn test_record_rating() {
        let mut entry = CatalogEntry::new("Ralph's.jpg", "Ralph's");
        let original_updated_time = entry.last_updated;

        entry.record_rating(1512.0, 0);
        assert_eq!(entry.elo_rating(), Some(1512.0));
        assert!(!entry.has_compared());

        entry.record_rating(1507.5, 2);
        let rating = entry.rating.as_ref().unwrap();
        assert_eq!(rating.elo_rating, 1507.5);
        assert_eq!(rating.comparisons_count, 2);
        assert!(rating.has_compared);
        assert!(entry.last_updated >= original_updated_time);

        // Participation is never revoked
        entry.record_rating(1509.0, 0);
        assert!(entry.has_compared());
    }

    #[test]
    fn test_in_memory_basic_operations() {
        let catalog = InMemoryCatalog::new();
        let id = "Sey.jpg".to_string();

        assert!(catalog.get_entry(&id).unwrap().is_none());
        catalog
            .store_entries(vec![CatalogEntry::rated(id.clone(), "Sey", 1500.0, false)])
            .unwrap();

        let retrieved = catalog.get_entry(&id).unwrap().unwrap();
        assert_eq!(retrieved.cafe_name, "Sey");
        assert_eq!(catalog.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_bulk_operations() {
        let catalog = InMemoryCatalog::new();
        catalog
            .store_entries(vec![
                CatalogEntry::rated("a", "A", 1500.0, false),
                CatalogEntry::rated("b", "B", 1600.0, true),
                CatalogEntry::new("c", "C"),
            ])
            .unwrap();

        let ids = vec!["a".to_string(), "c".to_string(), "missing".to_string()];
        let found = catalog.get_entries(&ids).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains_key("a"));
        assert!(found.contains_key("c"));

        let rated = catalog.rated_entries().unwrap();
        assert_eq!(rated.len(), 2);
        assert!(rated.iter().all(|e| e.rating.is_some()));
    }

    #[test]
    fn test_ranked_entries() {
        let catalog = InMemoryCatalog::with_entries(vec![
            CatalogEntry::rated("low", "Low", 1420.0, false),
            CatalogEntry::new("unrated_b", "Unrated B"),
            CatalogEntry::rated("high", "High", 1640.0, true),
            CatalogEntry::new("unrated_a", "Unrated A"),
            CatalogEntry::rated("mid", "Mid", 1500.0, false),
        ]);

        let ranked = catalog.ranked_entries(None).unwrap();
        let names: Vec<_> = ranked.iter().map(|e| e.cafe_name.as_str()).collect();
        assert_eq!(names, ["High", "Mid", "Low", "Unrated A", "Unrated B"]);

        let top = catalog.ranked_entries(Some(2)).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].cafe_name, "High");

        // Replacing an entry re-ranks it
        catalog
            .store_entries(vec![CatalogEntry::rated("low", "Low", 1700.0, true)])
            .unwrap();
        assert_eq!(catalog.ranked_entries(Some(1)).unwrap()[0].cafe_name, "Low");
        assert_eq!(catalog.entry_count().unwrap(), 5);
    }
}
