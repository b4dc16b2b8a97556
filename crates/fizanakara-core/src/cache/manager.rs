use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::LocationKind;

/// Consider cache stale after 5 minutes.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() >= CACHE_STALE_MINUTES
    }
}

/// Identifies one cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Members,
    Children(String),
    Contributions {
        person_id: Option<String>,
        year: Option<i32>,
    },
    Payments(String),
    Locations(LocationKind),
    Admins,
}

/// Family of cache keys, used to invalidate every variant at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Members,
    Children,
    Contributions,
    Payments,
    Locations,
    Admins,
}

impl CacheKey {
    pub fn kind(&self) -> CacheKind {
        match self {
            CacheKey::Members => CacheKind::Members,
            CacheKey::Children(_) => CacheKind::Children,
            CacheKey::Contributions { .. } => CacheKind::Contributions,
            CacheKey::Payments(_) => CacheKind::Payments,
            CacheKey::Locations(_) => CacheKind::Locations,
            CacheKey::Admins => CacheKind::Admins,
        }
    }
}

/// In-memory cache of query results.
///
/// Entries are stored as JSON values so one map can hold every list type.
/// Nothing is written to disk.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, CachedData<serde_json::Value>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CachedData<serde_json::Value>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CachedData<T>>> {
        let entry = match self.lock().get(key) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let data: T = serde_json::from_value(entry.data)
            .with_context(|| format!("Failed to decode cache entry: {:?}", key))?;

        Ok(Some(CachedData {
            data,
            cached_at: entry.cached_at,
        }))
    }

    /// Cached value if present and not stale
    pub fn fresh<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        Ok(self
            .load(key)?
            .filter(|cached| !cached.is_stale())
            .map(|cached| cached.data))
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: CacheKey, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)
            .with_context(|| format!("Failed to encode cache entry: {:?}", key))?;
        self.lock().insert(key, CachedData::new(value));
        Ok(())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn invalidate(&self, key: &CacheKey) {
        if self.lock().remove(key).is_some() {
            debug!(?key, "Cache entry invalidated");
        }
    }

    pub fn invalidate_kind(&self, kind: CacheKind) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| key.kind() != kind);
        debug!(?kind, dropped = before - entries.len(), "Cache entries invalidated");
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Age of the most recent entry, or "never"
    pub fn last_updated(&self) -> String {
        self.lock()
            .values()
            .max_by_key(|entry| entry.cached_at)
            .map(|entry| entry.age_display())
            .unwrap_or_else(|| "never".to_string())
    }
}
