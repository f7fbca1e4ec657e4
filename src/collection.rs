use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::Movie;
use crate::storage::KeyValueStore;

pub const WATCHLIST_KEY: &str = "movieWatchlist";

/// Named, insertion-ordered set of movie snapshots persisted under one key.
/// Every change rewrites the whole entry.
pub struct PersistedCollection {
    key: String,
    store: Arc<dyn KeyValueStore>,
    items: Vec<Movie>,
}

impl std::fmt::Debug for PersistedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedCollection")
            .field("key", &self.key)
            .field("len", &self.items.len())
            .finish()
    }
}

impl PersistedCollection {
    /// Never fails: an absent, unreadable or corrupt entry starts empty.
    pub fn initialize(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let items = match store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Movie>>(&raw) {
                Ok(items) => dedupe_by_id(items),
                Err(e) => {
                    warn!("Failed to parse stored collection '{}': {}", key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read stored collection '{}': {:?}", key, e);
                Vec::new()
            }
        };
        debug!("Loaded collection '{}' with {} entries", key, items.len());
        Self {
            key: key.to_string(),
            store,
            items,
        }
    }

    pub fn watchlist(store: Arc<dyn KeyValueStore>) -> Self {
        Self::initialize(store, WATCHLIST_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.items.iter().any(|m| m.id == movie_id)
    }

    pub fn items(&self) -> &[Movie] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes the movie if present, otherwise appends a snapshot of it.
    /// Returns whether the movie is a member afterwards. If the write fails
    /// the in-memory collection is left as it was.
    pub fn toggle(&mut self, movie: &Movie) -> Result<bool> {
        let present = self.contains(movie.id);
        let next: Vec<Movie> = if present {
            self.items
                .iter()
                .filter(|m| m.id != movie.id)
                .cloned()
                .collect()
        } else {
            let mut next = self.items.clone();
            next.push(movie.clone());
            next
        };

        let encoded = serde_json::to_string(&next).context("Failed to encode collection")?;
        self.store
            .set(&self.key, &encoded)
            .with_context(|| format!("Failed to persist collection '{}'", self.key))?;
        self.items = next;
        Ok(!present)
    }
}

fn dedupe_by_id(items: Vec<Movie>) -> Vec<Movie> {
    let mut out: Vec<Movie> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|m| m.id == item.id) {
            out.push(item);
        }
    }
    out
}
