use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::models::Genre;
use crate::tmdb::CatalogApi;

pub const GENRES_ERROR: &str = "Failed to fetch genres";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenreState {
    pub genres: Vec<Genre>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Genre taxonomy, fetched once for the lifetime of the catalog and read-only
/// afterwards. A failed load is not retried.
pub struct GenreCatalog {
    api: Arc<dyn CatalogApi>,
    cell: OnceCell<Result<Vec<Genre>, String>>,
}

impl fmt::Debug for GenreCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenreCatalog")
            .field("loaded", &self.cell.initialized())
            .finish()
    }
}

impl GenreCatalog {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            cell: OnceCell::new(),
        }
    }

    /// Creates the catalog and starts the one-time load in the background.
    pub fn spawn_load(api: Arc<dyn CatalogApi>) -> Arc<Self> {
        let catalog = Arc::new(Self::new(api));
        let task = catalog.clone();
        tokio::spawn(async move {
            task.load().await;
        });
        catalog
    }

    /// Concurrent callers share the single request.
    pub async fn load(&self) -> GenreState {
        self.cell
            .get_or_init(|| async {
                match self.api.fetch_genres().await {
                    Ok(genres) => {
                        info!("Loaded {} genres", genres.len());
                        Ok(genres)
                    }
                    Err(e) => {
                        warn!("Fetching genres failed: {:?}", e);
                        Err(GENRES_ERROR.to_string())
                    }
                }
            })
            .await;
        self.state()
    }

    pub fn state(&self) -> GenreState {
        match self.cell.get() {
            None => GenreState {
                loading: true,
                ..GenreState::default()
            },
            Some(Ok(genres)) => GenreState {
                genres: genres.clone(),
                ..GenreState::default()
            },
            Some(Err(message)) => GenreState {
                error: Some(message.clone()),
                ..GenreState::default()
            },
        }
    }

    pub fn name_of(&self, genre_id: i64) -> Option<String> {
        match self.cell.get() {
            Some(Ok(genres)) => genres
                .iter()
                .find(|g| g.id == genre_id)
                .map(|g| g.name.clone()),
            _ => None,
        }
    }
}
