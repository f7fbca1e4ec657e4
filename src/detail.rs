use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::models::{Movie, MovieDetail};
use crate::tmdb::CatalogApi;

pub const DETAIL_ERROR: &str = "Failed to fetch movie details";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailState {
    pub movie_id: Option<i64>,
    pub movie: Option<MovieDetail>,
    pub recommendations: Vec<Movie>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DetailState {
    /// Detail and recommendations both arrived for the selected movie.
    pub fn is_ready(&self) -> bool {
        self.movie_id.is_some() && self.movie.is_some() && !self.loading && self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: DetailState,
    generation: u64,
}

/// Loads a movie's detail and recommendations as one unit: either both are
/// exposed or neither is.
pub struct MovieDetailController {
    api: Arc<dyn CatalogApi>,
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for MovieDetailController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieDetailController").finish_non_exhaustive()
    }
}

impl MovieDetailController {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub async fn state(&self) -> DetailState {
        self.inner.lock().await.state.clone()
    }

    pub async fn select(&self, movie_id: Option<i64>) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.state = DetailState {
                movie_id,
                loading: movie_id.is_some(),
                ..DetailState::default()
            };
            inner.generation
        };
        let Some(id) = movie_id else {
            return;
        };
        info!("Loading details for movie {}", id);

        // Detached so a dropped caller cannot strand `loading`.
        let api = self.api.clone();
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let result = tokio::try_join!(api.fetch_detail(id), api.fetch_recommendations(id));

            let mut inner = inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding stale details for movie {}", id);
                return;
            }
            let state = &mut inner.state;
            match result {
                Ok((detail, recommendations)) => {
                    debug!(
                        "Loaded details for '{}' with {} recommendations",
                        detail.title,
                        recommendations.results.len()
                    );
                    state.movie = Some(detail);
                    state.recommendations = recommendations.results;
                }
                Err(e) => {
                    warn!("Fetching details for movie {} failed: {:?}", id, e);
                    state.error = Some(DETAIL_ERROR.to_string());
                }
            }
            state.loading = false;
        });

        if let Err(e) = task.await {
            error!("Detail task for movie {} failed: {}", id, e);
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.state.loading = false;
                inner.state.error = Some(DETAIL_ERROR.to_string());
            }
        }
    }

    /// Clears the panel only when `movie_id` is the one selected.
    pub async fn close(&self, movie_id: i64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state.movie_id != Some(movie_id) {
            return false;
        }
        inner.generation += 1;
        inner.state = DetailState::default();
        true
    }

    pub async fn clear(&self) {
        self.select(None).await;
    }
}
