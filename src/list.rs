use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::{Movie, Page};
use crate::tmdb::CatalogApi;

/// Which feed the list is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mode {
    Popular,
    TopRated,
    Search { query: String },
    Genre { id: i64 },
}

impl Mode {
    async fn fetch(&self, api: &dyn CatalogApi, page: u32) -> Result<Page> {
        match self {
            Mode::Popular => api.fetch_popular(page).await,
            Mode::TopRated => api.fetch_top_rated(page).await,
            Mode::Search { query } => api.search(query, page).await,
            Mode::Genre { id } => api.fetch_by_genre(*id, page).await,
        }
    }

    fn error_message(&self) -> &'static str {
        match self {
            Mode::Popular => "Failed to fetch popular movies",
            Mode::TopRated => "Failed to fetch top rated movies",
            Mode::Search { .. } => "Failed to search movies",
            Mode::Genre { .. } => "Failed to fetch movies by genre",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Popular => write!(f, "popular"),
            Mode::TopRated => write!(f, "top rated"),
            Mode::Search { query } => write!(f, "search '{query}'"),
            Mode::Genre { id } => write!(f, "genre {id}"),
        }
    }
}

pub const NEXT_PAGE_ERROR: &str = "Failed to fetch more movies";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListState {
    pub movies: Vec<Movie>,
    pub loading: bool,
    pub error: Option<String>,
    pub mode: Mode,
    pub page: u32,
    pub total_pages: u32,
}

impl ListState {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug)]
struct Inner {
    state: ListState,
    generation: u64,
}

/// Paginated movie feed. Switching mode replaces the movies, loading the next
/// page appends. Each request is stamped with a generation and only the
/// latest one may apply its result.
pub struct MovieListController {
    api: Arc<dyn CatalogApi>,
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for MovieListController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieListController").finish_non_exhaustive()
    }
}

impl MovieListController {
    /// Starts in `popular` mode, loading, with nothing fetched yet. Call
    /// [`start`](Self::start) to issue the initial request.
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner {
                state: ListState {
                    movies: Vec::new(),
                    loading: true,
                    error: None,
                    mode: Mode::Popular,
                    page: 1,
                    total_pages: 0,
                },
                generation: 0,
            })),
        }
    }

    /// Creates the controller and fires the initial popular fetch in the
    /// background.
    pub fn spawn_initial(api: Arc<dyn CatalogApi>) -> Arc<Self> {
        let controller = Arc::new(Self::new(api));
        let task = controller.clone();
        tokio::spawn(async move { task.start().await });
        controller
    }

    pub async fn start(&self) {
        self.select_mode(Mode::Popular).await;
    }

    pub async fn state(&self) -> ListState {
        self.inner.lock().await.state.clone()
    }

    pub async fn fetch_popular(&self) {
        self.select_mode(Mode::Popular).await;
    }

    pub async fn fetch_top_rated(&self) {
        self.select_mode(Mode::TopRated).await;
    }

    pub async fn fetch_by_genre(&self, genre_id: i64) {
        self.select_mode(Mode::Genre { id: genre_id }).await;
    }

    /// A blank query falls back to the popular feed.
    pub async fn search(&self, query: &str) {
        if query.trim().is_empty() {
            self.select_mode(Mode::Popular).await;
        } else {
            self.select_mode(Mode::Search {
                query: query.to_string(),
            })
            .await;
        }
    }

    /// Fetches page 1 of `mode` and replaces the list. On failure the
    /// previous movies stay visible.
    pub async fn select_mode(&self, mode: Mode) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            let state = &mut inner.state;
            state.mode = mode.clone();
            state.loading = true;
            state.error = None;
            state.page = 1;
            state.total_pages = 0;
            inner.generation
        };
        info!("Loading {} movies", mode);

        let api = self.api.clone();
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let result = mode.fetch(api.as_ref(), 1).await;

            let mut inner = inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding stale {} response (generation {})", mode, generation);
                return;
            }
            let state = &mut inner.state;
            match result {
                Ok(page) => {
                    debug!(
                        "Loaded {} movies for {} (page {}/{})",
                        page.results.len(),
                        mode,
                        page.page,
                        page.total_pages
                    );
                    state.movies = page.results;
                    state.page = page.page;
                    state.total_pages = page.total_pages;
                }
                Err(e) => {
                    warn!("Fetching {} movies failed: {:?}", mode, e);
                    state.error = Some(mode.error_message().to_string());
                }
            }
            state.loading = false;
        });
        self.settle(task, generation).await;
    }

    /// Appends the next page of the current mode. Returns `false` without
    /// issuing a request when already on the last page or while a fetch is
    /// in flight.
    pub async fn fetch_next_page(&self) -> bool {
        let (generation, mode, next) = {
            let mut inner = self.inner.lock().await;
            if inner.state.loading || inner.state.page >= inner.state.total_pages {
                debug!(
                    "Skipping next page (loading={}, page {}/{})",
                    inner.state.loading, inner.state.page, inner.state.total_pages
                );
                return false;
            }
            inner.generation += 1;
            inner.state.loading = true;
            (
                inner.generation,
                inner.state.mode.clone(),
                inner.state.page + 1,
            )
        };
        debug!("Loading page {} of {} movies", next, mode);

        let api = self.api.clone();
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let result = mode.fetch(api.as_ref(), next).await;

            let mut inner = inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding stale page {} of {}", next, mode);
                return;
            }
            let state = &mut inner.state;
            match result {
                Ok(page) => {
                    state.movies.extend(page.results);
                    state.page = page.page;
                    state.total_pages = page.total_pages;
                    state.error = None;
                }
                Err(e) => {
                    warn!("Fetching page {} of {} movies failed: {:?}", next, mode, e);
                    state.error = Some(NEXT_PAGE_ERROR.to_string());
                }
            }
            state.loading = false;
        });
        self.settle(task, generation).await;
        true
    }

    /// Fetches run detached: dropping the caller's future does not cancel
    /// them. A task that died releases `loading` unless a newer fetch owns it.
    async fn settle(&self, task: JoinHandle<()>, generation: u64) {
        if let Err(e) = task.await {
            error!("Movie list fetch task failed: {}", e);
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.state.loading = false;
            }
        }
    }
}
