use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::collection::PersistedCollection;
use crate::debounce::Debouncer;
use crate::detail::{DetailState, MovieDetailController};
use crate::genres::{GenreCatalog, GenreState};
use crate::list::{ListState, Mode, MovieListController};
use crate::models::Movie;
use crate::storage::KeyValueStore;
use crate::tmdb::CatalogApi;

pub const POPULAR_HEADING: &str = "Popular Movies";
pub const WATCHLIST_HEADING: &str = "My Watch Later List";
pub const GENRE_FALLBACK_HEADING: &str = "Movies";

#[derive(Debug, Clone, Copy, Default)]
struct UiState {
    selected_genre: Option<i64>,
    showing_watchlist: bool,
}

/// A movie as the grid shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieCard {
    #[serde(flatten)]
    pub movie: Movie,
    pub poster_url: Option<String>,
    pub release_year: Option<i32>,
    pub in_watchlist: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub heading: String,
    pub mode: Mode,
    pub selected_genre: Option<i64>,
    pub showing_watchlist: bool,
    pub watchlist_count: usize,
    pub movies: Vec<MovieCard>,
    pub loading: bool,
    pub error: Option<String>,
    /// Nothing to show and nothing loading.
    pub empty: bool,
    pub has_more: bool,
    pub page: u32,
    pub total_pages: u32,
}

/// Wires the feed, detail panel, genre filter and watch-later list together
/// the way the home screen uses them.
pub struct Session {
    list: Arc<MovieListController>,
    detail: MovieDetailController,
    genres: Arc<GenreCatalog>,
    watchlist: Mutex<PersistedCollection>,
    search: Debouncer,
    ui: Mutex<UiState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Builds the session without touching the network; see
    /// [`start`](Self::start) and [`launch`](Self::launch).
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: Arc<dyn KeyValueStore>,
        search_delay: Duration,
    ) -> Self {
        Self {
            list: Arc::new(MovieListController::new(api.clone())),
            detail: MovieDetailController::new(api.clone()),
            genres: Arc::new(GenreCatalog::new(api)),
            watchlist: Mutex::new(PersistedCollection::watchlist(store)),
            search: Debouncer::new(search_delay),
            ui: Mutex::new(UiState::default()),
        }
    }

    /// Initial popular feed and genre list, concurrently.
    pub async fn start(&self) {
        tokio::join!(self.list.start(), self.genres.load());
    }

    pub fn launch(self: &Arc<Self>) {
        let session = self.clone();
        tokio::spawn(async move { session.start().await });
    }

    pub async fn list_state(&self) -> ListState {
        self.list.state().await
    }

    pub async fn detail_state(&self) -> DetailState {
        self.detail.state().await
    }

    pub fn genre_state(&self) -> GenreState {
        self.genres.state()
    }

    pub async fn watchlist(&self) -> Vec<Movie> {
        self.watchlist.lock().await.items().to_vec()
    }

    /// `None` goes back to the popular feed.
    pub async fn select_genre(&self, genre_id: Option<i64>) {
        {
            let mut ui = self.ui.lock().await;
            ui.selected_genre = genre_id;
            ui.showing_watchlist = false;
        }
        match genre_id {
            Some(id) => self.list.fetch_by_genre(id).await,
            None => self.list.fetch_popular().await,
        }
    }

    /// Keystroke path: the search runs once input has been quiet for the
    /// debounce period.
    pub fn search_input(self: &Arc<Self>, query: impl Into<String>) {
        let query = query.into();
        let session: Weak<Self> = Arc::downgrade(self);
        debug!("Scheduling search for '{}'", query);
        self.search.schedule(async move {
            if let Some(session) = session.upgrade() {
                session.search_now(&query).await;
            }
        });
    }

    pub async fn search_now(&self, query: &str) {
        {
            let mut ui = self.ui.lock().await;
            ui.selected_genre = None;
            ui.showing_watchlist = false;
        }
        self.list.search(query).await;
    }

    pub fn cancel_pending_search(&self) {
        self.search.cancel();
    }

    pub fn search_pending(&self) -> bool {
        self.search.is_pending()
    }

    /// No-op in the watch-later view.
    pub async fn load_more(&self) -> bool {
        if self.ui.lock().await.showing_watchlist {
            return false;
        }
        self.list.fetch_next_page().await
    }

    pub async fn open_movie(&self, movie_id: i64) -> DetailState {
        self.detail.select(Some(movie_id)).await;
        self.detail.state().await
    }

    /// Returns `false` when `movie_id` is not the open movie.
    pub async fn close_movie(&self, movie_id: i64) -> bool {
        self.detail.close(movie_id).await
    }

    pub async fn current_movie(&self) -> DetailState {
        self.detail.state().await
    }

    /// Returns whether the movie is on the list afterwards.
    pub async fn toggle_watchlist(&self, movie: &Movie) -> Result<bool> {
        let added = self.watchlist.lock().await.toggle(movie)?;
        info!(
            "{} '{}' {} watch-later list",
            if added { "Added" } else { "Removed" },
            movie.title,
            if added { "to" } else { "from" }
        );
        Ok(added)
    }

    pub async fn toggle_watchlist_view(&self) -> bool {
        let mut ui = self.ui.lock().await;
        ui.showing_watchlist = !ui.showing_watchlist;
        ui.showing_watchlist
    }

    /// Leaves the watch-later view for a fresh popular feed.
    pub async fn explore_popular(&self) {
        {
            let mut ui = self.ui.lock().await;
            ui.showing_watchlist = false;
            ui.selected_genre = None;
        }
        self.list.fetch_popular().await;
    }

    pub async fn view(&self) -> SessionView {
        let list = self.list.state().await;
        let ui = *self.ui.lock().await;
        let watchlist = self.watchlist.lock().await;

        let heading = if ui.showing_watchlist {
            WATCHLIST_HEADING.to_string()
        } else if let Some(id) = ui.selected_genre {
            self.genres
                .name_of(id)
                .unwrap_or_else(|| GENRE_FALLBACK_HEADING.to_string())
        } else {
            POPULAR_HEADING.to_string()
        };

        let shown: &[Movie] = if ui.showing_watchlist {
            watchlist.items()
        } else {
            &list.movies
        };
        let movies: Vec<MovieCard> = shown
            .iter()
            .map(|m| MovieCard {
                poster_url: m.poster_url(),
                release_year: m.release_year(),
                in_watchlist: watchlist.contains(m.id),
                movie: m.clone(),
            })
            .collect();

        let loading = !ui.showing_watchlist && list.loading;
        SessionView {
            heading,
            mode: list.mode.clone(),
            selected_genre: ui.selected_genre,
            showing_watchlist: ui.showing_watchlist,
            watchlist_count: watchlist.len(),
            empty: movies.is_empty() && !loading,
            has_more: !ui.showing_watchlist && list.has_more(),
            error: if ui.showing_watchlist {
                None
            } else {
                list.error.clone()
            },
            movies,
            loading,
            page: list.page,
            total_pages: list.total_pages,
        }
    }
}
