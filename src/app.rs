use crate::config::Config;
use crate::detail::DetailState;
use crate::genres::GenreState;
use crate::models::Movie;
use crate::session::{Session, SessionView};
use crate::storage::{FileStore, KeyValueStore};
use crate::tmdb::{CatalogApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let api: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    info!("Persisting collections under {}", config.data_dir.display());

    let session = Arc::new(Session::new(api, store, config.search_debounce));
    session.launch();

    let app = build_router(AppState { session });

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/view", get(view))
        .route("/genre", post(select_genre))
        .route("/search", post(search_input))
        .route("/search/now", post(search_now))
        .route("/more", post(load_more))
        .route("/explore", post(explore_popular))
        .route("/genres", get(genres))
        .route("/movies/current", get(current_movie))
        .route("/movies/:id", post(open_movie).delete(close_movie))
        .route("/watchlist", get(watchlist))
        .route("/watchlist/toggle", post(toggle_watchlist))
        .route("/watchlist/view", post(toggle_watchlist_view))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn view(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.view().await)
}

#[derive(Debug, Deserialize)]
struct GenreRequest {
    genre_id: Option<i64>,
}

async fn select_genre(
    State(state): State<AppState>,
    Json(req): Json<GenreRequest>,
) -> Json<SessionView> {
    state.session.select_genre(req.genre_id).await;
    Json(state.session.view().await)
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
}

async fn search_input(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> StatusCode {
    state.session.search_input(req.query);
    StatusCode::ACCEPTED
}

async fn search_now(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<SessionView> {
    state.session.cancel_pending_search();
    state.session.search_now(&req.query).await;
    Json(state.session.view().await)
}

async fn load_more(State(state): State<AppState>) -> Json<SessionView> {
    state.session.load_more().await;
    Json(state.session.view().await)
}

async fn explore_popular(State(state): State<AppState>) -> Json<SessionView> {
    state.session.explore_popular().await;
    Json(state.session.view().await)
}

async fn genres(State(state): State<AppState>) -> Json<GenreState> {
    Json(state.session.genre_state())
}

async fn open_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<DetailState>) {
    let detail = state.session.open_movie(id).await;
    let status = if detail.error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(detail))
}

async fn current_movie(State(state): State<AppState>) -> Json<DetailState> {
    Json(state.session.current_movie().await)
}

async fn close_movie(State(state): State<AppState>, Path(id): Path<i64>) -> StatusCode {
    if state.session.close_movie(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn watchlist(State(state): State<AppState>) -> Json<Vec<Movie>> {
    Json(state.session.watchlist().await)
}

async fn toggle_watchlist(
    State(state): State<AppState>,
    Json(movie): Json<Movie>,
) -> (StatusCode, Json<Value>) {
    match state.session.toggle_watchlist(&movie).await {
        Ok(in_watchlist) => (
            StatusCode::OK,
            Json(json!({ "id": movie.id, "in_watchlist": in_watchlist })),
        ),
        Err(e) => {
            error!("Failed to update watch-later list: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": "Failed to update watch-later list" })),
            )
        }
    }
}

async fn toggle_watchlist_view(State(state): State<AppState>) -> Json<SessionView> {
    state.session.toggle_watchlist_view().await;
    Json(state.session.view().await)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
