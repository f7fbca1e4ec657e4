use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;

use crate::config::{Config, DEFAULT_LANGUAGE, DEFAULT_TMDB_BASE};
use crate::models::{Genre, Movie, MovieDetail, Page};

/// Remote movie catalog. Every call is an independent request: no retry, no
/// caching, and any failure comes back as a single error.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_popular(&self, page: u32) -> Result<Page>;
    async fn fetch_top_rated(&self, page: u32) -> Result<Page>;
    /// Results come back ordered by descending rating.
    async fn search(&self, query: &str, page: u32) -> Result<Page>;
    async fn fetch_by_genre(&self, genre_id: i64, page: u32) -> Result<Page>;
    async fn fetch_detail(&self, movie_id: i64) -> Result<MovieDetail>;
    async fn fetch_recommendations(&self, movie_id: i64) -> Result<Page>;
    async fn fetch_genres(&self) -> Result<Vec<Genre>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base(api_key, DEFAULT_TMDB_BASE, DEFAULT_LANGUAGE)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_base(
            config.tmdb_api_key.clone(),
            &config.tmdb_base_url,
            &config.language,
        )
    }

    pub fn with_base(api_key: impl Into<String>, base_url: &str, language: &str) -> Result<Self> {
        let user_agent = format!("cinematch/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("request to {} failed", redact(url)))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("reading body failed")?;
        if !status.is_success() {
            // The query string carries the API key; report the path only.
            return Err(anyhow!("{} -> {} {}", redact(url), status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn fetch_popular(&self, page: u32) -> Result<Page> {
        let url = self.url("/movie/popular", &[("page", page.to_string())]);
        self.get_json(&url).await
    }

    async fn fetch_top_rated(&self, page: u32) -> Result<Page> {
        let url = self.url("/movie/top_rated", &[("page", page.to_string())]);
        self.get_json(&url).await
    }

    async fn search(&self, query: &str, page: u32) -> Result<Page> {
        let url = self.url(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        );
        let mut data: Page = self.get_json(&url).await?;
        sort_by_rating(&mut data.results);
        Ok(data)
    }

    async fn fetch_by_genre(&self, genre_id: i64, page: u32) -> Result<Page> {
        let url = self.url(
            "/discover/movie",
            &[("with_genres", genre_id.to_string()), ("page", page.to_string())],
        );
        self.get_json(&url).await
    }

    async fn fetch_detail(&self, movie_id: i64) -> Result<MovieDetail> {
        let url = self.url(&format!("/movie/{movie_id}"), &[]);
        self.get_json(&url).await
    }

    async fn fetch_recommendations(&self, movie_id: i64) -> Result<Page> {
        let url = self.url(&format!("/movie/{movie_id}/recommendations"), &[]);
        self.get_json(&url).await
    }

    async fn fetch_genres(&self) -> Result<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            #[serde(default)]
            genres: Vec<Genre>,
        }

        let url = self.url("/genre/movie/list", &[]);
        let data: GenreList = self.get_json(&url).await?;
        Ok(data.genres)
    }
}

/// Highest rated first. `sort_by` is stable, so equal ratings keep the
/// server's relative order.
pub fn sort_by_rating(movies: &mut [Movie]) {
    movies.sort_by(|a, b| {
        b.vote_average
            .partial_cmp(&a.vote_average)
            .unwrap_or(Ordering::Equal)
    });
}

fn redact(url: &str) -> &str {
    url.split_once('?').map(|(path, _)| path).unwrap_or(url)
}
