#![allow(dead_code)]

use anyhow::anyhow;
use cinematch::models::{Genre, Movie, MovieDetail, Page};
use cinematch::tmdb::{sort_by_rating, CatalogApi};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Popular(u32),
    TopRated(u32),
    Search(String, u32),
    Genre(i64, u32),
    Detail(i64),
    Recommendations(i64),
    Genres,
}

/// Deterministic catalog: page `n` of every feed holds three movies whose ids
/// encode the feed and page, so tests can tell results apart.
pub struct FakeCatalog {
    total_pages: u32,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Call>>,
    gates: Mutex<HashMap<Call, Arc<Notify>>>,
    search_results: Mutex<HashMap<String, Vec<Movie>>>,
}

impl FakeCatalog {
    pub fn new(total_pages: u32) -> Arc<Self> {
        Arc::new(Self {
            total_pages,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            search_results: Mutex::new(HashMap::new()),
        })
    }

    pub fn fail(&self, call: Call) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn recover(&self, call: &Call) {
        self.failing.lock().unwrap().remove(call);
    }

    /// The call blocks until the returned handle is notified.
    pub fn hold(&self, call: Call) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(call, gate.clone());
        gate
    }

    pub fn set_search_results(&self, query: &str, results: Vec<Movie>) {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), results);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub async fn wait_for(&self, call: &Call) {
        for _ in 0..1000 {
            if self.calls.lock().unwrap().contains(call) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("call {:?} was never issued", call);
    }

    async fn respond(&self, call: Call) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        let gate = self.gates.lock().unwrap().get(&call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(&call) {
            return Err(anyhow!("fake failure for {:?}", call));
        }
        Ok(())
    }

    fn page(&self, base: i64, page: u32) -> Page {
        let results = (0..3)
            .map(|i| movie(base + i64::from(page) * 10 + i, 5.0 + i as f64))
            .collect();
        Page {
            page,
            results,
            total_pages: self.total_pages,
            total_results: self.total_pages * 3,
        }
    }
}

pub fn movie(id: i64, rating: f64) -> Movie {
    Movie {
        id,
        title: format!("Movie {id}"),
        overview: format!("Overview {id}"),
        poster_path: Some(format!("/poster{id}.jpg")),
        backdrop_path: None,
        vote_average: rating,
        release_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
        genre_ids: vec![28],
    }
}

pub fn ids(movies: &[Movie]) -> Vec<i64> {
    movies.iter().map(|m| m.id).collect()
}

pub fn popular_ids(page: u32) -> Vec<i64> {
    (0..3).map(|i| 1000 + i64::from(page) * 10 + i).collect()
}

pub fn genre_ids(genre: i64, page: u32) -> Vec<i64> {
    (0..3)
        .map(|i| 100_000 + genre * 1000 + i64::from(page) * 10 + i)
        .collect()
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn fetch_popular(&self, page: u32) -> anyhow::Result<Page> {
        self.respond(Call::Popular(page)).await?;
        Ok(self.page(1000, page))
    }

    async fn fetch_top_rated(&self, page: u32) -> anyhow::Result<Page> {
        self.respond(Call::TopRated(page)).await?;
        Ok(self.page(2000, page))
    }

    async fn search(&self, query: &str, page: u32) -> anyhow::Result<Page> {
        self.respond(Call::Search(query.to_string(), page)).await?;
        let custom = self.search_results.lock().unwrap().get(query).cloned();
        let mut data = match custom {
            Some(results) => Page {
                page,
                total_results: results.len() as u32,
                results,
                total_pages: 1,
            },
            None => self.page(3000, page),
        };
        sort_by_rating(&mut data.results);
        Ok(data)
    }

    async fn fetch_by_genre(&self, genre_id: i64, page: u32) -> anyhow::Result<Page> {
        self.respond(Call::Genre(genre_id, page)).await?;
        Ok(self.page(100_000 + genre_id * 1000, page))
    }

    async fn fetch_detail(&self, movie_id: i64) -> anyhow::Result<MovieDetail> {
        self.respond(Call::Detail(movie_id)).await?;
        Ok(MovieDetail {
            id: movie_id,
            title: format!("Movie {movie_id}"),
            overview: "Detailed overview".to_string(),
            poster_path: None,
            backdrop_path: None,
            vote_average: 7.5,
            release_date: None,
            genres: vec![Genre {
                id: 28,
                name: "Action".to_string(),
            }],
            runtime: 120,
            tagline: Some("A tagline".to_string()),
            status: "Released".to_string(),
        })
    }

    async fn fetch_recommendations(&self, movie_id: i64) -> anyhow::Result<Page> {
        self.respond(Call::Recommendations(movie_id)).await?;
        Ok(self.page(9000 + movie_id * 100, 1))
    }

    async fn fetch_genres(&self) -> anyhow::Result<Vec<Genre>> {
        self.respond(Call::Genres).await?;
        Ok(vec![
            Genre {
                id: 28,
                name: "Action".to_string(),
            },
            Genre {
                id: 35,
                name: "Comedy".to_string(),
            },
        ])
    }
}
