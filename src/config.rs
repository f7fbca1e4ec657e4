use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_BIND: &str = "0.0.0.0:3147";
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub language: String,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub search_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("TMDB_API_KEY not set")?;
        let tmdb_base_url = optional("TMDB_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let language = optional("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let data_dir = optional("CINEMATCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let bind_addr = parse_var("CINEMATCH_BIND", DEFAULT_BIND)?;
        let debounce_ms: u64 = parse_var(
            "CINEMATCH_SEARCH_DEBOUNCE_MS",
            &DEFAULT_SEARCH_DEBOUNCE_MS.to_string(),
        )?;

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            language,
            data_dir,
            bind_addr,
            search_debounce: Duration::from_millis(debounce_ms),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = optional(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))
}
