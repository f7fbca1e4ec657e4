//! Call one catalog endpoint and print the decoded response.
//! Usage:
//!   cargo run --bin catalog_probe -- popular [page]
//!   cargo run --bin catalog_probe -- top-rated [page]
//!   cargo run --bin catalog_probe -- search <query> [page]
//!   cargo run --bin catalog_probe -- genre <genre_id> [page]
//!   cargo run --bin catalog_probe -- detail <movie_id>
//!   cargo run --bin catalog_probe -- recommendations <movie_id>
//!   cargo run --bin catalog_probe -- genres
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cinematch::config::Config;
use cinematch::tmdb::{CatalogApi, TmdbClient};
use dotenvy::dotenv;
use serde_json::Value;
use std::env;

fn page_arg(arg: Option<&String>) -> Result<u32> {
    match arg {
        Some(raw) => raw.parse().context("page must be a positive number"),
        None => Ok(1),
    }
}

fn id_arg(arg: Option<&String>) -> Result<i64> {
    arg.ok_or_else(|| anyhow!("missing id"))?
        .parse()
        .context("id must be a number")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args
        .first()
        .ok_or_else(|| anyhow!("usage: catalog_probe <command> [args]"))?;

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;

    let output: Value = match command.as_str() {
        "popular" => serde_json::to_value(client.fetch_popular(page_arg(args.get(1))?).await?)?,
        "top-rated" => {
            serde_json::to_value(client.fetch_top_rated(page_arg(args.get(1))?).await?)?
        }
        "search" => {
            let query = args.get(1).ok_or_else(|| anyhow!("missing query"))?;
            serde_json::to_value(client.search(query, page_arg(args.get(2))?).await?)?
        }
        "genre" => {
            let id = id_arg(args.get(1))?;
            serde_json::to_value(client.fetch_by_genre(id, page_arg(args.get(2))?).await?)?
        }
        "detail" => serde_json::to_value(client.fetch_detail(id_arg(args.get(1))?).await?)?,
        "recommendations" => {
            serde_json::to_value(client.fetch_recommendations(id_arg(args.get(1))?).await?)?
        }
        "genres" => serde_json::to_value(client.fetch_genres().await?)?,
        other => return Err(anyhow!("unknown command '{}'", other)),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
