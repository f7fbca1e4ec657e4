use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";

/// Summary record as returned by every TMDB list endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default, with = "release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl Movie {
    pub fn poster_url(&self) -> Option<String> {
        image_url(POSTER_BASE, self.poster_path.as_deref())
    }

    pub fn backdrop_url(&self) -> Option<String> {
        image_url(BACKDROP_BASE, self.backdrop_path.as_deref())
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetail {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default, with = "release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Minutes; TMDB sends `null` or `0` when unknown.
    #[serde(default, deserialize_with = "null_as_default")]
    pub runtime: u32,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

impl MovieDetail {
    pub fn poster_url(&self) -> Option<String> {
        image_url(POSTER_BASE, self.poster_path.as_deref())
    }

    pub fn backdrop_url(&self) -> Option<String> {
        image_url(BACKDROP_BASE, self.backdrop_path.as_deref())
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.clone()).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// One fetched batch of movies plus the server's pagination totals.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Page {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty()).map(|p| format!("{base}{p}"))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// TMDB encodes an unknown release date as `""`; stored snapshots use the same
/// `YYYY-MM-DD` shape so they read back through the same path.
mod release_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, FORMAT).ok()))
    }
}
