use serde::{Deserialize, Serialize};

use crate::entities::movie;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// Listings the sync routine knows how to mirror.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncCategory {
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    Trending,
    Regional { language: String },
}

impl SyncCategory {
    pub fn parse(name: &str, language: Option<&str>) -> Option<Self> {
        match name {
            "popular" => Some(Self::Popular),
            "top_rated" => Some(Self::TopRated),
            "now_playing" => Some(Self::NowPlaying),
            "upcoming" => Some(Self::Upcoming),
            "trending" => Some(Self::Trending),
            "regional" => {
                let language = language?.trim().to_ascii_lowercase();
                let valid =
                    language.len() == 2 && language.bytes().all(|b| b.is_ascii_alphabetic());
                valid.then_some(Self::Regional { language })
            },
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Popular => "popular",
            Self::TopRated => "top_rated",
            Self::NowPlaying => "now_playing",
            Self::Upcoming => "upcoming",
            Self::Trending => "trending",
            Self::Regional { .. } => "regional",
        }
    }
}

/// What a sync does with a listing entry that is already in the catalog.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExistingMoviePolicy {
    /// Leave the resident row untouched. Rows are only ever written once.
    #[default]
    Keep,
    /// Re-fetch details and overwrite the resident row.
    Refresh,
}

impl ExistingMoviePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "refresh" => Some(Self::Refresh),
            _ => None,
        }
    }
}

/// One page of an external listing, reduced to what the sync needs.
#[derive(Clone, Debug)]
pub struct ListingPage {
    pub ids: Vec<i32>,
    pub total_pages: u32,
    pub total_results: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovieDetails {
    pub tmdb_id: i32,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: f64,
    pub vote_count: i32,
    pub genres: Vec<Genre>,
    pub original_language: String,
    pub adult: bool,
    pub popularity: f64,
    pub certification: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MoviePage {
    pub movies: Vec<movie::Model>,
    pub total: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyncOutcome {
    pub movies: Vec<movie::Model>,
    pub total: u64,
    pub inserted: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedMovie {
    pub movie: movie::Model,
    pub rating: f64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RatingPage {
    pub ratings: Vec<RatedMovie>,
    pub total: u64,
}

/// Identity forwarded by the authenticating proxy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub age_rating: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: f64,
}
