use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::AppResult,
    models::{Genre, ListingPage, MovieDetails, SyncCategory},
};

/// The external catalog the local movie table mirrors.
#[async_trait]
pub trait MovieSource: Send + Sync {
    async fn listing(&self, category: &SyncCategory, page: u32) -> AppResult<ListingPage>;

    /// `None` when the source does not know the id.
    async fn movie_details(&self, tmdb_id: i32) -> AppResult<Option<MovieDetails>>;

    async fn trailer_url(&self, tmdb_id: i32) -> AppResult<Option<String>>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    language: String,
    region: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        base_url: String,
        language: String,
        region: String,
        rps: u32,
    ) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("no TMDB_ACCESS_TOKEN provided, TMDB requests will be rejected");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, access_token, base_url, language, region, limiter }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> AppResult<reqwest::Response> {
        self.limiter.until_ready().await;
        debug!(path = %path, "tmdb request");
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.access_token)
            .query(&[("language", self.language.as_str())])
            .query(query)
            .send()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl MovieSource for TmdbClient {
    async fn listing(&self, category: &SyncCategory, page: u32) -> AppResult<ListingPage> {
        let page = page.to_string();
        let path = match category {
            SyncCategory::Popular => "movie/popular",
            SyncCategory::TopRated => "movie/top_rated",
            SyncCategory::NowPlaying => "movie/now_playing",
            SyncCategory::Upcoming => "movie/upcoming",
            SyncCategory::Trending => "trending/movie/week",
            SyncCategory::Regional { .. } => "discover/movie",
        };

        let mut query = vec![("page", page.as_str())];
        match category {
            SyncCategory::Regional { language } => {
                query.push(("with_original_language", language.as_str()));
                query.push(("sort_by", "popularity.desc"));
            },
            SyncCategory::Trending => {},
            _ => query.push(("region", self.region.as_str())),
        }

        debug!(category = category.name(), page = %page, "fetching listing page");
        let resp: ListingResponse = self.get(path, &query).await?.error_for_status()?.json().await?;
        Ok(ListingPage {
            ids: resp.results.into_iter().map(|m| m.id).collect(),
            total_pages: resp.total_pages,
            total_results: resp.total_results,
        })
    }

    async fn movie_details(&self, tmdb_id: i32) -> AppResult<Option<MovieDetails>> {
        let resp = self
            .get(&format!("movie/{tmdb_id}"), &[("append_to_response", "release_dates")])
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(tmdb_id = tmdb_id, "movie unknown to TMDB");
            return Ok(None);
        }

        let details: DetailsResponse = resp.error_for_status()?.json().await?;
        Ok(Some(details.into_movie(&self.region)))
    }

    async fn trailer_url(&self, tmdb_id: i32) -> AppResult<Option<String>> {
        let resp = self.get(&format!("movie/{tmdb_id}/videos"), &[]).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let videos: VideosResponse = resp.error_for_status()?.json().await?;
        Ok(pick_trailer(&videos.results))
    }
}

fn pick_trailer(videos: &[Video]) -> Option<String> {
    let trailers = || videos.iter().filter(|v| v.site == "YouTube" && v.kind == "Trailer");
    trailers()
        .find(|v| v.official)
        .or_else(|| trailers().next())
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    results: Vec<ListingMovie>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u64,
}

#[derive(Debug, Deserialize)]
struct ListingMovie {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    id: i32,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    runtime: Option<i32>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: i32,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    original_language: String,
    #[serde(default)]
    adult: bool,
    #[serde(default)]
    popularity: f64,
    release_dates: Option<ReleaseDatesResponse>,
}

impl DetailsResponse {
    fn into_movie(self, region: &str) -> MovieDetails {
        let certification = self.release_dates.as_ref().and_then(|rd| rd.certification(region));
        MovieDetails {
            tmdb_id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default(),
            poster_path: non_empty(self.poster_path),
            backdrop_path: non_empty(self.backdrop_path),
            release_date: non_empty(self.release_date),
            runtime: self.runtime.filter(|r| *r > 0),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            genres: self.genres,
            original_language: self.original_language,
            adult: self.adult,
            popularity: self.popularity,
            certification,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|s| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    })
}

#[derive(Debug, Deserialize)]
struct ReleaseDatesResponse {
    results: Vec<ReleaseDatesCountry>,
}

impl ReleaseDatesResponse {
    fn certification(&self, region: &str) -> Option<String> {
        self.results
            .iter()
            .find(|c| c.iso_3166_1 == region)?
            .release_dates
            .iter()
            .find_map(|rd| non_empty(rd.certification.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseDatesCountry {
    iso_3166_1: String,
    release_dates: Vec<ReleaseDateEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDateEntry {
    certification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    official: bool,
}
