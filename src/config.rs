use std::net::SocketAddr;

use anyhow::Context;

use crate::models::ExistingMoviePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_access_token: String,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub tmdb_region: String,
    pub database_url: String,
    pub tmdb_rps: u32,
    pub max_concurrent: usize,
    pub sync_max_pages: u32,
    pub sync_existing: ExistingMoviePolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let tmdb_access_token = std::env::var("TMDB_ACCESS_TOKEN").unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_language =
            std::env::var("TMDB_LANGUAGE").unwrap_or_else(|_| "en-US".to_string());
        let tmdb_region = std::env::var("TMDB_REGION")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|_| "US".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelscout.db?mode=rwc".to_string());

        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(20);

        let max_concurrent: usize =
            std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let sync_max_pages: u32 =
            std::env::var("SYNC_MAX_PAGES").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let sync_existing = match std::env::var("SYNC_EXISTING") {
            Ok(s) => ExistingMoviePolicy::parse(&s)
                .with_context(|| format!("SYNC_EXISTING must be keep or refresh, got {s:?}"))?,
            Err(_) => ExistingMoviePolicy::Keep,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_language,
            tmdb_region,
            database_url,
            tmdb_rps,
            max_concurrent,
            sync_max_pages: sync_max_pages.max(1),
            sync_existing,
        })
    }
}
