use std::collections::HashSet;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info, warn};

use crate::{
    catalog::Catalog,
    entities::movie,
    error::{AppError, AppResult},
    models::{ExistingMoviePolicy, SyncCategory, SyncOutcome},
    tmdb::MovieSource,
};

#[derive(Clone, Copy, Debug)]
pub struct SyncOptions {
    pub pages: u32,
    pub existing: ExistingMoviePolicy,
    pub max_concurrent: usize,
}

/// Mirrors the first `pages` pages of an external listing into the catalog.
///
/// Listing entries that are already resident are handled per
/// [`ExistingMoviePolicy`]; entries the source cannot describe are skipped.
/// Any other failure aborts the whole sync.
pub async fn sync_listing(
    catalog: &Catalog,
    source: &dyn MovieSource,
    category: &SyncCategory,
    opts: SyncOptions,
) -> AppResult<SyncOutcome> {
    let first = source.listing(category, 1).await?;
    let total = first.total_results;
    let last_page = opts.pages.max(1).min(first.total_pages.max(1));

    debug!(category = category.name(), last_page = last_page, total = total, "syncing listing");

    let mut seen = HashSet::new();
    let mut ids: Vec<i32> = first.ids.into_iter().filter(|id| seen.insert(*id)).collect();
    for page in 2..=last_page {
        let listing = source.listing(category, page).await?;
        ids.extend(listing.ids.into_iter().filter(|id| seen.insert(*id)));
    }

    let resolved: Vec<Option<(movie::Model, bool)>> = stream::iter(ids)
        .map(|tmdb_id| sync_one(catalog, source, tmdb_id, opts.existing))
        .buffered(opts.max_concurrent.max(1))
        .try_collect()
        .await?;

    let mut movies = Vec::with_capacity(resolved.len());
    let mut inserted = 0;
    for (movie, written) in resolved.into_iter().flatten() {
        inserted += usize::from(written);
        movies.push(movie);
    }

    info!(
        category = category.name(),
        resident = movies.len(),
        inserted = inserted,
        "listing synced"
    );

    Ok(SyncOutcome { movies, total, inserted })
}

/// Returns the resident row and whether this call inserted it.
async fn sync_one(
    catalog: &Catalog,
    source: &dyn MovieSource,
    tmdb_id: i32,
    existing: ExistingMoviePolicy,
) -> AppResult<Option<(movie::Model, bool)>> {
    let resident = catalog.get(tmdb_id).await?;
    if let (Some(movie), ExistingMoviePolicy::Keep) = (&resident, existing) {
        return Ok(Some((movie.clone(), false)));
    }

    let Some(details) = source.movie_details(tmdb_id).await? else {
        warn!(tmdb_id = tmdb_id, "listed movie has no details, skipping");
        return Ok(resident.map(|m| (m, false)));
    };

    let inserted = match resident {
        Some(_) => {
            debug!(tmdb_id = tmdb_id, "refreshing resident movie");
            catalog.upsert(&details).await?;
            false
        },
        None => catalog.insert_if_absent(&details).await?,
    };

    let movie = catalog
        .get(tmdb_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("movie {tmdb_id} missing after insert"))?;
    Ok(Some((movie, inserted)))
}

/// Get-or-fetch for a single movie. `None` when neither the catalog nor the
/// source knows the id.
pub async fn resolve_movie(
    catalog: &Catalog,
    source: &dyn MovieSource,
    tmdb_id: i32,
) -> AppResult<Option<movie::Model>> {
    let synced = sync_one(catalog, source, tmdb_id, ExistingMoviePolicy::Keep).await?;
    Ok(synced.map(|(movie, _)| movie))
}

/// Like [`resolve_movie`] but unknown ids are an error.
pub async fn require_movie(
    catalog: &Catalog,
    source: &dyn MovieSource,
    tmdb_id: i32,
) -> AppResult<movie::Model> {
    resolve_movie(catalog, source, tmdb_id).await?.ok_or(AppError::NotFound)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;

    use crate::{
        catalog::fixtures,
        error::AppResult,
        models::{ListingPage, MovieDetails, SyncCategory},
        tmdb::MovieSource,
    };

    /// In-memory source: listings are fixed id pages, details are generated.
    #[derive(Default)]
    pub struct FakeSource {
        pub pages: Vec<Vec<i32>>,
        pub unknown: Vec<i32>,
        pub failing: Vec<i32>,
        pub trailers: HashMap<i32, String>,
        pub titles: Mutex<HashMap<i32, String>>,
        pub detail_calls: AtomicUsize,
        pub listing_calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn with_pages(pages: Vec<Vec<i32>>) -> Self {
            Self { pages, ..Default::default() }
        }

        pub fn rename(&self, tmdb_id: i32, title: &str) {
            self.titles.lock().unwrap().insert(tmdb_id, title.to_string());
        }

        pub fn detail_calls(&self) -> usize {
            self.detail_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MovieSource for FakeSource {
        async fn listing(&self, _category: &SyncCategory, page: u32) -> AppResult<ListingPage> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            let ids = self.pages.get(page as usize - 1).cloned().unwrap_or_default();
            Ok(ListingPage {
                ids,
                total_pages: self.pages.len() as u32,
                total_results: self.pages.iter().map(Vec::len).sum::<usize>() as u64,
            })
        }

        async fn movie_details(&self, tmdb_id: i32) -> AppResult<Option<MovieDetails>> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&tmdb_id) {
                return Err(anyhow::anyhow!("upstream exploded").into());
            }
            if self.unknown.contains(&tmdb_id) {
                return Ok(None);
            }
            let title = self
                .titles
                .lock()
                .unwrap()
                .get(&tmdb_id)
                .cloned()
                .unwrap_or_else(|| format!("Movie {tmdb_id}"));
            Ok(Some(fixtures::details(tmdb_id, &title)))
        }

        async fn trailer_url(&self, tmdb_id: i32) -> AppResult<Option<String>> {
            Ok(self.trailers.get(&tmdb_id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use sea_orm::{EntityTrait, PaginatorTrait};

    use super::{fake::FakeSource, *};
    use crate::db;

    fn opts(pages: u32) -> SyncOptions {
        SyncOptions { pages, existing: ExistingMoviePolicy::Keep, max_concurrent: 3 }
    }

    async fn movie_count(catalog: &Catalog) -> u64 {
        movie::Entity::find().count(catalog.db()).await.unwrap()
    }

    #[tokio::test]
    async fn inserts_missing_movies_in_listing_order() {
        let catalog = Catalog::new(db::memory().await);
        let source = FakeSource::with_pages(vec![vec![3, 1, 2], vec![2, 5]]);

        let out = sync_listing(&catalog, &source, &SyncCategory::Popular, opts(5)).await.unwrap();
        assert_eq!(out.movies.iter().map(|m| m.tmdb_id).collect::<Vec<_>>(), vec![3, 1, 2, 5]);
        assert_eq!(out.inserted, 4);
        assert_eq!(out.total, 5);
        assert_eq!(movie_count(&catalog).await, 4);
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resyncing_resident_listing_inserts_nothing() {
        let catalog = Catalog::new(db::memory().await);
        let source = FakeSource::with_pages(vec![vec![1, 2, 3]]);

        sync_listing(&catalog, &source, &SyncCategory::Trending, opts(1)).await.unwrap();
        assert_eq!(source.detail_calls(), 3);

        source.rename(2, "Renamed upstream");
        let again = sync_listing(&catalog, &source, &SyncCategory::Trending, opts(1)).await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.movies.len(), 3);
        assert_eq!(again.movies[1].title, "Movie 2");
        assert_eq!(source.detail_calls(), 3);
        assert_eq!(movie_count(&catalog).await, 3);
    }

    #[tokio::test]
    async fn refresh_policy_overwrites_resident_rows() {
        let catalog = Catalog::new(db::memory().await);
        let source = FakeSource::with_pages(vec![vec![1, 2]]);
        sync_listing(&catalog, &source, &SyncCategory::Popular, opts(1)).await.unwrap();

        source.rename(2, "Renamed upstream");
        let refresh = SyncOptions { existing: ExistingMoviePolicy::Refresh, ..opts(1) };
        let out = sync_listing(&catalog, &source, &SyncCategory::Popular, refresh).await.unwrap();
        assert_eq!(out.inserted, 0);
        assert_eq!(out.movies[1].title, "Renamed upstream");
        assert_eq!(movie_count(&catalog).await, 2);
    }

    #[tokio::test]
    async fn page_count_is_capped_by_listing() {
        let catalog = Catalog::new(db::memory().await);
        let source = FakeSource::with_pages(vec![vec![1], vec![2], vec![3]]);

        let out = sync_listing(&catalog, &source, &SyncCategory::Upcoming, opts(2)).await.unwrap();
        assert_eq!(out.movies.len(), 2);
        assert_eq!(out.total, 3);

        let out = sync_listing(&catalog, &source, &SyncCategory::Upcoming, opts(10)).await.unwrap();
        assert_eq!(out.movies.len(), 3);
        assert_eq!(out.inserted, 1);
    }

    #[tokio::test]
    async fn skips_movies_without_details() {
        let catalog = Catalog::new(db::memory().await);
        let mut source = FakeSource::with_pages(vec![vec![1, 2, 3]]);
        source.unknown = vec![2];

        let out = sync_listing(&catalog, &source, &SyncCategory::Popular, opts(1)).await.unwrap();
        assert_eq!(out.movies.iter().map(|m| m.tmdb_id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn any_fetch_failure_aborts_the_sync() {
        let catalog = Catalog::new(db::memory().await);
        let mut source = FakeSource::with_pages(vec![vec![1, 2, 3]]);
        source.failing = vec![2];

        let err = sync_listing(&catalog, &source, &SyncCategory::Popular, opts(1)).await;
        assert!(matches!(err, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn resolve_fetches_once_then_serves_locally() {
        let catalog = Catalog::new(db::memory().await);
        let mut source = FakeSource::default();
        source.unknown = vec![404];

        let movie = resolve_movie(&catalog, &source, 42).await.unwrap().unwrap();
        assert_eq!(movie.title, "Movie 42");
        resolve_movie(&catalog, &source, 42).await.unwrap().unwrap();
        assert_eq!(source.detail_calls(), 1);

        assert_eq!(resolve_movie(&catalog, &source, 404).await.unwrap(), None);
        assert!(matches!(require_movie(&catalog, &source, 404).await, Err(AppError::NotFound)));
    }
}
