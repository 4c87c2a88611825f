use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, LikeExpr, OnConflict},
};

use crate::{
    entities::movie,
    error::AppResult,
    models::{MovieDetails, MoviePage},
    query::{MovieFilter, PageParams},
};

pub const DEFAULT_TRENDING_LIMIT: u64 = 10;
pub const MAX_TRENDING_LIMIT: u64 = 50;

/// The local movie table, populated lazily from the external source.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn get(&self, tmdb_id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(tmdb_id).one(&self.db).await?)
    }

    /// Inserts the movie unless a row with the same id already exists.
    /// Returns whether a row was written.
    pub async fn insert_if_absent(&self, details: &MovieDetails) -> AppResult<bool> {
        let inserted = movie::Entity::insert(active_model(details, now_sec()))
            .on_conflict(OnConflict::column(movie::Column::TmdbId).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    /// Inserts the movie or overwrites every external field of the resident row.
    pub async fn upsert(&self, details: &MovieDetails) -> AppResult<()> {
        movie::Entity::insert(active_model(details, now_sec()))
            .on_conflict(
                OnConflict::column(movie::Column::TmdbId)
                    .update_columns([
                        movie::Column::Title,
                        movie::Column::Overview,
                        movie::Column::PosterPath,
                        movie::Column::BackdropPath,
                        movie::Column::ReleaseDate,
                        movie::Column::Runtime,
                        movie::Column::VoteAverage,
                        movie::Column::VoteCount,
                        movie::Column::Genres,
                        movie::Column::GenreIds,
                        movie::Column::OriginalLanguage,
                        movie::Column::Adult,
                        movie::Column::Popularity,
                        movie::Column::Certification,
                        movie::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// One page of filtered movies plus the unpaginated count of the same filter.
    pub async fn list(&self, filter: &MovieFilter) -> AppResult<MoviePage> {
        let rows = filter.page_select().all(&self.db);
        let total = filter.select().count(&self.db);
        let (movies, total) = tokio::try_join!(rows, total)?;
        Ok(MoviePage { movies, total })
    }

    pub async fn search(&self, q: &str, page: &PageParams) -> AppResult<MoviePage> {
        let title = Expr::col((movie::Entity, movie::Column::Title));
        let select = movie::Entity::find().filter(title.like(substring_pattern(q)));
        let rows = page
            .apply(select.clone())
            .order_by_desc(movie::Column::Popularity)
            .order_by_asc(movie::Column::TmdbId)
            .all(&self.db);
        let total = select.count(&self.db);
        let (movies, total) = tokio::try_join!(rows, total)?;
        Ok(MoviePage { movies, total })
    }

    pub async fn trending(&self, limit: Option<u64>) -> AppResult<Vec<movie::Model>> {
        let limit = limit.unwrap_or(DEFAULT_TRENDING_LIMIT).clamp(1, MAX_TRENDING_LIMIT);
        Ok(movie::Entity::find()
            .order_by_desc(movie::Column::Popularity)
            .order_by_asc(movie::Column::TmdbId)
            .limit(limit)
            .all(&self.db)
            .await?)
    }
}

fn active_model(details: &MovieDetails, now: i64) -> movie::ActiveModel {
    let genres = movie::Genres(details.genres.clone());
    movie::ActiveModel {
        tmdb_id: Set(details.tmdb_id),
        title: Set(details.title.clone()),
        overview: Set(details.overview.clone()),
        poster_path: Set(details.poster_path.clone()),
        backdrop_path: Set(details.backdrop_path.clone()),
        release_date: Set(details.release_date.clone()),
        runtime: Set(details.runtime),
        vote_average: Set(details.vote_average),
        vote_count: Set(details.vote_count),
        genre_ids: Set(genres.tokens()),
        genres: Set(genres),
        original_language: Set(details.original_language.to_ascii_lowercase()),
        adult: Set(details.adult),
        popularity: Set(details.popularity),
        certification: Set(details.certification.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// `LIKE` pattern matching `q` literally anywhere in the value.
fn substring_pattern(q: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '!') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('!')
}

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
