use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

use crate::{
    catalog::now_sec,
    entities::{favorite, movie, rating, user, user_preferences, watchlist},
    error::{AppError, AppResult},
    models::{Identity, MoviePage, PreferencesUpdate, RatedMovie, RatingPage},
    query::PageParams,
};

/// Per-user movie lists that share the (user, movie) join shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MovieList {
    Watchlist,
    Favorites,
}

/// Everything a signed-in user owns: lists, ratings and preferences.
#[derive(Clone)]
pub struct Library {
    db: DatabaseConnection,
}

impl Library {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn upsert_user(&self, identity: &Identity) -> AppResult<user::Model> {
        let now = now_sec();
        let model = user::ActiveModel {
            id: Set(identity.id.clone()),
            email: Set(identity.email.clone()),
            first_name: Set(identity.first_name.clone()),
            last_name: Set(identity.last_name.clone()),
            profile_image_url: Set(identity.profile_image_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Email,
                        user::Column::FirstName,
                        user::Column::LastName,
                        user::Column::ProfileImageUrl,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        user::Entity::find_by_id(identity.id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} missing after upsert", identity.id).into())
    }

    /// Adding a movie that is already on the list is a no-op.
    pub async fn add(&self, list: MovieList, user_id: &str, movie_id: i32) -> AppResult<()> {
        let now = now_sec();
        match list {
            MovieList::Watchlist => {
                let model = watchlist::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    movie_id: Set(movie_id),
                    created_at: Set(now),
                };
                watchlist::Entity::insert(model)
                    .on_conflict(
                        OnConflict::columns([watchlist::Column::UserId, watchlist::Column::MovieId])
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(&self.db)
                    .await?;
            },
            MovieList::Favorites => {
                let model = favorite::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    movie_id: Set(movie_id),
                    created_at: Set(now),
                };
                favorite::Entity::insert(model)
                    .on_conflict(
                        OnConflict::columns([favorite::Column::UserId, favorite::Column::MovieId])
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(&self.db)
                    .await?;
            },
        }
        Ok(())
    }

    /// Removing an absent entry succeeds.
    pub async fn remove(&self, list: MovieList, user_id: &str, movie_id: i32) -> AppResult<()> {
        match list {
            MovieList::Watchlist => {
                watchlist::Entity::delete_by_id((user_id.to_string(), movie_id))
                    .exec(&self.db)
                    .await?;
            },
            MovieList::Favorites => {
                favorite::Entity::delete_by_id((user_id.to_string(), movie_id))
                    .exec(&self.db)
                    .await?;
            },
        }
        Ok(())
    }

    pub async fn contains(&self, list: MovieList, user_id: &str, movie_id: i32) -> AppResult<bool> {
        let key = (user_id.to_string(), movie_id);
        let found = match list {
            MovieList::Watchlist => watchlist::Entity::find_by_id(key).count(&self.db).await?,
            MovieList::Favorites => favorite::Entity::find_by_id(key).count(&self.db).await?,
        };
        Ok(found > 0)
    }

    /// Movies on the list, most recently added first.
    pub async fn list(
        &self,
        list: MovieList,
        user_id: &str,
        page: &PageParams,
    ) -> AppResult<MoviePage> {
        let select = match list {
            MovieList::Watchlist => movie::Entity::find()
                .inner_join(watchlist::Entity)
                .filter(watchlist::Column::UserId.eq(user_id))
                .order_by_desc(watchlist::Column::CreatedAt),
            MovieList::Favorites => movie::Entity::find()
                .inner_join(favorite::Entity)
                .filter(favorite::Column::UserId.eq(user_id))
                .order_by_desc(favorite::Column::CreatedAt),
        }
        .order_by_asc(movie::Column::TmdbId);

        let rows = page.apply(select.clone()).all(&self.db);
        let total = select.count(&self.db);
        let (movies, total) = tokio::try_join!(rows, total)?;
        Ok(MoviePage { movies, total })
    }

    /// Sets the user's rating, replacing any previous value.
    pub async fn rate(&self, user_id: &str, movie_id: i32, value: f64) -> AppResult<()> {
        validate_rating(value)?;
        let now = now_sec();
        let model = rating::ActiveModel {
            user_id: Set(user_id.to_string()),
            movie_id: Set(movie_id),
            rating: Set(value),
            created_at: Set(now),
            updated_at: Set(now),
        };

        rating::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::UserId, rating::Column::MovieId])
                    .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    pub async fn rating(&self, user_id: &str, movie_id: i32) -> AppResult<Option<f64>> {
        let key = (user_id.to_string(), movie_id);
        let found = rating::Entity::find_by_id(key).one(&self.db).await?;
        Ok(found.map(|r| r.rating))
    }

    pub async fn unrate(&self, user_id: &str, movie_id: i32) -> AppResult<()> {
        rating::Entity::delete_by_id((user_id.to_string(), movie_id)).exec(&self.db).await?;
        Ok(())
    }

    /// Rated movies, most recently rated first.
    pub async fn ratings(&self, user_id: &str, page: &PageParams) -> AppResult<RatingPage> {
        let select = rating::Entity::find()
            .filter(rating::Column::UserId.eq(user_id))
            .order_by_desc(rating::Column::UpdatedAt)
            .order_by_asc(rating::Column::MovieId);

        let rows = page.apply(select.clone()).find_also_related(movie::Entity).all(&self.db);
        let total = select.count(&self.db);
        let (rows, total) = tokio::try_join!(rows, total)?;

        let ratings = rows
            .into_iter()
            .filter_map(|(r, movie)| {
                movie.map(|movie| RatedMovie { movie, rating: r.rating, updated_at: r.updated_at })
            })
            .collect();
        Ok(RatingPage { ratings, total })
    }

    pub async fn preferences(&self, user_id: &str) -> AppResult<Option<user_preferences::Model>> {
        Ok(user_preferences::Entity::find_by_id(user_id.to_string()).one(&self.db).await?)
    }

    pub async fn set_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> AppResult<user_preferences::Model> {
        let languages = update
            .languages
            .iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        let mut genre_ids = update.genre_ids;
        genre_ids.sort_unstable();
        genre_ids.dedup();

        let model = user_preferences::ActiveModel {
            user_id: Set(user_id.to_string()),
            genre_ids: Set(user_preferences::GenreIdList(genre_ids)),
            languages: Set(user_preferences::LanguageList(languages)),
            age_rating: Set(update.age_rating.filter(|a| !a.trim().is_empty())),
            updated_at: Set(now_sec()),
        };

        user_preferences::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user_preferences::Column::UserId)
                    .update_columns([
                        user_preferences::Column::GenreIds,
                        user_preferences::Column::Languages,
                        user_preferences::Column::AgeRating,
                        user_preferences::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        self.preferences(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("preferences for {user_id} missing after upsert").into())
    }
}

/// Ratings run from 0.5 to 10 in half-point steps.
fn validate_rating(value: f64) -> AppResult<()> {
    let doubled = value * 2.0;
    if !(0.5..=10.0).contains(&value) || doubled.fract() != 0.0 {
        return Err(AppError::bad_request("rating must be between 0.5 and 10 in steps of 0.5"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, IntoActiveModel};

    use super::*;
    use crate::{
        catalog::{Catalog, fixtures::details},
        db,
    };

    async fn setup() -> Library {
        let db = db::memory().await;
        let catalog = Catalog::new(db.clone());
        for id in 1..=4 {
            catalog.insert_if_absent(&details(id, &format!("Movie {id}"))).await.unwrap();
        }
        Library::new(db)
    }

    fn identity(id: &str) -> Identity {
        let email = Some(format!("{id}@example.com"));
        Identity { id: id.to_string(), email, ..Default::default() }
    }

    async fn backdate(lib: &Library, list: MovieList, user_id: &str, movie_id: i32, at: i64) {
        let key = (user_id.to_string(), movie_id);
        match list {
            MovieList::Watchlist => {
                let mut row = watchlist::Entity::find_by_id(key)
                    .one(&lib.db)
                    .await
                    .unwrap()
                    .unwrap()
                    .into_active_model();
                row.created_at = Set(at);
                row.update(&lib.db).await.unwrap();
            },
            MovieList::Favorites => {
                let mut row = favorite::Entity::find_by_id(key)
                    .one(&lib.db)
                    .await
                    .unwrap()
                    .unwrap()
                    .into_active_model();
                row.created_at = Set(at);
                row.update(&lib.db).await.unwrap();
            },
        }
    }

    #[tokio::test]
    async fn upserts_users() {
        let lib = setup().await;
        let first = lib.upsert_user(&identity("u1")).await.unwrap();
        assert_eq!(first.email.as_deref(), Some("u1@example.com"));

        let mut changed = identity("u1");
        changed.email = Some("new@example.com".to_string());
        let second = lib.upsert_user(&changed).await.unwrap();
        assert_eq!(second.email.as_deref(), Some("new@example.com"));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(user::Entity::find().count(&lib.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn adding_twice_leaves_one_row() {
        let lib = setup().await;
        for list in [MovieList::Watchlist, MovieList::Favorites] {
            lib.add(list, "u1", 1).await.unwrap();
            lib.add(list, "u1", 1).await.unwrap();
            let page = lib.list(list, "u1", &PageParams::default()).await.unwrap();
            assert_eq!(page.total, 1);
            assert_eq!(page.movies.len(), 1);
        }
        assert_eq!(watchlist::Entity::find().count(&lib.db).await.unwrap(), 1);
        assert_eq!(favorite::Entity::find().count(&lib.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn removing_absent_entry_succeeds() {
        let lib = setup().await;
        lib.remove(MovieList::Watchlist, "u1", 3).await.unwrap();
        lib.remove(MovieList::Favorites, "nobody", 99).await.unwrap();

        lib.add(MovieList::Favorites, "u1", 3).await.unwrap();
        assert!(lib.contains(MovieList::Favorites, "u1", 3).await.unwrap());
        lib.remove(MovieList::Favorites, "u1", 3).await.unwrap();
        assert!(!lib.contains(MovieList::Favorites, "u1", 3).await.unwrap());
    }

    #[tokio::test]
    async fn lists_are_scoped_per_user_and_kind() {
        let lib = setup().await;
        lib.add(MovieList::Watchlist, "u1", 1).await.unwrap();
        lib.add(MovieList::Favorites, "u1", 2).await.unwrap();
        lib.add(MovieList::Watchlist, "u2", 3).await.unwrap();

        assert!(lib.contains(MovieList::Watchlist, "u1", 1).await.unwrap());
        assert!(!lib.contains(MovieList::Favorites, "u1", 1).await.unwrap());
        assert!(!lib.contains(MovieList::Watchlist, "u2", 1).await.unwrap());

        let page = lib.list(MovieList::Watchlist, "u2", &PageParams::default()).await.unwrap();
        assert_eq!(page.movies.iter().map(|m| m.tmdb_id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn lists_newest_first_with_pagination() {
        let lib = setup().await;
        for (movie_id, at) in [(1, 100), (2, 300), (3, 200), (4, 400)] {
            lib.add(MovieList::Watchlist, "u1", movie_id).await.unwrap();
            backdate(&lib, MovieList::Watchlist, "u1", movie_id, at).await;
        }

        let page = lib
            .list(MovieList::Watchlist, "u1", &PageParams { page: Some(1), limit: Some(3) })
            .await
            .unwrap();
        assert_eq!(page.movies.iter().map(|m| m.tmdb_id).collect::<Vec<_>>(), vec![4, 2, 3]);
        assert_eq!(page.total, 4);

        let page = lib
            .list(MovieList::Watchlist, "u1", &PageParams { page: Some(2), limit: Some(3) })
            .await
            .unwrap();
        assert_eq!(page.movies.iter().map(|m| m.tmdb_id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn rerating_overwrites_previous_value() {
        let lib = setup().await;
        assert_eq!(lib.rating("u1", 1).await.unwrap(), None);

        lib.rate("u1", 1, 6.5).await.unwrap();
        lib.rate("u1", 1, 9.0).await.unwrap();
        assert_eq!(lib.rating("u1", 1).await.unwrap(), Some(9.0));
        assert_eq!(rating::Entity::find().count(&lib.db).await.unwrap(), 1);

        let page = lib.ratings("u1", &PageParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.ratings[0].movie.tmdb_id, 1);
        assert_eq!(page.ratings[0].rating, 9.0);

        lib.unrate("u1", 1).await.unwrap();
        lib.unrate("u1", 1).await.unwrap();
        assert_eq!(lib.rating("u1", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_out_of_range_ratings() {
        let lib = setup().await;
        for bad in [0.0, 10.5, 7.3, -1.0, f64::NAN] {
            assert!(matches!(lib.rate("u1", 1, bad).await, Err(AppError::BadRequest(_))), "{bad}");
        }
        lib.rate("u1", 1, 0.5).await.unwrap();
        lib.rate("u1", 2, 10.0).await.unwrap();
    }

    #[tokio::test]
    async fn preferences_are_a_singleton() {
        let lib = setup().await;
        assert_eq!(lib.preferences("u1").await.unwrap(), None);

        let prefs = lib
            .set_preferences(
                "u1",
                PreferencesUpdate {
                    genre_ids: vec![28, 18, 28],
                    languages: vec!["EN".to_string(), " ".to_string()],
                    age_rating: Some("PG-13".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(prefs.genre_ids.0, vec![18, 28]);
        assert_eq!(prefs.languages.0, vec!["en".to_string()]);

        let prefs = lib
            .set_preferences(
                "u1",
                PreferencesUpdate { genre_ids: vec![], languages: vec![], age_rating: None },
            )
            .await
            .unwrap();
        assert!(prefs.genre_ids.0.is_empty());
        assert_eq!(prefs.age_rating, None);
        assert_eq!(user_preferences::Entity::find().count(&lib.db).await.unwrap(), 1);
    }
}
