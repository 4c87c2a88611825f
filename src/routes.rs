use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    auth::AuthUser,
    entities::{movie, user, user_preferences},
    error::{AppError, AppResult},
    library::MovieList,
    models::{MoviePage, PreferencesUpdate, RatingPage, RatingRequest, SyncCategory, SyncOutcome},
    query::{MovieFilter, PageParams},
    sync::{self, SyncOptions},
};

// Extractors whose rejections render as the usual JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
struct ApiQuery<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
struct ApiPath<T>(T);

#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct ApiJson<T>(T);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movies", get(list_movies))
        .route("/movies/search", get(search_movies))
        .route("/movies/trending", get(trending_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/movies/{id}/trailer", get(movie_trailer))
        .route("/sync/{category}", post(sync_category))
        .route("/me", get(me))
        .route("/watchlist", get(list_watchlist))
        .route("/watchlist/{movie_id}", post(add_to_watchlist).delete(remove_from_watchlist))
        .route("/watchlist/{movie_id}/status", get(watchlist_status))
        .route("/favorites", get(list_favorites))
        .route("/favorites/{movie_id}", post(add_favorite).delete(remove_favorite))
        .route("/favorites/{movie_id}/status", get(favorite_status))
        .route("/ratings", get(list_ratings))
        .route(
            "/ratings/{movie_id}",
            get(get_rating).put(rate_movie).post(rate_movie).delete(delete_rating),
        )
        .route("/preferences", get(get_preferences).put(put_preferences))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_movies(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<MovieFilter>,
) -> AppResult<Json<MoviePage>> {
    Ok(Json(state.catalog.list(&filter).await?))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn search_movies(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> AppResult<Json<MoviePage>> {
    let text = q.q.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::bad_request("q is required"));
    }
    let page = PageParams { page: q.page, limit: q.limit };
    Ok(Json(state.catalog.search(text, &page).await?))
}

#[derive(Debug, Deserialize)]
struct TrendingQuery {
    limit: Option<u64>,
}

async fn trending_movies(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<TrendingQuery>,
) -> AppResult<Json<Value>> {
    let movies = state.catalog.trending(q.limit).await?;
    Ok(Json(json!({ "movies": movies })))
}

async fn get_movie(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<movie::Model>> {
    Ok(Json(sync::require_movie(&state.catalog, &*state.source, id).await?))
}

async fn movie_trailer(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Value>> {
    let url = state.source.trailer_url(id).await?;
    Ok(Json(json!({ "trailerUrl": url })))
}

#[derive(Debug, Deserialize)]
struct SyncQuery {
    pages: Option<u32>,
    language: Option<String>,
}

async fn sync_category(
    State(state): State<Arc<AppState>>,
    ApiPath(category): ApiPath<String>,
    ApiQuery(q): ApiQuery<SyncQuery>,
) -> AppResult<Json<SyncOutcome>> {
    let category = SyncCategory::parse(&category, q.language.as_deref())
        .ok_or_else(|| AppError::bad_request(format!("unknown sync category {category:?}")))?;

    let opts = SyncOptions {
        pages: q.pages.unwrap_or(1).clamp(1, state.config.sync_max_pages),
        existing: state.config.sync_existing,
        max_concurrent: state.config.max_concurrent,
    };
    let outcome = sync::sync_listing(&state.catalog, &*state.source, &category, opts).await?;
    Ok(Json(outcome))
}

async fn me(user: AuthUser) -> Json<user::Model> {
    Json(user.0)
}

async fn list_entries(
    state: &AppState,
    list: MovieList,
    user: &AuthUser,
    page: &PageParams,
) -> AppResult<Json<MoviePage>> {
    Ok(Json(state.library.list(list, user.id(), page).await?))
}

async fn add_entry(
    state: &AppState,
    list: MovieList,
    user: &AuthUser,
    movie_id: i32,
) -> AppResult<StatusCode> {
    sync::require_movie(&state.catalog, &*state.source, movie_id).await?;
    state.library.add(list, user.id(), movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_entry(
    state: &AppState,
    list: MovieList,
    user: &AuthUser,
    movie_id: i32,
) -> AppResult<StatusCode> {
    state.library.remove(list, user.id(), movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<Json<MoviePage>> {
    list_entries(&state, MovieList::Watchlist, &user, &page).await
}

async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    add_entry(&state, MovieList::Watchlist, &user, movie_id).await
}

async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    remove_entry(&state, MovieList::Watchlist, &user, movie_id).await
}

async fn watchlist_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<Json<Value>> {
    let found = state.library.contains(MovieList::Watchlist, user.id(), movie_id).await?;
    Ok(Json(json!({ "inWatchlist": found })))
}

async fn list_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<Json<MoviePage>> {
    list_entries(&state, MovieList::Favorites, &user, &page).await
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    add_entry(&state, MovieList::Favorites, &user, movie_id).await
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    remove_entry(&state, MovieList::Favorites, &user, movie_id).await
}

async fn favorite_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<Json<Value>> {
    let found = state.library.contains(MovieList::Favorites, user.id(), movie_id).await?;
    Ok(Json(json!({ "isFavorite": found })))
}

async fn list_ratings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<Json<RatingPage>> {
    Ok(Json(state.library.ratings(user.id(), &page).await?))
}

async fn get_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<Json<Value>> {
    let rating = state.library.rating(user.id(), movie_id).await?;
    Ok(Json(json!({ "rating": rating })))
}

async fn rate_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
    ApiJson(req): ApiJson<RatingRequest>,
) -> AppResult<StatusCode> {
    sync::require_movie(&state.catalog, &*state.source, movie_id).await?;
    state.library.rate(user.id(), movie_id, req.rating).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(movie_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    state.library.unrate(user.id(), movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Option<user_preferences::Model>>> {
    Ok(Json(state.library.preferences(user.id()).await?))
}

async fn put_preferences(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(update): ApiJson<PreferencesUpdate>,
) -> AppResult<Json<user_preferences::Model>> {
    Ok(Json(state.library.set_preferences(user.id(), update).await?))
}
