pub mod favorite;
pub mod movie;
pub mod rating;
pub mod user;
pub mod user_preferences;
pub mod watchlist;
