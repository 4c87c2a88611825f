use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::models::Genre;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "movies")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "id")]
    pub tmdb_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: f64,
    pub vote_count: i32,
    pub genres: Genres,
    /// `,28,12,` style tokens so genre membership is a plain LIKE.
    #[serde(skip)]
    pub genre_ids: String,
    pub original_language: String,
    pub adult: bool,
    pub popularity: f64,
    pub certification: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Genres(pub Vec<Genre>);

impl Genres {
    pub fn tokens(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut out = String::from(",");
        for genre in &self.0 {
            out.push_str(&genre.id.to_string());
            out.push(',');
        }
        out
    }
}

pub fn genre_token(id: i32) -> String {
    format!(",{id},")
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::watchlist::Entity")]
    Watchlist,
    #[sea_orm(has_many = "super::favorite::Entity")]
    Favorite,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::watchlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl Related<super::favorite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorite.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_tokens_wrap_every_id() {
        let genres = Genres(vec![
            Genre { id: 28, name: "Action".to_string() },
            Genre { id: 12, name: "Adventure".to_string() },
        ]);
        assert_eq!(genres.tokens(), ",28,12,");
        assert!(genres.tokens().contains(&genre_token(12)));
        assert!(!genres.tokens().contains(&genre_token(2)));
        assert_eq!(Genres::default().tokens(), "");
    }
}
