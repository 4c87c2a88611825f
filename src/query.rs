//! Translation of user-supplied movie filters into catalog queries.
//!
//! Every field that is present contributes exactly one AND-ed condition and
//! absent fields contribute nothing. The same [`Condition`] feeds both the
//! page query and the count query so `total` always matches the rows a client
//! could page through.

use std::{fmt::Display, str::FromStr};

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::{Expr, Func, NullOrdering, SimpleExpr},
};
use serde::{Deserialize, Deserializer};

use crate::entities::movie;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum RuntimeBucket {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "under90")]
    Under90,
    #[serde(rename = "90to120")]
    From90To120,
    #[serde(rename = "over120")]
    Over120,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Popularity,
    Rating,
    ReleaseDate,
    Title,
}

impl SortKey {
    fn column(self) -> movie::Column {
        match self {
            SortKey::Popularity => movie::Column::Popularity,
            SortKey::Rating => movie::Column::VoteAverage,
            SortKey::ReleaseDate => movie::Column::ReleaseDate,
            SortKey::Title => movie::Column::Title,
        }
    }

    /// Titles sort case-insensitively.
    fn expr(self) -> SimpleExpr {
        let col = Expr::col((movie::Entity, self.column()));
        match self {
            SortKey::Title => Func::lower(col).into(),
            _ => col.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFilter {
    #[serde(default, deserialize_with = "comma_separated")]
    pub genres: Option<Vec<i32>>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub languages: Option<Vec<String>>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
    #[serde(default)]
    pub runtime: RuntimeBucket,
    #[serde(default, deserialize_with = "comma_separated")]
    pub age_ratings: Option<Vec<String>>,
    pub include_adult: Option<bool>,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl MovieFilter {
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(genres) = self.genres.as_deref().filter(|g| !g.is_empty()) {
            let any = genres.iter().fold(Condition::any(), |any, id| {
                any.add(movie::Column::GenreIds.contains(&movie::genre_token(*id)))
            });
            cond = cond.add(any);
        }

        if let Some(languages) = self.languages.as_deref().filter(|l| !l.is_empty()) {
            let languages = languages.iter().map(|l| l.to_ascii_lowercase());
            cond = cond.add(movie::Column::OriginalLanguage.is_in(languages));
        }

        if let Some(year) = self.year_min {
            cond = cond.add(movie::Column::ReleaseDate.gte(format!("{year:04}-01-01")));
        }
        if let Some(year) = self.year_max {
            cond = cond.add(movie::Column::ReleaseDate.lte(format!("{year:04}-12-31")));
        }

        if let Some(min) = self.rating_min {
            cond = cond.add(movie::Column::VoteAverage.gte(min));
        }
        if let Some(max) = self.rating_max {
            cond = cond.add(movie::Column::VoteAverage.lte(max));
        }

        match self.runtime {
            RuntimeBucket::Any => {},
            RuntimeBucket::Under90 => cond = cond.add(movie::Column::Runtime.lt(90)),
            RuntimeBucket::From90To120 => {
                cond = cond.add(movie::Column::Runtime.between(90, 120));
            },
            RuntimeBucket::Over120 => cond = cond.add(movie::Column::Runtime.gt(120)),
        }

        if let Some(ratings) = self.age_ratings.as_deref().filter(|r| !r.is_empty()) {
            cond = cond.add(movie::Column::Certification.is_in(ratings.iter().cloned()));
        }

        if self.include_adult == Some(false) {
            cond = cond.add(movie::Column::Adult.eq(false));
        }

        cond
    }

    /// Filtered select without ordering or pagination, suitable for counting.
    pub fn select(&self) -> Select<movie::Entity> {
        movie::Entity::find().filter(self.condition())
    }

    /// Filtered, ordered and paginated select for one page of results.
    pub fn page_select(&self) -> Select<movie::Entity> {
        let select = self
            .select()
            .order_by_with_nulls(self.sort_by.expr(), self.sort_order.into(), NullOrdering::Last)
            .order_by(movie::Column::TmdbId, Order::Asc);
        self.page_params().apply(select)
    }

    pub fn page_params(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

/// `page`/`limit` pair shared by every paginated listing.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Capped at `i64::MAX`, the largest offset SQLite can bind.
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit()).min(i64::MAX as u64)
    }

    pub fn apply<E: EntityTrait>(&self, select: Select<E>) -> Select<E> {
        select.limit(self.limit()).offset(self.offset())
    }
}

/// Accepts `a,b,c` from a query string. Blank input counts as absent.
fn comma_separated<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(serde::de::Error::custom))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!items.is_empty()).then_some(items))
}
