use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(integer(Movies::TmdbId).primary_key())
                    .col(string(Movies::Title))
                    .col(text(Movies::Overview))
                    .col(string_null(Movies::PosterPath))
                    .col(string_null(Movies::BackdropPath))
                    .col(string_null(Movies::ReleaseDate))
                    .col(integer_null(Movies::Runtime))
                    .col(double(Movies::VoteAverage))
                    .col(integer(Movies::VoteCount))
                    .col(json(Movies::Genres))
                    .col(string(Movies::GenreIds))
                    .col(string(Movies::OriginalLanguage))
                    .col(boolean(Movies::Adult))
                    .col(double(Movies::Popularity))
                    .col(string_null(Movies::Certification))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_popularity")
                    .table(Movies::Table)
                    .col(Movies::Popularity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_release_date")
                    .table(Movies::Table)
                    .col(Movies::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_vote_average")
                    .table(Movies::Table)
                    .col(Movies::VoteAverage)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Movies {
    Table,
    TmdbId,
    Title,
    Overview,
    PosterPath,
    BackdropPath,
    ReleaseDate,
    Runtime,
    VoteAverage,
    VoteCount,
    Genres,
    GenreIds,
    OriginalLanguage,
    Adult,
    Popularity,
    Certification,
    CreatedAt,
    UpdatedAt,
}
