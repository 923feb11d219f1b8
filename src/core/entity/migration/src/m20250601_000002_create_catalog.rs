use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250601_000001_create_user::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Artist::Table)
                    .if_not_exists()
                    .col(pk_auto(Artist::Id))
                    .col(string(Artist::Name).not_null())
                    .col(text(Artist::Description).not_null().default(""))
                    .col(string_null(Artist::PhotoPath))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string(Genre::Name).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Genre::Table)
                    .name("idx_genre_name")
                    .unique()
                    .col(Genre::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Album::Table)
                    .if_not_exists()
                    .col(pk_auto(Album::Id))
                    .col(string(Album::Title).not_null())
                    .col(big_integer(Album::ArtistId).not_null())
                    .col(date_null(Album::ReleaseDate))
                    .col(string_null(Album::CoverPath))
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_album_artist")
                            .from(Album::Table, Album::ArtistId)
                            .to(Artist::Table, Artist::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Track::Table)
                    .if_not_exists()
                    .col(pk_auto(Track::Id))
                    .col(string(Track::Title).not_null())
                    .col(string(Track::FilePath).not_null())
                    .col(integer(Track::Duration).not_null().default(0))
                    .col(big_integer(Track::GenreId).not_null())
                    .col(big_integer_null(Track::AlbumId))
                    .col(big_integer_null(Track::ArtistId))
                    .col(boolean(Track::IsModerated).not_null().default(false))
                    .col(big_integer_null(Track::UploadedBy))
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_track_genre")
                            .from(Track::Table, Track::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .to_owned(),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_track_album")
                            .from(Track::Table, Track::AlbumId)
                            .to(Album::Table, Album::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .to_owned(),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_track_artist")
                            .from(Track::Table, Track::ArtistId)
                            .to(Artist::Table, Artist::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .to_owned(),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_track_uploader")
                            .from(Track::Table, Track::UploadedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Track::Table)
                    .name("idx_track_moderated")
                    .col(Track::IsModerated)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Track::Table)
                    .name("idx_track_album")
                    .col(Track::AlbumId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Track::Table)
                    .name("idx_track_genre")
                    .col(Track::GenreId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Track::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Album::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genre::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Artist::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Artist {
    Table,
    Id,
    Name,
    Description,
    PhotoPath,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Album {
    Table,
    Id,
    Title,
    ArtistId,
    ReleaseDate,
    CoverPath,
}

#[derive(DeriveIden)]
pub(crate) enum Track {
    Table,
    Id,
    Title,
    FilePath,
    Duration,
    GenreId,
    AlbumId,
    ArtistId,
    IsModerated,
    UploadedBy,
}
