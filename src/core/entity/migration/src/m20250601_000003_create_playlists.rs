use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250601_000001_create_user::User;
use crate::m20250601_000002_create_catalog::Track;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Playlist::Table)
                    .if_not_exists()
                    .col(pk_auto(Playlist::Id))
                    .col(string(Playlist::Title).not_null())
                    .col(text(Playlist::Description).not_null().default(""))
                    .col(big_integer(Playlist::UserId).not_null())
                    .col(
                        string_len(Playlist::Visibility, 16)
                            .not_null()
                            .default("Private"),
                    )
                    .col(string_null(Playlist::CoverImagePath))
                    .col(
                        timestamp_with_time_zone(Playlist::CreatedAt)
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(timestamp_with_time_zone_null(Playlist::UpdatedAt))
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_playlist_user")
                            .from(Playlist::Table, Playlist::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlaylistTrack::Table)
                    .if_not_exists()
                    .col(big_integer(PlaylistTrack::PlaylistId).not_null())
                    .col(big_integer(PlaylistTrack::TrackId).not_null())
                    .col(integer(PlaylistTrack::Position).not_null())
                    .col(
                        timestamp_with_time_zone(PlaylistTrack::AddedAt)
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .primary_key(
                        Index::create()
                            .col(PlaylistTrack::PlaylistId)
                            .col(PlaylistTrack::TrackId),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_playlist_track_playlist")
                            .from(PlaylistTrack::Table, PlaylistTrack::PlaylistId)
                            .to(Playlist::Table, Playlist::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_playlist_track_track")
                            .from(PlaylistTrack::Table, PlaylistTrack::TrackId)
                            .to(Track::Table, Track::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Playlist::Table)
                    .name("idx_playlist_user")
                    .col(Playlist::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Playlist::Table)
                    .name("idx_playlist_visibility")
                    .col(Playlist::Visibility)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(PlaylistTrack::Table)
                    .name("idx_playlist_track_position")
                    .col(PlaylistTrack::PlaylistId)
                    .col(PlaylistTrack::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PlaylistTrack::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Playlist::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Playlist {
    Table,
    Id,
    Title,
    Description,
    UserId,
    Visibility,
    CoverImagePath,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlaylistTrack {
    Table,
    PlaylistId,
    TrackId,
    Position,
    AddedAt,
}
