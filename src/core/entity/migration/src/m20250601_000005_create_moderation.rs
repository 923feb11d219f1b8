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
                    .table(Moderation::Table)
                    .if_not_exists()
                    .col(pk_auto(Moderation::Id))
                    .col(big_integer(Moderation::TrackId).not_null())
                    .col(big_integer(Moderation::ModeratorId).not_null())
                    .col(
                        string_len(Moderation::Status, 16)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(text_null(Moderation::Comment))
                    .col(
                        timestamp_with_time_zone(Moderation::ModeratedAt)
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_moderation_track")
                            .from(Moderation::Table, Moderation::TrackId)
                            .to(Track::Table, Track::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_moderation_moderator")
                            .from(Moderation::Table, Moderation::ModeratorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Moderation::Table)
                    .name("idx_moderation_track")
                    .col(Moderation::TrackId)
                    .col(Moderation::ModeratedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Moderation::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Moderation {
    Table,
    Id,
    TrackId,
    ModeratorId,
    Status,
    Comment,
    ModeratedAt,
}
