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
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(pk_auto(Subscription::Id))
                    .col(big_integer(Subscription::UserId).not_null())
                    .col(timestamp_with_time_zone(Subscription::StartDate).not_null())
                    .col(timestamp_with_time_zone(Subscription::EndDate).not_null())
                    .col(
                        boolean(Subscription::IsActivated)
                            .not_null()
                            .default(false),
                    )
                    .col(string_null(Subscription::TransactionId))
                    .col(big_integer(Subscription::AmountCents).not_null().default(0))
                    .col(
                        string_len(Subscription::Status, 16)
                            .not_null()
                            .default("pending"),
                    )
                    .foreign_key(
                        &mut ForeignKey::create()
                            .name("fk_subscription_user")
                            .from(Subscription::Table, Subscription::UserId)
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
                    .table(Subscription::Table)
                    .name("idx_subscription_user_activated")
                    .col(Subscription::UserId)
                    .col(Subscription::IsActivated)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Subscription::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Subscription {
    Table,
    Id,
    UserId,
    StartDate,
    EndDate,
    IsActivated,
    TransactionId,
    AmountCents,
    Status,
}
