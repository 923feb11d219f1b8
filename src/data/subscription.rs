use sea_orm::prelude::*;
use sea_orm::{ActiveValue, IntoActiveModel, Order, QueryOrder, Set, TransactionTrait};

use crate::core::entity::subscription::{self, Status};

#[derive(Clone)]
pub struct SubscriptionData {
    db: DatabaseConnection,
}

impl SubscriptionData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_subscription(
        &self,
        user_id: i64,
        start_date: DateTimeUtc,
        end_date: DateTimeUtc,
        amount_cents: i64,
    ) -> anyhow::Result<subscription::Model> {
        let model = subscription::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: Set(user_id),
            start_date: Set(start_date),
            end_date: Set(end_date),
            is_activated: Set(false),
            transaction_id: Set(None),
            amount_cents: Set(amount_cents),
            status: Set(Status::Pending),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create subscription: {}", e))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<subscription::Model>> {
        subscription::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query subscription: {}", e))
    }

    pub async fn by_user(&self, user_id: i64) -> anyhow::Result<Vec<subscription::Model>> {
        subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by(subscription::Column::StartDate, Order::Desc)
            .order_by(subscription::Column::Id, Order::Desc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query subscriptions: {}", e))
    }

    pub async fn activate(
        &self,
        subscription: subscription::Model,
        transaction_id: String,
    ) -> anyhow::Result<subscription::Model> {
        let mut model = subscription.into_active_model();
        model.is_activated = Set(true);
        model.transaction_id = Set(Some(transaction_id));
        model.status = Set(Status::Active);
        model
            .update(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to activate subscription: {}", e))
    }

    pub async fn set_status(
        &self,
        subscription: subscription::Model,
        status: Status,
    ) -> anyhow::Result<subscription::Model> {
        let mut model = subscription.into_active_model();
        model.status = Set(status);
        model
            .update(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update subscription: {}", e))
    }

    /// Flips every activated subscription whose end date has passed to expired.
    pub async fn expire_due(&self, now: DateTimeUtc) -> anyhow::Result<u64> {
        let tx = self.db.begin().await?;

        let activated = subscription::Entity::find()
            .filter(subscription::Column::IsActivated.eq(true))
            .all(&tx)
            .await?;

        let mut expired = 0;
        for sub in activated.into_iter().filter(|s| s.end_date <= now) {
            let mut model = sub.into_active_model();
            model.is_activated = Set(false);
            model.status = Set(Status::Expired);
            model.update(&tx).await?;
            expired += 1;
        }

        tx.commit().await?;
        Ok(expired)
    }

    /// The activated, unexpired subscription with the latest end date.
    pub async fn active_for_user(
        &self,
        user_id: i64,
        now: DateTimeUtc,
    ) -> anyhow::Result<Option<subscription::Model>> {
        let subs = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::IsActivated.eq(true))
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query subscriptions: {}", e))?;

        Ok(subs
            .into_iter()
            .filter(|s| s.is_active_at(now))
            .max_by_key(|s| s.end_date))
    }
}
