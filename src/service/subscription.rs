use chrono::{Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::entity::{subscription, user};
use crate::data::SubscriptionData;
use crate::service::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Premium,
    Family,
}

impl Plan {
    pub fn name(&self) -> &'static str {
        match self {
            Plan::Premium => "Premium",
            Plan::Family => "Family",
        }
    }

    /// Monthly price in minor units.
    pub fn monthly_price_cents(&self) -> i64 {
        match self {
            Plan::Premium => 29_900,
            Plan::Family => 44_900,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "premium" => Some(Plan::Premium),
            "family" => Some(Plan::Family),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Monthly,
    Yearly,
}

impl Period {
    pub fn months(&self) -> u32 {
        match self {
            Period::Monthly => 1,
            Period::Yearly => 12,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(Period::Monthly),
            "yearly" => Some(Period::Yearly),
            _ => None,
        }
    }
}

pub fn price_cents(plan: Plan, period: Period) -> i64 {
    plan.monthly_price_cents() * i64::from(period.months())
}

/// Card details from the checkout form. They are only checked for presence.
#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvc: String,
    pub card_name: String,
}

impl PaymentDetails {
    fn is_complete(&self) -> bool {
        [
            &self.card_number,
            &self.card_expiry,
            &self.card_cvc,
            &self.card_name,
        ]
        .iter()
        .all(|f| !f.trim().is_empty())
    }
}

pub struct SubscriptionService {
    data: SubscriptionData,
}

impl SubscriptionService {
    pub fn new(data: SubscriptionData) -> Self {
        Self { data }
    }

    pub async fn create_subscription(
        &self,
        user_id: i64,
        plan: Plan,
        period: Period,
    ) -> anyhow::Result<subscription::Model> {
        let start = Utc::now();
        let end = start
            .checked_add_months(Months::new(period.months()))
            .ok_or_else(|| Error::BadRequest("Subscription end date out of range".to_string()))?;
        self.data
            .create_subscription(user_id, start, end, price_cents(plan, period))
            .await
    }

    pub async fn activate_subscription(
        &self,
        id: i64,
        transaction_id: String,
    ) -> anyhow::Result<subscription::Model> {
        let sub = self
            .data
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Subscription not found".to_string()))?;
        let sub = self.data.activate(sub, transaction_id).await?;
        tracing::info!("Subscription {} activated for user {}", sub.id, sub.user_id);
        Ok(sub)
    }

    /// Stub checkout: any complete set of card fields is accepted.
    pub async fn purchase(
        &self,
        user_id: i64,
        plan: Plan,
        period: Period,
        payment: &PaymentDetails,
    ) -> anyhow::Result<subscription::Model> {
        if !payment.is_complete() {
            return Err(Error::BadRequest("Please fill in all payment fields".to_string()).into());
        }
        let sub = self.create_subscription(user_id, plan, period).await?;
        let transaction_id = format!("TXN-{}", Uuid::new_v4().simple());
        self.activate_subscription(sub.id, transaction_id).await
    }

    /// Only marks the subscription cancelled; paid time is kept.
    pub async fn cancel_subscription(
        &self,
        user_id: i64,
        id: i64,
    ) -> anyhow::Result<subscription::Model> {
        let sub = self
            .data
            .find_by_id(id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| Error::NotFound("Subscription not found".to_string()))?;
        let sub = self
            .data
            .set_status(sub, subscription::Status::Cancelled)
            .await?;
        tracing::info!("Subscription {} cancelled by user {}", sub.id, user_id);
        Ok(sub)
    }

    pub async fn user_subscriptions(&self, user_id: i64) -> anyhow::Result<Vec<subscription::Model>> {
        self.data.by_user(user_id).await
    }

    pub async fn active_subscription(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Option<subscription::Model>> {
        self.data.active_for_user(user_id, Utc::now()).await
    }

    pub async fn is_subscriber(&self, user: &user::Model) -> anyhow::Result<bool> {
        if user.has_subscriber_role() {
            return Ok(true);
        }
        Ok(self.active_subscription(user.id).await?.is_some())
    }

    pub async fn check_expired_subscriptions(&self) -> anyhow::Result<u64> {
        let expired = self.data.expire_due(Utc::now()).await?;
        if expired > 0 {
            tracing::info!("Expired {} subscriptions", expired);
        }
        Ok(expired)
    }
}
