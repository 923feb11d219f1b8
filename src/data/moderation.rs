use std::collections::HashMap;

use sea_orm::prelude::*;
use sea_orm::{ActiveValue, IntoActiveModel, Order, QueryOrder, Set, TransactionTrait};

use crate::core::entity::moderation::{self, Status};
use crate::core::entity::{track, user};

#[derive(Clone)]
pub struct ModerationData {
    db: DatabaseConnection,
}

impl ModerationData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sets the track's moderated flag and appends the decision in one
    /// transaction. Returns None, writing nothing, if the track does not exist.
    pub async fn record_decision(
        &self,
        track_id: i64,
        moderator_id: i64,
        status: Status,
        comment: Option<String>,
    ) -> anyhow::Result<Option<moderation::Model>> {
        let tx = self.db.begin().await?;

        let Some(track) = track::Entity::find_by_id(track_id).one(&tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut track = track.into_active_model();
        track.is_moderated = Set(status == Status::Approved);
        track.update(&tx).await?;

        let record = moderation::ActiveModel {
            id: ActiveValue::NotSet,
            track_id: Set(track_id),
            moderator_id: Set(moderator_id),
            status: Set(status),
            comment: Set(comment),
            moderated_at: Set(chrono::Utc::now()),
        }
        .insert(&tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    /// Newest decision first, with the moderator resolved.
    pub async fn history(
        &self,
        track_id: i64,
    ) -> anyhow::Result<Vec<(moderation::Model, Option<user::Model>)>> {
        moderation::Entity::find()
            .filter(moderation::Column::TrackId.eq(track_id))
            .order_by(moderation::Column::ModeratedAt, Order::Desc)
            .order_by(moderation::Column::Id, Order::Desc)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query moderation history: {}", e))
    }

    /// Unmoderated tracks whose latest decision, if any, is not a rejection.
    pub async fn pending_tracks(&self) -> anyhow::Result<Vec<track::Model>> {
        let tracks = track::Entity::find()
            .filter(track::Column::IsModerated.eq(false))
            .order_by(track::Column::Id, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query unmoderated tracks: {}", e))?;

        if tracks.is_empty() {
            return Ok(tracks);
        }

        let ids: Vec<i64> = tracks.iter().map(|t| t.id).collect();
        let records = moderation::Entity::find()
            .filter(moderation::Column::TrackId.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query moderation records: {}", e))?;

        let latest = latest_by_track(records);
        Ok(tracks
            .into_iter()
            .filter(|t| latest.get(&t.id) != Some(&Status::Rejected))
            .collect())
    }
}

fn latest_by_track(records: Vec<moderation::Model>) -> HashMap<i64, Status> {
    let mut latest: HashMap<i64, moderation::Model> = HashMap::new();
    for record in records {
        match latest.get(&record.track_id) {
            Some(current) if (current.moderated_at, current.id) >= (record.moderated_at, record.id) => {}
            _ => {
                latest.insert(record.track_id, record);
            }
        }
    }
    latest.into_iter().map(|(id, r)| (id, r.status)).collect()
}
