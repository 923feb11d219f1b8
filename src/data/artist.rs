use sea_orm::prelude::*;
use sea_orm::{ActiveValue, Condition, Order, QueryOrder, Set};

use crate::core::entity::artist;

#[derive(Clone)]
pub struct ArtistData {
    db: DatabaseConnection,
}

impl ArtistData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_artists(&self) -> anyhow::Result<Vec<artist::Model>> {
        artist::Entity::find()
            .order_by(artist::Column::Name, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list artists: {}", e))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<artist::Model>> {
        artist::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query artist: {}", e))
    }

    pub async fn search_artists(&self, query: &str) -> anyhow::Result<Vec<artist::Model>> {
        artist::Entity::find()
            .filter(
                Condition::any()
                    .add(artist::Column::Name.contains(query))
                    .add(artist::Column::Description.contains(query)),
            )
            .order_by(artist::Column::Name, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search artists: {}", e))
    }

    /// Inserts when `id` is None, otherwise updates the existing row.
    pub async fn save_artist(
        &self,
        id: Option<i64>,
        name: String,
        description: String,
        photo_path: Option<String>,
    ) -> anyhow::Result<artist::Model> {
        let model = artist::ActiveModel {
            id: id.map(Set).unwrap_or(ActiveValue::NotSet),
            name: Set(name),
            description: Set(description),
            photo_path: Set(photo_path),
        };

        let result = match id {
            Some(_) => model.update(&self.db).await,
            None => model.insert(&self.db).await,
        };
        result.map_err(|e| anyhow::anyhow!("Failed to save artist: {}", e))
    }

    pub async fn delete_artist(&self, id: i64) -> anyhow::Result<bool> {
        let res = artist::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete artist: {}", e))?;
        Ok(res.rows_affected > 0)
    }

    pub async fn count_artists(&self) -> anyhow::Result<u64> {
        artist::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count artists: {}", e))
    }
}
