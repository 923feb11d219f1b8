use sea_orm::prelude::*;
use sea_orm::{ActiveValue, Order, QueryOrder, Set};

use crate::core::entity::genre;
use crate::data::map_write_err;

#[derive(Clone)]
pub struct GenreData {
    db: DatabaseConnection,
}

impl GenreData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_genres(&self) -> anyhow::Result<Vec<genre::Model>> {
        genre::Entity::find()
            .order_by(genre::Column::Name, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list genres: {}", e))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<genre::Model>> {
        genre::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query genre: {}", e))
    }

    pub async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<genre::Model>> {
        genre::Entity::find()
            .filter(genre::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query genre: {}", e))
    }

    pub async fn search_genres(&self, query: &str) -> anyhow::Result<Vec<genre::Model>> {
        genre::Entity::find()
            .filter(genre::Column::Name.contains(query))
            .order_by(genre::Column::Name, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search genres: {}", e))
    }

    pub async fn save_genre(&self, id: Option<i64>, name: String) -> anyhow::Result<genre::Model> {
        let model = genre::ActiveModel {
            id: id.map(Set).unwrap_or(ActiveValue::NotSet),
            name: Set(name),
        };

        let result = match id {
            Some(_) => model.update(&self.db).await,
            None => model.insert(&self.db).await,
        };
        result.map_err(|e| map_write_err(e, "Genre"))
    }

    pub async fn delete_genre(&self, id: i64) -> anyhow::Result<bool> {
        let res = genre::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete genre: {}", e))?;
        Ok(res.rows_affected > 0)
    }

    pub async fn count_genres(&self) -> anyhow::Result<u64> {
        genre::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count genres: {}", e))
    }
}
