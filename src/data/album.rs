use sea_orm::prelude::*;
use sea_orm::{ActiveValue, Condition, JoinType, Order, QueryOrder, QuerySelect, Set};

use crate::core::entity::{album, artist};

#[derive(Clone)]
pub struct AlbumData {
    db: DatabaseConnection,
}

impl AlbumData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_albums(&self) -> anyhow::Result<Vec<(album::Model, Option<artist::Model>)>> {
        album::Entity::find()
            .order_by(album::Column::Title, Order::Asc)
            .find_also_related(artist::Entity)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list albums: {}", e))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<album::Model>> {
        album::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query album: {}", e))
    }

    pub async fn find_with_artist(
        &self,
        id: i64,
    ) -> anyhow::Result<Option<(album::Model, Option<artist::Model>)>> {
        album::Entity::find_by_id(id)
            .find_also_related(artist::Entity)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query album: {}", e))
    }

    pub async fn find_by_artist(&self, artist_id: i64) -> anyhow::Result<Vec<album::Model>> {
        album::Entity::find()
            .filter(album::Column::ArtistId.eq(artist_id))
            .order_by(album::Column::ReleaseDate, Order::Desc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query albums by artist: {}", e))
    }

    /// Most recent releases first; albums without a release date fill the tail.
    pub async fn new_releases(&self, limit: u64) -> anyhow::Result<Vec<album::Model>> {
        let mut albums = album::Entity::find()
            .filter(album::Column::ReleaseDate.is_not_null())
            .order_by(album::Column::ReleaseDate, Order::Desc)
            .order_by(album::Column::Id, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query new releases: {}", e))?;

        let missing = limit.saturating_sub(albums.len() as u64);
        if missing > 0 {
            let undated = album::Entity::find()
                .filter(album::Column::ReleaseDate.is_null())
                .order_by(album::Column::Id, Order::Desc)
                .limit(missing)
                .all(&self.db)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to query new releases: {}", e))?;
            albums.extend(undated);
        }
        Ok(albums)
    }

    /// Matches the album title or the artist name.
    pub async fn search_albums(&self, query: &str) -> anyhow::Result<Vec<album::Model>> {
        album::Entity::find()
            .join(JoinType::LeftJoin, album::Relation::Artist.def())
            .filter(
                Condition::any()
                    .add(album::Column::Title.contains(query))
                    .add(artist::Column::Name.contains(query)),
            )
            .order_by(album::Column::Title, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search albums: {}", e))
    }

    pub async fn save_album(
        &self,
        id: Option<i64>,
        title: String,
        artist_id: i64,
        release_date: Option<Date>,
        cover_path: Option<String>,
    ) -> anyhow::Result<album::Model> {
        let model = album::ActiveModel {
            id: id.map(Set).unwrap_or(ActiveValue::NotSet),
            title: Set(title),
            artist_id: Set(artist_id),
            release_date: Set(release_date),
            cover_path: Set(cover_path),
        };

        let result = match id {
            Some(_) => model.update(&self.db).await,
            None => model.insert(&self.db).await,
        };
        result.map_err(|e| anyhow::anyhow!("Failed to save album: {}", e))
    }

    pub async fn delete_album(&self, id: i64) -> anyhow::Result<bool> {
        let res = album::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete album: {}", e))?;
        Ok(res.rows_affected > 0)
    }

    pub async fn count_albums(&self) -> anyhow::Result<u64> {
        album::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count albums: {}", e))
    }
}
