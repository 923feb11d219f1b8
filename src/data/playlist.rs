use anyhow::anyhow;
use sea_orm::prelude::*;
use sea_orm::{ConnectionTrait, IntoActiveModel, Order, QueryOrder, Set, TransactionTrait};

use crate::core::entity::{playlist, playlist_track, track};

#[derive(Clone)]
pub struct PlaylistData {
    db: DatabaseConnection,
}

impl PlaylistData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_playlist(
        &self,
        playlist: playlist::ActiveModel,
    ) -> anyhow::Result<playlist::Model> {
        let playlist = playlist.insert(&self.db).await?;
        Ok(playlist)
    }

    pub async fn get_user_playlists(&self, user_id: i64) -> anyhow::Result<Vec<playlist::Model>> {
        let playlists = playlist::Entity::find()
            .filter(playlist::Column::UserId.eq(user_id))
            .order_by(playlist::Column::CreatedAt, Order::Desc)
            .all(&self.db)
            .await?;
        Ok(playlists)
    }

    pub async fn get_public_playlists(&self) -> anyhow::Result<Vec<playlist::Model>> {
        let playlists = playlist::Entity::find()
            .filter(playlist::Column::Visibility.eq(playlist::Visibility::Public))
            .order_by(playlist::Column::CreatedAt, Order::Desc)
            .all(&self.db)
            .await?;
        Ok(playlists)
    }

    pub async fn get_playlist(&self, id: i64) -> anyhow::Result<Option<playlist::Model>> {
        let playlist = playlist::Entity::find_by_id(id).one(&self.db).await?;
        Ok(playlist)
    }

    pub async fn update_playlist(
        &self,
        playlist: playlist::ActiveModel,
    ) -> anyhow::Result<playlist::Model> {
        let playlist = playlist.update(&self.db).await?;
        Ok(playlist)
    }

    pub async fn delete_playlist(&self, playlist: playlist::Model) -> anyhow::Result<()> {
        playlist.delete(&self.db).await?;
        Ok(())
    }

    pub async fn get_playlist_entry(
        &self,
        playlist_id: i64,
        track_id: i64,
    ) -> anyhow::Result<Option<playlist_track::Model>> {
        let entry = playlist_track::Entity::find_by_id((playlist_id, track_id))
            .one(&self.db)
            .await?;
        Ok(entry)
    }

    pub async fn get_playlist_tracks(
        &self,
        playlist_id: i64,
    ) -> anyhow::Result<Vec<(playlist_track::Model, Option<track::Model>)>> {
        let entries = playlist_track::Entity::find()
            .filter(playlist_track::Column::PlaylistId.eq(playlist_id))
            .order_by(playlist_track::Column::Position, Order::Asc)
            .find_also_related(track::Entity)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    pub async fn get_playlist_track_count(&self, playlist_id: i64) -> anyhow::Result<u64> {
        let count = playlist_track::Entity::find()
            .filter(playlist_track::Column::PlaylistId.eq(playlist_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// Appends the track after the current last position. Re-adding is a no-op.
    pub async fn append_track(
        &self,
        playlist_id: i64,
        track_id: i64,
    ) -> anyhow::Result<playlist_track::Model> {
        let tx = self.db.begin().await?;
        lock_playlist(&tx, playlist_id).await?;

        if let Some(existing) = playlist_track::Entity::find_by_id((playlist_id, track_id))
            .one(&tx)
            .await?
        {
            tx.rollback().await?;
            return Ok(existing);
        }

        let max_position = playlist_track::Entity::find()
            .filter(playlist_track::Column::PlaylistId.eq(playlist_id))
            .order_by(playlist_track::Column::Position, Order::Desc)
            .one(&tx)
            .await?
            .map(|entry| entry.position)
            .unwrap_or(-1);

        let entry = playlist_track::ActiveModel {
            playlist_id: Set(playlist_id),
            track_id: Set(track_id),
            position: Set(max_position + 1),
            added_at: Set(chrono::Utc::now()),
        }
        .insert(&tx)
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    pub async fn remove_track_and_reorder(
        &self,
        playlist_id: i64,
        track_id: i64,
    ) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;
        lock_playlist(&tx, playlist_id).await?;

        let entry = playlist_track::Entity::find_by_id((playlist_id, track_id))
            .one(&tx)
            .await?;

        let removed = entry.is_some();
        match entry {
            Some(entry) => {
                entry.into_active_model().delete(&tx).await?;
                repack_positions(&tx, playlist_id).await?;
                tx.commit().await?;
            }
            None => tx.rollback().await?,
        }
        Ok(removed)
    }

    /// Moves the track to `new_position`; the tracks in between shift by one.
    pub async fn reorder_track(
        &self,
        playlist_id: i64,
        track_id: i64,
        new_position: i32,
    ) -> anyhow::Result<()> {
        let tx = self.db.begin().await?;
        lock_playlist(&tx, playlist_id).await?;

        let mut entries = ordered_entries(&tx, playlist_id).await?;
        let current = entries
            .iter()
            .position(|entry| entry.track_id == track_id)
            .ok_or_else(|| anyhow!("Track is not in this playlist"))?;

        if new_position < 0 || new_position >= entries.len() as i32 {
            return Err(anyhow!("Invalid position"));
        }

        if current as i32 != new_position {
            let moved = entries.remove(current);
            entries.insert(new_position as usize, moved);
            write_positions(&tx, entries).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Bumps `updated_at`, which also takes the playlist's row lock until the
/// transaction ends so position changes on one playlist run one at a time.
pub(crate) async fn lock_playlist<C: ConnectionTrait>(
    conn: &C,
    playlist_id: i64,
) -> Result<(), DbErr> {
    playlist::Entity::update_many()
        .col_expr(
            playlist::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(playlist::Column::Id.eq(playlist_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn ordered_entries<C: ConnectionTrait>(
    conn: &C,
    playlist_id: i64,
) -> Result<Vec<playlist_track::Model>, DbErr> {
    playlist_track::Entity::find()
        .filter(playlist_track::Column::PlaylistId.eq(playlist_id))
        .order_by(playlist_track::Column::Position, Order::Asc)
        .all(conn)
        .await
}

/// Closes any gaps so positions run 0..n-1 in their current order.
pub(crate) async fn repack_positions<C: ConnectionTrait>(
    conn: &C,
    playlist_id: i64,
) -> Result<(), DbErr> {
    let entries = ordered_entries(conn, playlist_id).await?;
    write_positions(conn, entries).await
}

/// Gives each entry its index in `entries` as position. Rows that move are
/// parked at negative positions first, keeping `(playlist_id, position)`
/// unique after every statement.
async fn write_positions<C: ConnectionTrait>(
    conn: &C,
    entries: Vec<playlist_track::Model>,
) -> Result<(), DbErr> {
    let moved: Vec<(playlist_track::Model, i32)> = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| (entry, index as i32))
        .filter(|(entry, target)| entry.position != *target)
        .collect();

    for (entry, target) in &moved {
        set_position(conn, entry, -(target + 1)).await?;
    }
    for (entry, target) in &moved {
        set_position(conn, entry, *target).await?;
    }
    Ok(())
}

async fn set_position<C: ConnectionTrait>(
    conn: &C,
    entry: &playlist_track::Model,
    position: i32,
) -> Result<(), DbErr> {
    playlist_track::Entity::update_many()
        .col_expr(playlist_track::Column::Position, Expr::value(position))
        .filter(playlist_track::Column::PlaylistId.eq(entry.playlist_id))
        .filter(playlist_track::Column::TrackId.eq(entry.track_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::ActiveValue;

    use super::*;
    use crate::core::entity::user::Role;
    use crate::data::TrackData;
    use crate::testing;

    async fn positions(data: &PlaylistData, playlist_id: i64) -> Vec<(i64, i32)> {
        data.get_playlist_tracks(playlist_id)
            .await
            .unwrap()
            .into_iter()
            .map(|(entry, _)| (entry.track_id, entry.position))
            .collect()
    }

    #[tokio::test]
    async fn test_positions_stay_unique_and_dense() {
        let db = testing::setup_db().await;
        let owner = testing::create_user(&db, "ann", Role::User).await;
        let genre = testing::create_genre(&db, "Rock").await;
        let data = PlaylistData::new(db.clone());
        let playlist = data
            .create_playlist(playlist::ActiveModel {
                id: ActiveValue::NotSet,
                title: Set("Mix".into()),
                description: Set(String::new()),
                user_id: Set(owner.id),
                visibility: Set(playlist::Visibility::Private),
                cover_image_path: Set(None),
                created_at: Set(chrono::Utc::now()),
                updated_at: Set(None),
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            let track = testing::create_track(&db, title, genre.id, true).await;
            data.append_track(playlist.id, track.id).await.unwrap();
            ids.push(track.id);
        }

        data.reorder_track(playlist.id, ids[0], 3).await.unwrap();
        assert_eq!(
            positions(&data, playlist.id).await,
            vec![(ids[1], 0), (ids[2], 1), (ids[3], 2), (ids[0], 3)]
        );

        data.reorder_track(playlist.id, ids[0], 1).await.unwrap();
        assert_eq!(
            positions(&data, playlist.id).await,
            vec![(ids[1], 0), (ids[0], 1), (ids[2], 2), (ids[3], 3)]
        );

        assert!(data.remove_track_and_reorder(playlist.id, ids[1]).await.unwrap());
        assert_eq!(
            positions(&data, playlist.id).await,
            vec![(ids[0], 0), (ids[2], 1), (ids[3], 2)]
        );

        TrackData::new(db.clone()).delete_track(ids[2]).await.unwrap();
        assert_eq!(
            positions(&data, playlist.id).await,
            vec![(ids[0], 0), (ids[3], 1)]
        );

        let duplicate = playlist_track::ActiveModel {
            playlist_id: Set(playlist.id),
            track_id: Set(ids[1]),
            position: Set(1),
            added_at: Set(chrono::Utc::now()),
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());
    }
}
