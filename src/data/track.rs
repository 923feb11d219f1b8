use std::collections::HashMap;

use sea_orm::prelude::*;
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, JoinType, Order, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::core::entity::{album, artist, genre, playlist_track, track};
use crate::data::playlist::{lock_playlist, repack_positions};

/// A track with its catalog references resolved, as shown on listing pages.
#[derive(Debug, Clone, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub track: track::Model,
    pub artist: Option<artist::Model>,
    pub album: Option<album::Model>,
    pub genre: Option<genre::Model>,
    pub duration_formatted: String,
    pub cover_image: String,
}

impl TrackDetail {
    fn new(
        track: track::Model,
        artist: Option<artist::Model>,
        album: Option<album::Model>,
        genre: Option<genre::Model>,
    ) -> Self {
        let cover_image = album
            .as_ref()
            .and_then(|a| a.cover_path.clone())
            .or_else(|| artist.as_ref().and_then(|a| a.photo_path.clone()))
            .unwrap_or_else(|| track::DEFAULT_COVER_IMAGE.to_string());

        Self {
            duration_formatted: track.formatted_duration(),
            track,
            artist,
            album,
            genre,
            cover_image,
        }
    }
}

/// Resolves artist, album and genre for a batch of tracks with one query per table.
pub(crate) async fn load_details<C: ConnectionTrait>(
    conn: &C,
    tracks: Vec<track::Model>,
) -> Result<Vec<TrackDetail>, DbErr> {
    if tracks.is_empty() {
        return Ok(Vec::new());
    }

    let artist_ids: Vec<i64> = tracks.iter().filter_map(|t| t.artist_id).collect();
    let album_ids: Vec<i64> = tracks.iter().filter_map(|t| t.album_id).collect();
    let genre_ids: Vec<i64> = tracks.iter().map(|t| t.genre_id).collect();

    let artists: HashMap<i64, artist::Model> = artist::Entity::find()
        .filter(artist::Column::Id.is_in(artist_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let albums: HashMap<i64, album::Model> = album::Entity::find()
        .filter(album::Column::Id.is_in(album_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let genres: HashMap<i64, genre::Model> = genre::Entity::find()
        .filter(genre::Column::Id.is_in(genre_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    Ok(tracks
        .into_iter()
        .map(|t| {
            let artist = t.artist_id.and_then(|id| artists.get(&id).cloned());
            let album = t.album_id.and_then(|id| albums.get(&id).cloned());
            let genre = genres.get(&t.genre_id).cloned();
            TrackDetail::new(t, artist, album, genre)
        })
        .collect())
}

/// Fields accepted from the admin and upload forms.
#[derive(Debug, Clone)]
pub struct TrackFields {
    pub title: String,
    pub file_path: String,
    pub duration: i32,
    pub genre_id: i64,
    pub album_id: Option<i64>,
    pub artist_id: Option<i64>,
}

#[derive(Clone)]
pub struct TrackData {
    db: DatabaseConnection,
}

impl TrackData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<track::Model>> {
        track::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query track: {}", e))
    }

    pub async fn find_detail(&self, id: i64) -> anyhow::Result<Option<TrackDetail>> {
        let Some(track) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let mut details = self.details(vec![track]).await?;
        Ok(details.pop())
    }

    pub async fn details(&self, tracks: Vec<track::Model>) -> anyhow::Result<Vec<TrackDetail>> {
        load_details(&self.db, tracks)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load track details: {}", e))
    }

    /// Newest moderated tracks first.
    pub async fn latest_moderated(&self, limit: u64) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = track::Entity::find()
            .filter(track::Column::IsModerated.eq(true))
            .order_by(track::Column::Id, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query tracks: {}", e))?;
        self.details(tracks).await
    }

    pub async fn list_all(&self) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = track::Entity::find()
            .order_by(track::Column::Title, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list tracks: {}", e))?;
        self.details(tracks).await
    }

    pub async fn moderated_by_album(&self, album_id: i64) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = track::Entity::find()
            .filter(track::Column::AlbumId.eq(album_id))
            .filter(track::Column::IsModerated.eq(true))
            .order_by(track::Column::Id, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query album tracks: {}", e))?;
        self.details(tracks).await
    }

    pub async fn by_uploader(&self, user_id: i64) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = track::Entity::find()
            .filter(track::Column::UploadedBy.eq(user_id))
            .order_by(track::Column::Id, Order::Desc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query uploads: {}", e))?;
        self.details(tracks).await
    }

    pub async fn similar_moderated(
        &self,
        genre_id: i64,
        exclude_id: i64,
        limit: u64,
    ) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = track::Entity::find()
            .filter(track::Column::GenreId.eq(genre_id))
            .filter(track::Column::Id.ne(exclude_id))
            .filter(track::Column::IsModerated.eq(true))
            .order_by(track::Column::Id, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query similar tracks: {}", e))?;
        self.details(tracks).await
    }

    /// Matches the track title or the artist name.
    pub async fn search(&self, query: &str, moderated_only: bool) -> anyhow::Result<Vec<TrackDetail>> {
        let mut select = track::Entity::find()
            .join(JoinType::LeftJoin, track::Relation::Artist.def())
            .filter(
                Condition::any()
                    .add(track::Column::Title.contains(query))
                    .add(artist::Column::Name.contains(query)),
            );
        if moderated_only {
            select = select.filter(track::Column::IsModerated.eq(true));
        }

        let tracks = select
            .order_by(track::Column::Title, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search tracks: {}", e))?;
        self.details(tracks).await
    }

    pub async fn create_track(
        &self,
        fields: TrackFields,
        uploaded_by: Option<i64>,
        is_moderated: bool,
    ) -> anyhow::Result<track::Model> {
        let model = track::ActiveModel {
            id: ActiveValue::NotSet,
            title: Set(fields.title),
            file_path: Set(fields.file_path),
            duration: Set(fields.duration),
            genre_id: Set(fields.genre_id),
            album_id: Set(fields.album_id),
            artist_id: Set(fields.artist_id),
            is_moderated: Set(is_moderated),
            uploaded_by: Set(uploaded_by),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to insert track: {}", e))
    }

    /// Moderation state and uploader are left untouched.
    pub async fn update_track(
        &self,
        track: track::Model,
        fields: TrackFields,
    ) -> anyhow::Result<track::Model> {
        let mut model: track::ActiveModel = track.into();
        model.title = Set(fields.title);
        model.file_path = Set(fields.file_path);
        model.duration = Set(fields.duration);
        model.genre_id = Set(fields.genre_id);
        model.album_id = Set(fields.album_id);
        model.artist_id = Set(fields.artist_id);
        model
            .update(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update track: {}", e))
    }

    /// Deletes the track and closes the position gaps it leaves in playlists.
    pub async fn delete_track(&self, id: i64) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        let entries = playlist_track::Entity::find()
            .filter(playlist_track::Column::TrackId.eq(id))
            .order_by(playlist_track::Column::PlaylistId, Order::Asc)
            .all(&tx)
            .await?;
        for entry in &entries {
            lock_playlist(&tx, entry.playlist_id).await?;
        }

        playlist_track::Entity::delete_many()
            .filter(playlist_track::Column::TrackId.eq(id))
            .exec(&tx)
            .await?;

        for entry in &entries {
            repack_positions(&tx, entry.playlist_id).await?;
        }

        let res = track::Entity::delete_by_id(id).exec(&tx).await?;

        tx.commit().await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn count_tracks(&self) -> anyhow::Result<u64> {
        track::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count tracks: {}", e))
    }
}
