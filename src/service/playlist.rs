use sea_orm::{ActiveValue, IntoActiveModel, Set};
use serde::Serialize;

use crate::core::entity::playlist::{self, Visibility};
use crate::data::{PlaylistData, TrackData, TrackDetail};
use crate::service::errors::Error;

#[derive(Debug, Serialize)]
pub struct PlaylistSummary {
    #[serde(flatten)]
    pub playlist: playlist::Model,
    pub track_count: u64,
}

#[derive(Debug, Serialize)]
pub struct PlaylistEntry {
    pub position: i32,
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub track: TrackDetail,
}

#[derive(Debug, Serialize)]
pub struct PlaylistView {
    pub playlist: playlist::Model,
    pub tracks: Vec<PlaylistEntry>,
    pub track_count: usize,
    pub total_duration: i64,
    pub total_duration_formatted: String,
    pub is_owner: bool,
}

#[derive(Debug, Clone)]
pub struct PlaylistFields {
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
}

pub struct PlaylistService {
    data: PlaylistData,
    tracks: TrackData,
}

impl PlaylistService {
    pub fn new(data: PlaylistData, tracks: TrackData) -> Self {
        Self { data, tracks }
    }

    pub async fn create_playlist(
        &self,
        user_id: i64,
        fields: PlaylistFields,
    ) -> anyhow::Result<playlist::Model> {
        let title = validate_title(&fields.title)?;
        let playlist = playlist::ActiveModel {
            id: ActiveValue::NotSet,
            title: Set(title),
            description: Set(fields.description.trim().to_string()),
            user_id: Set(user_id),
            visibility: Set(fields.visibility),
            cover_image_path: Set(None),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        };
        let playlist = self.data.create_playlist(playlist).await?;
        tracing::debug!("Playlist {} created by user {}", playlist.id, user_id);
        Ok(playlist)
    }

    pub async fn get_user_playlists(&self, user_id: i64) -> anyhow::Result<Vec<PlaylistSummary>> {
        let playlists = self.data.get_user_playlists(user_id).await?;
        self.summarize(playlists).await
    }

    pub async fn get_public_playlists(&self) -> anyhow::Result<Vec<PlaylistSummary>> {
        let playlists = self.data.get_public_playlists().await?;
        self.summarize(playlists).await
    }

    /// Playlist owned by `user_id`; anything else is `NotFound`.
    pub async fn get_playlist(&self, user_id: i64, id: i64) -> anyhow::Result<playlist::Model> {
        let playlist = self
            .data
            .get_playlist(id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or(Error::NotFound("Playlist not found".to_string()))?;
        Ok(playlist)
    }

    /// Owners see every entry; other viewers only moderated tracks of a
    /// public or unlisted playlist.
    pub async fn view_playlist(&self, viewer_id: Option<i64>, id: i64) -> anyhow::Result<PlaylistView> {
        let playlist = self
            .data
            .get_playlist(id)
            .await?
            .filter(|p| match viewer_id {
                Some(uid) => p.is_viewable_by(uid),
                None => p.visibility != Visibility::Private,
            })
            .ok_or(Error::NotFound("Playlist not found".to_string()))?;
        let is_owner = viewer_id == Some(playlist.user_id);

        let rows = self.data.get_playlist_tracks(playlist.id).await?;
        let mut positions = Vec::with_capacity(rows.len());
        let mut models = Vec::with_capacity(rows.len());
        for (entry, track) in rows {
            let Some(track) = track else { continue };
            if !is_owner && !track.is_moderated {
                continue;
            }
            positions.push((entry.position, entry.added_at));
            models.push(track);
        }

        let details = self.tracks.details(models).await?;
        let tracks: Vec<PlaylistEntry> = positions
            .into_iter()
            .zip(details)
            .map(|((position, added_at), track)| PlaylistEntry {
                position,
                added_at,
                track,
            })
            .collect();

        let total_duration: i64 = tracks
            .iter()
            .map(|e| i64::from(e.track.track.duration.max(0)))
            .sum();

        Ok(PlaylistView {
            playlist,
            track_count: tracks.len(),
            total_duration,
            total_duration_formatted: format_total_duration(total_duration),
            tracks,
            is_owner,
        })
    }

    pub async fn update_playlist(
        &self,
        user_id: i64,
        id: i64,
        fields: PlaylistFields,
    ) -> anyhow::Result<playlist::Model> {
        let title = validate_title(&fields.title)?;
        let mut playlist_model = self.get_playlist(user_id, id).await?.into_active_model();
        playlist_model.title = Set(title);
        playlist_model.description = Set(fields.description.trim().to_string());
        playlist_model.visibility = Set(fields.visibility);
        playlist_model.updated_at = Set(Some(chrono::Utc::now()));
        self.data.update_playlist(playlist_model).await
    }

    pub async fn delete_playlist(&self, user_id: i64, id: i64) -> anyhow::Result<()> {
        let playlist = self.get_playlist(user_id, id).await?;
        self.data.delete_playlist(playlist).await?;
        Ok(())
    }

    /// Only moderated tracks can be added.
    pub async fn add_to_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
        track_id: i64,
    ) -> anyhow::Result<()> {
        self.get_playlist(user_id, playlist_id).await?;
        self.tracks
            .find_by_id(track_id)
            .await?
            .filter(|t| t.is_moderated)
            .ok_or(Error::NotFound("Track not found".to_string()))?;

        self.data.append_track(playlist_id, track_id).await?;
        Ok(())
    }

    pub async fn remove_from_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
        track_id: i64,
    ) -> anyhow::Result<()> {
        self.get_playlist(user_id, playlist_id).await?;
        if !self
            .data
            .remove_track_and_reorder(playlist_id, track_id)
            .await?
        {
            return Err(Error::NotFound("Track is not in this playlist".to_string()).into());
        }
        Ok(())
    }

    pub async fn reorder_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
        track_id: i64,
        new_position: i32,
    ) -> anyhow::Result<()> {
        self.get_playlist(user_id, playlist_id).await?;
        self.data
            .get_playlist_entry(playlist_id, track_id)
            .await?
            .ok_or(Error::NotFound("Track is not in this playlist".to_string()))?;

        let count = self.data.get_playlist_track_count(playlist_id).await?;
        if new_position < 0 || new_position as u64 >= count {
            return Err(Error::BadRequest("Invalid position".to_string()).into());
        }

        self.data
            .reorder_track(playlist_id, track_id, new_position)
            .await
    }

    async fn summarize(
        &self,
        playlists: Vec<playlist::Model>,
    ) -> anyhow::Result<Vec<PlaylistSummary>> {
        let mut summaries = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            let track_count = self.data.get_playlist_track_count(playlist.id).await?;
            summaries.push(PlaylistSummary {
                playlist,
                track_count,
            });
        }
        Ok(summaries)
    }
}

fn validate_title(title: &str) -> Result<String, Error> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::BadRequest("Playlist title is required".to_string()));
    }
    Ok(title.to_string())
}

fn format_total_duration(seconds: i64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::user::Role;
    use crate::testing;

    fn fields(title: &str, visibility: Visibility) -> PlaylistFields {
        PlaylistFields {
            title: title.to_string(),
            description: String::new(),
            visibility,
        }
    }

    async fn setup() -> (sea_orm::DatabaseConnection, PlaylistService, i64, Vec<i64>) {
        let db = testing::setup_db().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let genre = testing::create_genre(&db, "Pop").await;
        let mut tracks = Vec::new();
        for i in 0..4 {
            tracks.push(testing::create_track(&db, &format!("T{}", i), genre.id, true).await.id);
        }
        let service = PlaylistService::new(PlaylistData::new(db.clone()), TrackData::new(db.clone()));
        (db, service, user.id, tracks)
    }

    fn order(view: &PlaylistView) -> Vec<(i32, i64)> {
        view.tracks
            .iter()
            .map(|e| (e.position, e.track.track.id))
            .collect()
    }

    #[tokio::test]
    async fn test_add_remove_keeps_positions_dense() {
        let (_db, service, uid, t) = setup().await;
        let playlist = service
            .create_playlist(uid, fields("Mix", Visibility::Private))
            .await
            .unwrap();

        for id in &t {
            service.add_to_playlist(uid, playlist.id, *id).await.unwrap();
        }
        // re-adding is a no-op
        service.add_to_playlist(uid, playlist.id, t[0]).await.unwrap();

        service
            .remove_from_playlist(uid, playlist.id, t[1])
            .await
            .unwrap();
        let view = service.view_playlist(Some(uid), playlist.id).await.unwrap();
        assert_eq!(order(&view), vec![(0, t[0]), (1, t[2]), (2, t[3])]);
        assert_eq!(view.track_count, 3);
        assert_eq!(view.total_duration, 3 * 180);
        assert_eq!(view.total_duration_formatted, "9:00");
    }

    #[tokio::test]
    async fn test_reorder_shifts_neighbours() {
        let (_db, service, uid, t) = setup().await;
        let playlist = service
            .create_playlist(uid, fields("Mix", Visibility::Private))
            .await
            .unwrap();
        for id in &t {
            service.add_to_playlist(uid, playlist.id, *id).await.unwrap();
        }

        service.reorder_playlist(uid, playlist.id, t[0], 2).await.unwrap();
        let view = service.view_playlist(Some(uid), playlist.id).await.unwrap();
        assert_eq!(
            order(&view),
            vec![(0, t[1]), (1, t[2]), (2, t[0]), (3, t[3])]
        );

        service.reorder_playlist(uid, playlist.id, t[3], 0).await.unwrap();
        let view = service.view_playlist(Some(uid), playlist.id).await.unwrap();
        assert_eq!(
            order(&view),
            vec![(0, t[3]), (1, t[1]), (2, t[2]), (3, t[0])]
        );

        assert!(service.reorder_playlist(uid, playlist.id, t[0], 4).await.is_err());
    }

    #[tokio::test]
    async fn test_visibility_rules() {
        let (db, service, uid, t) = setup().await;
        let other = testing::create_user(&db, "bob", Role::User).await;
        let private = service
            .create_playlist(uid, fields("Mine", Visibility::Private))
            .await
            .unwrap();
        let unlisted = service
            .create_playlist(uid, fields("Link", Visibility::Unlisted))
            .await
            .unwrap();
        service.add_to_playlist(uid, unlisted.id, t[0]).await.unwrap();

        assert!(service.view_playlist(Some(other.id), private.id).await.is_err());
        assert!(service.view_playlist(None, private.id).await.is_err());
        let view = service.view_playlist(Some(other.id), unlisted.id).await.unwrap();
        assert!(!view.is_owner);
        assert_eq!(view.track_count, 1);

        // only the owner may modify
        assert!(service.add_to_playlist(other.id, unlisted.id, t[1]).await.is_err());
        assert!(service.delete_playlist(other.id, unlisted.id).await.is_err());
        assert!(service.get_public_playlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmoderated_track_cannot_be_added() {
        let (db, service, uid, _) = setup().await;
        let genre = testing::create_genre(&db, "Noise").await;
        let draft = testing::create_track(&db, "Draft", genre.id, false).await;
        let playlist = service
            .create_playlist(uid, fields("Mix", Visibility::Public))
            .await
            .unwrap();
        assert!(service.add_to_playlist(uid, playlist.id, draft.id).await.is_err());
    }
}
