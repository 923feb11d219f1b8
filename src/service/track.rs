use serde::Serialize;

use crate::core::entity::track;
use crate::data::track::TrackFields;
use crate::data::{AlbumData, ArtistData, GenreData, TrackData, TrackDetail};
use crate::service::auth::Viewer;
use crate::service::errors::Error;

pub const POPULAR_TRACKS_LIMIT: u64 = 10;
pub const SIMILAR_TRACKS_LIMIT: u64 = 5;

#[derive(Debug, Serialize)]
pub struct TrackPage {
    pub track: TrackDetail,
    pub similar_tracks: Vec<TrackDetail>,
}

pub struct TrackService {
    tracks: TrackData,
    genres: GenreData,
    albums: AlbumData,
    artists: ArtistData,
}

impl TrackService {
    pub fn new(tracks: TrackData, genres: GenreData, albums: AlbumData, artists: ArtistData) -> Self {
        Self {
            tracks,
            genres,
            albums,
            artists,
        }
    }

    pub async fn popular_tracks(&self) -> anyhow::Result<Vec<TrackDetail>> {
        self.tracks.latest_moderated(POPULAR_TRACKS_LIMIT).await
    }

    /// Unmoderated tracks are only visible to admins and their uploader.
    pub async fn track_page(&self, id: i64, viewer: &Viewer) -> anyhow::Result<TrackPage> {
        let detail = self
            .tracks
            .find_detail(id)
            .await?
            .filter(|d| {
                d.track.is_moderated
                    || viewer.is_admin()
                    || (d.track.uploaded_by.is_some() && d.track.uploaded_by == viewer.user_id())
            })
            .ok_or_else(|| Error::NotFound("Track not found".to_string()))?;

        let similar_tracks = self
            .tracks
            .similar_moderated(detail.track.genre_id, detail.track.id, SIMILAR_TRACKS_LIMIT)
            .await?;

        Ok(TrackPage {
            track: detail,
            similar_tracks,
        })
    }

    pub async fn get_track(&self, id: i64) -> anyhow::Result<TrackDetail> {
        self.tracks
            .find_detail(id)
            .await?
            .ok_or_else(|| Error::NotFound("Track not found".to_string()).into())
    }

    pub async fn tracks_by_uploader(&self, user_id: i64) -> anyhow::Result<Vec<TrackDetail>> {
        self.tracks.by_uploader(user_id).await
    }

    /// Uploaded tracks wait for moderation before they become public.
    pub async fn upload_track(
        &self,
        user_id: i64,
        fields: TrackFields,
    ) -> anyhow::Result<track::Model> {
        self.validate(&fields).await?;
        let track = self.tracks.create_track(fields, Some(user_id), false).await?;
        tracing::info!("Track uploaded: {} (id: {}) by user {}", track.title, track.id, user_id);
        Ok(track)
    }

    pub async fn list_tracks(&self, search: Option<&str>) -> anyhow::Result<Vec<TrackDetail>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(q) => self.tracks.search(q, false).await,
            None => self.tracks.list_all().await,
        }
    }

    /// Admin save: creates when `id` is None. New tracks from this path are
    /// unmoderated like uploads.
    pub async fn save_track(
        &self,
        id: Option<i64>,
        fields: TrackFields,
        saved_by: i64,
    ) -> anyhow::Result<track::Model> {
        self.validate(&fields).await?;
        match id {
            Some(id) => {
                let existing = self
                    .tracks
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| Error::NotFound("Track not found".to_string()))?;
                self.tracks.update_track(existing, fields).await
            }
            None => self.tracks.create_track(fields, Some(saved_by), false).await,
        }
    }

    pub async fn delete_track(&self, id: i64) -> anyhow::Result<()> {
        if !self.tracks.delete_track(id).await? {
            return Err(Error::NotFound("Track not found".to_string()).into());
        }
        tracing::info!("Track {} deleted", id);
        Ok(())
    }

    async fn validate(&self, fields: &TrackFields) -> anyhow::Result<()> {
        if fields.title.trim().is_empty() {
            return Err(Error::BadRequest("Title is required".to_string()).into());
        }
        if fields.file_path.trim().is_empty() {
            return Err(Error::BadRequest("File path is required".to_string()).into());
        }
        if fields.duration < 0 {
            return Err(Error::BadRequest("Duration cannot be negative".to_string()).into());
        }
        if self.genres.find_by_id(fields.genre_id).await?.is_none() {
            return Err(Error::BadRequest("Unknown genre".to_string()).into());
        }
        if let Some(album_id) = fields.album_id {
            if self.albums.find_by_id(album_id).await?.is_none() {
                return Err(Error::BadRequest("Unknown album".to_string()).into());
            }
        }
        if let Some(artist_id) = fields.artist_id {
            if self.artists.find_by_id(artist_id).await?.is_none() {
                return Err(Error::BadRequest("Unknown artist".to_string()).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::user::Role;
    use crate::service::auth::Identity;
    use crate::testing;

    fn service(db: &sea_orm::DatabaseConnection) -> TrackService {
        TrackService::new(
            TrackData::new(db.clone()),
            GenreData::new(db.clone()),
            AlbumData::new(db.clone()),
            ArtistData::new(db.clone()),
        )
    }

    fn viewer(user: crate::core::entity::user::Model) -> Viewer {
        Viewer(Some(Identity {
            session_id: uuid::Uuid::new_v4(),
            user,
        }))
    }

    #[tokio::test]
    async fn test_unmoderated_track_is_hidden() {
        let db = testing::setup_db().await;
        let genre = testing::create_genre(&db, "Rock").await;
        let musician = testing::create_user(&db, "mia", Role::Musician).await;
        let other = testing::create_user(&db, "bob", Role::User).await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let svc = service(&db);

        let track = svc
            .upload_track(musician.id, testing::track_fields("Demo", genre.id))
            .await
            .unwrap();
        assert!(!track.is_moderated);

        assert!(svc.popular_tracks().await.unwrap().is_empty());
        assert!(svc.track_page(track.id, &Viewer::default()).await.is_err());
        assert!(svc.track_page(track.id, &viewer(other)).await.is_err());
        assert!(svc.track_page(track.id, &viewer(musician)).await.is_ok());
        assert!(svc.track_page(track.id, &viewer(admin)).await.is_ok());
    }

    #[tokio::test]
    async fn test_track_page_cover_and_similar() {
        let db = testing::setup_db().await;
        let genre = testing::create_genre(&db, "Jazz").await;
        let svc = service(&db);

        let main = testing::create_track(&db, "Main", genre.id, true).await;
        for i in 0..7 {
            testing::create_track(&db, &format!("Other {}", i), genre.id, true).await;
        }
        testing::create_track(&db, "Hidden", genre.id, false).await;

        let page = svc.track_page(main.id, &Viewer::default()).await.unwrap();
        assert_eq!(page.track.cover_image, track::DEFAULT_COVER_IMAGE);
        assert_eq!(page.similar_tracks.len(), SIMILAR_TRACKS_LIMIT as usize);
        assert!(page
            .similar_tracks
            .iter()
            .all(|t| t.track.is_moderated && t.track.id != main.id));
    }

    #[tokio::test]
    async fn test_upload_requires_known_genre() {
        let db = testing::setup_db().await;
        let musician = testing::create_user(&db, "mia", Role::Musician).await;
        let svc = service(&db);

        let err = svc
            .upload_track(musician.id, testing::track_fields("Demo", 999))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::BadRequest(_))));
    }
}
