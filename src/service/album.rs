use chrono::NaiveDate;
use serde::Serialize;

use crate::core::entity::{album, artist};
use crate::data::{AlbumData, ArtistData, TrackData, TrackDetail};
use crate::service::errors::Error;

pub const NEW_RELEASES_LIMIT: u64 = 8;
pub const OTHER_ALBUMS_LIMIT: usize = 4;

#[derive(Debug, Serialize)]
pub struct AlbumSummary {
    #[serde(flatten)]
    pub album: album::Model,
    pub artist: Option<artist::Model>,
}

#[derive(Debug, Serialize)]
pub struct AlbumPage {
    pub album: album::Model,
    pub artist: Option<artist::Model>,
    pub tracks: Vec<TrackDetail>,
    pub other_albums: Vec<album::Model>,
}

#[derive(Debug, Clone)]
pub struct AlbumFields {
    pub title: String,
    pub artist_id: i64,
    pub release_date: Option<NaiveDate>,
    pub cover_path: Option<String>,
}

pub struct AlbumService {
    albums: AlbumData,
    artists: ArtistData,
    tracks: TrackData,
}

impl AlbumService {
    pub fn new(albums: AlbumData, artists: ArtistData, tracks: TrackData) -> Self {
        Self {
            albums,
            artists,
            tracks,
        }
    }

    pub async fn new_releases(&self) -> anyhow::Result<Vec<album::Model>> {
        self.albums.new_releases(NEW_RELEASES_LIMIT).await
    }

    pub async fn list_albums(&self) -> anyhow::Result<Vec<AlbumSummary>> {
        let albums = self.albums.list_albums().await?;
        Ok(albums
            .into_iter()
            .map(|(album, artist)| AlbumSummary { album, artist })
            .collect())
    }

    /// Album with its moderated tracks and a few more albums by the same artist.
    pub async fn album_page(&self, id: i64) -> anyhow::Result<AlbumPage> {
        let (album, artist) = self
            .albums
            .find_with_artist(id)
            .await?
            .ok_or_else(|| Error::NotFound("Album not found".to_string()))?;

        let tracks = self.tracks.moderated_by_album(album.id).await?;
        let other_albums = self
            .albums
            .find_by_artist(album.artist_id)
            .await?
            .into_iter()
            .filter(|a| a.id != album.id)
            .take(OTHER_ALBUMS_LIMIT)
            .collect();

        Ok(AlbumPage {
            album,
            artist,
            tracks,
            other_albums,
        })
    }

    pub async fn first_track(&self, album_id: i64) -> anyhow::Result<Option<TrackDetail>> {
        if self.albums.find_by_id(album_id).await?.is_none() {
            return Err(Error::NotFound("Album not found".to_string()).into());
        }
        Ok(self
            .tracks
            .moderated_by_album(album_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn save_album(&self, id: Option<i64>, fields: AlbumFields) -> anyhow::Result<album::Model> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(Error::BadRequest("Album title is required".to_string()).into());
        }
        if self.artists.find_by_id(fields.artist_id).await?.is_none() {
            return Err(Error::BadRequest("Unknown artist".to_string()).into());
        }
        if let Some(id) = id {
            if self.albums.find_by_id(id).await?.is_none() {
                return Err(Error::NotFound("Album not found".to_string()).into());
            }
        }

        let cover_path = fields.cover_path.filter(|p| !p.trim().is_empty());
        let album = self
            .albums
            .save_album(id, title.to_string(), fields.artist_id, fields.release_date, cover_path)
            .await?;
        tracing::info!("Album saved: {} (id: {})", album.title, album.id);
        Ok(album)
    }

    pub async fn delete_album(&self, id: i64) -> anyhow::Result<()> {
        if !self.albums.delete_album(id).await? {
            return Err(Error::NotFound("Album not found".to_string()).into());
        }
        tracing::info!("Album {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn service(db: &sea_orm::DatabaseConnection) -> AlbumService {
        AlbumService::new(
            AlbumData::new(db.clone()),
            ArtistData::new(db.clone()),
            TrackData::new(db.clone()),
        )
    }

    #[tokio::test]
    async fn test_album_page_lists_moderated_tracks_and_other_albums() {
        let db = testing::setup_db().await;
        let svc = service(&db);
        let genre = testing::create_genre(&db, "Rock").await;
        let artist = testing::create_artist(&db, "The Band").await;

        let mut ids = Vec::new();
        for i in 0..6 {
            let album = svc
                .save_album(
                    None,
                    AlbumFields {
                        title: format!("Album {}", i),
                        artist_id: artist.id,
                        release_date: NaiveDate::from_ymd_opt(2020 + i, 1, 1),
                        cover_path: Some("/images/cover.jpg".into()),
                    },
                )
                .await
                .unwrap();
            ids.push(album.id);
        }

        let visible = testing::create_album_track(&db, "Song", genre.id, ids[0], true).await;
        testing::create_album_track(&db, "Draft", genre.id, ids[0], false).await;

        let page = svc.album_page(ids[0]).await.unwrap();
        assert_eq!(page.tracks.len(), 1);
        assert_eq!(page.tracks[0].track.id, visible.id);
        assert_eq!(page.tracks[0].cover_image, "/images/cover.jpg");
        assert_eq!(page.other_albums.len(), OTHER_ALBUMS_LIMIT);
        assert!(page.other_albums.iter().all(|a| a.id != ids[0]));

        let first = svc.first_track(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.track.id, visible.id);
        assert!(svc.first_track(ids[1]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_releases_put_undated_last() {
        let db = testing::setup_db().await;
        let svc = service(&db);
        let artist = testing::create_artist(&db, "Solo").await;

        for (title, date) in [
            ("Undated", None),
            ("Old", NaiveDate::from_ymd_opt(2001, 5, 1)),
            ("New", NaiveDate::from_ymd_opt(2024, 5, 1)),
        ] {
            svc.save_album(
                None,
                AlbumFields {
                    title: title.into(),
                    artist_id: artist.id,
                    release_date: date,
                    cover_path: None,
                },
            )
            .await
            .unwrap();
        }

        let titles: Vec<String> = svc
            .new_releases()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
    }
}
