use serde::Serialize;

use crate::core::entity::{album, artist, genre, user};
use crate::data::{AlbumData, ArtistData, GenreData, TrackData, TrackDetail, UserData};

#[derive(Debug, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub tracks: Vec<TrackDetail>,
    pub albums: Vec<album::Model>,
    pub artists: Vec<artist::Model>,
    pub genres: Vec<genre::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<user::Model>>,
    pub total: usize,
}

pub struct SearchService {
    tracks: TrackData,
    albums: AlbumData,
    artists: ArtistData,
    genres: GenreData,
    users: UserData,
}

impl SearchService {
    pub fn new(
        tracks: TrackData,
        albums: AlbumData,
        artists: ArtistData,
        genres: GenreData,
        users: UserData,
    ) -> Self {
        Self {
            tracks,
            albums,
            artists,
            genres,
            users,
        }
    }

    /// Substring match over the catalog. Only moderated tracks are returned;
    /// users are searched only when `include_users` is set.
    pub async fn search(&self, query: &str, include_users: bool) -> anyhow::Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        let tracks = self.tracks.search(query, true).await?;
        let albums = self.albums.search_albums(query).await?;
        let artists = self.artists.search_artists(query).await?;
        let genres = self.genres.search_genres(query).await?;
        let users = if include_users {
            Some(self.users.search_users(query).await?)
        } else {
            None
        };

        let total = tracks.len()
            + albums.len()
            + artists.len()
            + genres.len()
            + users.as_ref().map_or(0, Vec::len);
        tracing::debug!("Search '{}' matched {} results", query, total);

        Ok(SearchResults {
            query: query.to_string(),
            tracks,
            albums,
            artists,
            genres,
            users,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::user::Role;
    use crate::testing;

    fn service(db: &sea_orm::DatabaseConnection) -> SearchService {
        SearchService::new(
            TrackData::new(db.clone()),
            AlbumData::new(db.clone()),
            ArtistData::new(db.clone()),
            GenreData::new(db.clone()),
            UserData::new(db.clone()),
        )
    }

    #[tokio::test]
    async fn test_search_skips_unmoderated_tracks() {
        let db = testing::setup_db().await;
        let genre = testing::create_genre(&db, "Blues").await;
        let visible = testing::create_track(&db, "Blue Moon", genre.id, true).await;
        testing::create_track(&db, "Blue Draft", genre.id, false).await;

        let results = service(&db).search("Blue", false).await.unwrap();
        let ids: Vec<i64> = results.tracks.iter().map(|t| t.track.id).collect();
        assert_eq!(ids, vec![visible.id]);
        assert_eq!(results.genres.len(), 1);
        assert!(results.users.is_none());
        assert_eq!(results.total, 2);
    }

    #[tokio::test]
    async fn test_search_matches_artist_name() {
        let db = testing::setup_db().await;
        let genre = testing::create_genre(&db, "Rock").await;
        let artist = testing::create_artist(&db, "Stone Keys").await;
        let track = testing::create_artist_track(&db, "Untitled", genre.id, artist.id).await;

        let results = service(&db).search("Stone", false).await.unwrap();
        assert_eq!(results.tracks.len(), 1);
        assert_eq!(results.tracks[0].track.id, track.id);
        assert_eq!(results.artists.len(), 1);
    }

    #[tokio::test]
    async fn test_albums_match_artist_name() {
        let db = testing::setup_db().await;
        let artist = testing::create_artist(&db, "Stone Keys").await;
        let other = testing::create_artist(&db, "Paper Moon").await;
        let albums = AlbumData::new(db.clone());
        let album = albums
            .save_album(None, "Untitled LP".into(), artist.id, None, None)
            .await
            .unwrap();
        albums
            .save_album(None, "Stone Age".into(), other.id, None, None)
            .await
            .unwrap();

        let results = service(&db).search("Stone", false).await.unwrap();
        let mut titles: Vec<&str> = results.albums.iter().map(|a| a.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Stone Age", "Untitled LP"]);
        assert!(results.albums.iter().any(|a| a.id == album.id));
    }

    #[tokio::test]
    async fn test_users_match_role() {
        let db = testing::setup_db().await;
        testing::create_user(&db, "ann", Role::User).await;
        testing::create_user(&db, "mia", Role::Musician).await;

        let users = service(&db).search("Musician", true).await.unwrap().users.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "mia");
    }

    #[tokio::test]
    async fn test_users_only_for_admin_search() {
        let db = testing::setup_db().await;
        testing::create_user(&db, "melody", Role::User).await;

        let svc = service(&db);
        assert!(svc.search("melo", false).await.unwrap().users.is_none());
        assert_eq!(svc.search("melo", true).await.unwrap().users.unwrap().len(), 1);
        assert_eq!(svc.search("   ", true).await.unwrap().total, 0);
    }
}
