use serde::Serialize;

use crate::core::entity::moderation::{self, Status};
use crate::core::entity::user::{self, Role};
use crate::data::{
    AlbumData, ArtistData, GenreData, ModerationData, TrackData, TrackDetail, UserData,
};
use crate::service::errors::Error;

pub const DEFAULT_APPROVE_COMMENT: &str = "Track approved";
pub const DEFAULT_REJECT_COMMENT: &str = "Track rejected";

#[derive(Debug, Default, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub admins: u64,
    pub musicians: u64,
    pub total_tracks: u64,
    pub pending_tracks: u64,
    pub artists: u64,
    pub albums: u64,
    pub genres: u64,
}

#[derive(Debug, Serialize)]
pub struct ModerationEntry {
    #[serde(flatten)]
    pub record: moderation::Model,
    pub moderator: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackReview {
    pub track: TrackDetail,
    pub history: Vec<ModerationEntry>,
}

pub struct AdminService {
    users: UserData,
    tracks: TrackData,
    moderations: ModerationData,
    artists: ArtistData,
    albums: AlbumData,
    genres: GenreData,
}

impl AdminService {
    pub fn new(
        users: UserData,
        tracks: TrackData,
        moderations: ModerationData,
        artists: ArtistData,
        albums: AlbumData,
        genres: GenreData,
    ) -> Self {
        Self {
            users,
            tracks,
            moderations,
            artists,
            albums,
            genres,
        }
    }

    pub async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats> {
        Ok(DashboardStats {
            total_users: self.users.count_users().await?,
            admins: self.users.count_by_role(Role::Admin).await?,
            musicians: self.users.count_by_role(Role::Musician).await?,
            total_tracks: self.tracks.count_tracks().await?,
            pending_tracks: self.moderations.pending_tracks().await?.len() as u64,
            artists: self.artists.count_artists().await?,
            albums: self.albums.count_albums().await?,
            genres: self.genres.count_genres().await?,
        })
    }

    pub async fn list_users(&self, search: Option<&str>) -> anyhow::Result<Vec<user::Model>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(q) => self.users.search_users(q).await,
            None => self.users.list_users().await,
        }
    }

    /// Admins cannot take the Admin role away from themselves.
    pub async fn change_role(
        &self,
        actor: &user::Model,
        user_id: i64,
        role: Role,
    ) -> anyhow::Result<user::Model> {
        if actor.id == user_id && role != Role::Admin {
            return Err(Error::Forbidden("You cannot change your own admin role".to_string()).into());
        }

        let user = self
            .users
            .update_role(user_id, role)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        tracing::info!(
            "Role of {} (id: {}) set to {:?} by {}",
            user.username,
            user.id,
            role,
            actor.username
        );
        Ok(user)
    }

    pub async fn approve_track(
        &self,
        track_id: i64,
        moderator_id: i64,
        comment: Option<String>,
    ) -> anyhow::Result<moderation::Model> {
        self.decide(track_id, moderator_id, Status::Approved, comment, DEFAULT_APPROVE_COMMENT)
            .await
    }

    pub async fn reject_track(
        &self,
        track_id: i64,
        moderator_id: i64,
        comment: Option<String>,
    ) -> anyhow::Result<moderation::Model> {
        self.decide(track_id, moderator_id, Status::Rejected, comment, DEFAULT_REJECT_COMMENT)
            .await
    }

    async fn decide(
        &self,
        track_id: i64,
        moderator_id: i64,
        status: Status,
        comment: Option<String>,
        default_comment: &str,
    ) -> anyhow::Result<moderation::Model> {
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_comment.to_string());

        let record = self
            .moderations
            .record_decision(track_id, moderator_id, status, Some(comment))
            .await?
            .ok_or_else(|| Error::NotFound("Track not found".to_string()))?;
        tracing::info!(
            "Track {} marked {:?} by moderator {}",
            track_id,
            status,
            moderator_id
        );
        Ok(record)
    }

    pub async fn pending_tracks(&self) -> anyhow::Result<Vec<TrackDetail>> {
        let tracks = self.moderations.pending_tracks().await?;
        self.tracks.details(tracks).await
    }

    pub async fn track_review(&self, track_id: i64) -> anyhow::Result<TrackReview> {
        let track = self
            .tracks
            .find_detail(track_id)
            .await?
            .ok_or_else(|| Error::NotFound("Track not found".to_string()))?;
        let history = self
            .moderations
            .history(track_id)
            .await?
            .into_iter()
            .map(|(record, moderator)| ModerationEntry {
                record,
                moderator: moderator.map(|m| m.username),
            })
            .collect();
        Ok(TrackReview { track, history })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DatabaseConnection;

    use super::*;
    use crate::testing;

    fn service(db: &DatabaseConnection) -> AdminService {
        AdminService::new(
            UserData::new(db.clone()),
            TrackData::new(db.clone()),
            ModerationData::new(db.clone()),
            ArtistData::new(db.clone()),
            AlbumData::new(db.clone()),
            GenreData::new(db.clone()),
        )
    }

    #[tokio::test]
    async fn test_approve_sets_flag_and_appends_record() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let genre = testing::create_genre(&db, "Rock").await;
        let track = testing::create_track(&db, "Demo", genre.id, false).await;
        let svc = service(&db);

        let record = svc.approve_track(track.id, admin.id, None).await.unwrap();
        assert_eq!(record.status, Status::Approved);
        assert_eq!(record.comment.as_deref(), Some(DEFAULT_APPROVE_COMMENT));

        let review = svc.track_review(track.id).await.unwrap();
        assert!(review.track.track.is_moderated);
        assert_eq!(review.history.len(), 1);
        assert_eq!(review.history[0].moderator.as_deref(), Some("root"));
    }

    #[tokio::test]
    async fn test_missing_track_writes_nothing() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let svc = service(&db);

        let err = svc.approve_track(404, admin.id, None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_queue_excludes_rejected() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let genre = testing::create_genre(&db, "Rock").await;
        let fresh = testing::create_track(&db, "Fresh", genre.id, false).await;
        let rejected = testing::create_track(&db, "Bad", genre.id, false).await;
        let approved = testing::create_track(&db, "Good", genre.id, false).await;
        let svc = service(&db);

        svc.reject_track(rejected.id, admin.id, Some("Low quality".into()))
            .await
            .unwrap();
        svc.approve_track(approved.id, admin.id, None).await.unwrap();

        let pending: Vec<i64> = svc
            .pending_tracks()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.track.id)
            .collect();
        assert_eq!(pending, vec![fresh.id]);

        // re-approval after rejection appends to the history
        svc.approve_track(rejected.id, admin.id, None).await.unwrap();
        let review = svc.track_review(rejected.id).await.unwrap();
        assert!(review.track.track.is_moderated);
        assert_eq!(review.history.len(), 2);
        assert_eq!(review.history[0].record.status, Status::Approved);
        assert_eq!(svc.dashboard_stats().await.unwrap().pending_tracks, 1);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let svc = service(&db);

        let err = svc.change_role(&admin, admin.id, Role::User).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Forbidden(_))));

        let promoted = svc.change_role(&admin, user.id, Role::Musician).await.unwrap();
        assert_eq!(promoted.role, Role::Musician);

        let stats = svc.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.musicians, 1);
    }
}
