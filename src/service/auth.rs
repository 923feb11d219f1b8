use chrono::Duration;
use uuid::Uuid;

use crate::core::entity::user;
use crate::core::jwt;
use crate::core::session::{Flash, SessionStore};
use crate::data::UserData;
use crate::service::errors::Error;

/// The signed-in user for the current request, freshly loaded from the database.
#[derive(Debug, Clone)]
pub struct Identity {
    pub session_id: Uuid,
    pub user: user::Model,
}

/// Whoever is making the request; anonymous when empty.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Identity>);

impl Viewer {
    pub fn user(&self) -> Option<&user::Model> {
        self.0.as_ref().map(|i| &i.user)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|i| i.session_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|u| u.is_admin())
    }

    pub fn is_musician(&self) -> bool {
        self.user().is_some_and(|u| u.is_musician())
    }

    pub fn can_upload_tracks(&self) -> bool {
        self.user().is_some_and(|u| u.can_upload_tracks())
    }
}

pub struct AuthService {
    sessions: SessionStore,
    users: UserData,
    secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(sessions: SessionStore, users: UserData, secret: String, token_ttl: Duration) -> Self {
        if secret == jwt::DEFAULT_SECRET_KEY {
            tracing::warn!("Session secret is the built-in default; set session.secret in production");
        }
        Self {
            sessions,
            users,
            secret,
            token_ttl,
        }
    }

    /// Opens a session for the user and returns the token that refers to it.
    pub fn login(&self, user: &user::Model) -> anyhow::Result<String> {
        let sid = self.sessions.create(user.id);
        let token = jwt::create_token(sid, user.id, self.token_ttl, &self.secret).map_err(|e| {
            self.sessions.destroy(&sid);
            Error::InternalServerError(e.to_string())
        })?;
        tracing::info!("User logged in: {} (id: {})", user.username, user.id);
        Ok(token)
    }

    pub fn logout(&self, session_id: &Uuid) {
        self.sessions.destroy(session_id);
        tracing::debug!("Session {} closed", session_id);
    }

    /// Maps a token to the current user. Invalid tokens, idle sessions and
    /// deleted users all resolve to None.
    pub async fn resolve(&self, token: &str) -> anyhow::Result<Option<Identity>> {
        let claims = match jwt::verify_token(token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::trace!("Rejected session token: {}", e);
                return Ok(None);
            }
        };

        match self.sessions.resolve(&claims.sid) {
            Some(uid) if uid == claims.uid => {}
            _ => return Ok(None),
        }

        match self.users.find_by_id(claims.uid).await? {
            Some(user) => Ok(Some(Identity {
                session_id: claims.sid,
                user,
            })),
            None => {
                self.sessions.destroy(&claims.sid);
                Ok(None)
            }
        }
    }

    pub fn set_flash(&self, session_id: &Uuid, flash: Flash) {
        self.sessions.set_flash(session_id, flash);
    }

    pub fn take_flash(&self, session_id: &Uuid) -> Option<Flash> {
        self.sessions.take_flash(session_id)
    }

    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::user::Role;
    use crate::testing;

    #[tokio::test]
    async fn test_login_resolve_logout() {
        let db = testing::setup_db().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let auth = AuthService::new(
            SessionStore::new(Duration::minutes(30)),
            UserData::new(db),
            "test-secret".into(),
            Duration::hours(1),
        );

        let token = auth.login(&user).unwrap();
        let identity = auth.resolve(&token).await.unwrap().unwrap();
        assert_eq!(identity.user.id, user.id);

        auth.logout(&identity.session_id);
        assert!(auth.resolve(&token).await.unwrap().is_none());
        assert!(auth.resolve("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_change_is_visible_on_next_request() {
        let db = testing::setup_db().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let users = UserData::new(db.clone());
        let auth = AuthService::new(
            SessionStore::new(Duration::minutes(30)),
            users.clone(),
            "test-secret".into(),
            Duration::hours(1),
        );

        let token = auth.login(&user).unwrap();
        let viewer = Viewer(auth.resolve(&token).await.unwrap());
        assert!(!viewer.is_admin());

        users.update_role(user.id, Role::Admin).await.unwrap();
        let viewer = Viewer(auth.resolve(&token).await.unwrap());
        assert!(viewer.is_admin());
        assert!(viewer.can_upload_tracks());
    }

    #[test]
    fn test_anonymous_viewer() {
        let viewer = Viewer::default();
        assert!(!viewer.is_authenticated());
        assert!(!viewer.is_admin());
        assert!(!viewer.is_musician());
        assert!(!viewer.can_upload_tracks());
        assert_eq!(viewer.user_id(), None);
    }
}
