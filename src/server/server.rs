use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::core::session::SessionStore;
use crate::data::{
    AlbumData, ArtistData, GenreData, ModerationData, PlaylistData, SubscriptionData, TrackData,
    UserData,
};
use crate::server::auth;
use crate::service::*;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let host = config.host.clone();
    let port = config.port;
    let server_url = format!("{host}:{port}");

    tracing::info!("Server starting at {server_url}");

    let mut options = ConnectOptions::new(&config.database_url);
    options
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .connect_timeout(config.pool.connect_timeout())
        .idle_timeout(config.pool.idle_timeout())
        .max_lifetime(config.pool.max_lifetime())
        .sqlx_logging(config.pool.sqlx_logging);

    let db = Database::connect(options)
        .await
        .context("Failed to connect to database")?;
    Migrator::up(&db, None)
        .await
        .context("Failed to run database migrations")?;

    let state = build_state(db, &config);

    if let Some(admin) = &config.admin {
        state
            .user_svc
            .ensure_admin(admin)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    spawn_housekeeping(
        state.clone(),
        Duration::from_secs(config.session.sweep_interval_secs.max(1)),
    );

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server_url)
        .await
        .context("Listening failed")?;

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}

pub(crate) fn build_state(db: DatabaseConnection, config: &Config) -> Arc<AppState> {
    // Create data layer instances
    let user_data = UserData::new(db.clone());
    let artist_data = ArtistData::new(db.clone());
    let genre_data = GenreData::new(db.clone());
    let album_data = AlbumData::new(db.clone());
    let track_data = TrackData::new(db.clone());
    let playlist_data = PlaylistData::new(db.clone());
    let subscription_data = SubscriptionData::new(db.clone());
    let moderation_data = ModerationData::new(db);

    // Create service layer instances with data layer dependencies
    let sessions = SessionStore::new(chrono::Duration::minutes(
        config.session.idle_timeout_minutes,
    ));
    let auth_svc = Arc::new(AuthService::new(
        sessions,
        user_data.clone(),
        config.session.secret.clone(),
        chrono::Duration::hours(config.session.token_ttl_hours),
    ));
    let user_svc = Arc::new(UserService::new(user_data.clone(), config.password_cost));
    let track_svc = Arc::new(TrackService::new(
        track_data.clone(),
        genre_data.clone(),
        album_data.clone(),
        artist_data.clone(),
    ));
    let album_svc = Arc::new(AlbumService::new(
        album_data.clone(),
        artist_data.clone(),
        track_data.clone(),
    ));
    let artist_svc = Arc::new(ArtistService::new(artist_data.clone()));
    let genre_svc = Arc::new(GenreService::new(genre_data.clone()));
    let playlist_svc = Arc::new(PlaylistService::new(playlist_data, track_data.clone()));
    let subscription_svc = Arc::new(SubscriptionService::new(subscription_data));
    let admin_svc = Arc::new(AdminService::new(
        user_data.clone(),
        track_data.clone(),
        moderation_data,
        artist_data.clone(),
        album_data.clone(),
        genre_data.clone(),
    ));
    let search_svc = Arc::new(SearchService::new(
        track_data,
        album_data,
        artist_data,
        genre_data,
        user_data,
    ));

    Arc::new(AppState {
        auth_svc,
        user_svc,
        track_svc,
        album_svc,
        artist_svc,
        genre_svc,
        playlist_svc,
        subscription_svc,
        admin_svc,
        search_svc,
        config: config.clone(),
    })
}

/// Purges idle sessions and expires lapsed subscriptions on a fixed interval.
fn spawn_housekeeping(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = state.auth_svc.purge_expired_sessions();
            if purged > 0 {
                tracing::debug!("Purged {} idle sessions", purged);
            }
            if let Err(e) = state.subscription_svc.check_expired_subscriptions().await {
                tracing::error!("Subscription sweep failed: {}", e);
            }
        }
    });
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .max_age(Duration::from_secs(3600));

    let static_dir = std::path::PathBuf::from(&state.config.static_dir);

    let public_routes = Router::new()
        .route("/", get(api::home::index))
        .route(
            "/account/login",
            get(api::account::login_page).post(api::account::login),
        )
        .route(
            "/account/register",
            get(api::account::register_page).post(api::account::register),
        )
        .route("/subscription/plans", get(api::subscription::plans))
        .nest_service("/css", ServeDir::new(static_dir.join("css")))
        .nest_service("/js", ServeDir::new(static_dir.join("js")))
        .nest_service("/images", ServeDir::new(static_dir.join("images")));

    let protected_routes = Router::new()
        .route("/account/profile", get(api::account::profile))
        .route("/account/password", post(api::account::change_password))
        .route("/account/logout", post(api::account::logout))
        .route("/search", get(api::home::search))
        .route("/album/{id}", get(api::album::view))
        .route("/album/api/{id}", get(api::album::api))
        .route("/album/{id}/play", get(api::album::play))
        .route("/tracks/{id}", get(api::track::view))
        .route(
            "/playlists",
            get(api::playlist::list_playlists).post(api::playlist::create_playlist),
        )
        .route("/playlists/public", get(api::playlist::public_playlists))
        .route(
            "/playlists/{id}",
            get(api::playlist::get_playlist_by_id).post(api::playlist::update_playlist),
        )
        .route("/playlists/{id}/delete", post(api::playlist::delete_playlist))
        .route(
            "/playlists/{id}/tracks/add",
            post(api::playlist::add_track_to_playlist),
        )
        .route(
            "/playlists/{id}/tracks/remove",
            post(api::playlist::remove_track_from_playlist),
        )
        .route(
            "/playlists/{id}/tracks/reorder",
            post(api::playlist::reorder_playlist_track),
        )
        .route(
            "/subscription/create",
            get(api::subscription::create_page).post(api::subscription::create),
        )
        .route("/subscription/success", get(api::subscription::success))
        .route("/subscription/my", get(api::subscription::my_subscriptions))
        .route("/subscription/cancel", post(api::subscription::cancel))
        .route_layer(middleware::from_fn(auth::auth));

    let upload_routes = Router::new()
        .route("/tracks/mine", get(api::track::mine))
        .route(
            "/tracks/upload",
            get(api::track::upload_page).post(api::track::upload),
        )
        .route_layer(middleware::from_fn(auth::can_upload))
        .route_layer(middleware::from_fn(auth::auth));

    let admin_routes = Router::new()
        .route("/admin", get(api::admin::dashboard))
        .route("/admin/users", get(api::admin::list_users))
        .route("/admin/users/{id}/make-user", post(api::admin::make_user))
        .route(
            "/admin/users/{id}/make-subscriber",
            post(api::admin::make_subscriber),
        )
        .route(
            "/admin/users/{id}/make-musician",
            post(api::admin::make_musician),
        )
        .route("/admin/users/{id}/make-admin", post(api::admin::make_admin))
        .route("/admin/tracks", get(api::admin::list_tracks))
        .route("/admin/tracks/new", get(api::admin::new_track))
        .route("/admin/tracks/save", post(api::admin::save_track))
        .route("/admin/tracks/edit/{id}", get(api::admin::edit_track))
        .route("/admin/tracks/delete/{id}", post(api::admin::delete_track))
        .route("/admin/tracks/{id}", get(api::admin::track_detail))
        .route("/admin/tracks/{id}/approve", post(api::admin::approve_track))
        .route("/admin/tracks/{id}/reject", post(api::admin::reject_track))
        .route("/admin/moderation", get(api::admin::moderation_queue))
        .route("/admin/albums", get(api::admin::list_albums))
        .route("/admin/albums/save", post(api::admin::save_album))
        .route("/admin/albums/delete/{id}", post(api::admin::delete_album))
        .route("/admin/artists", get(api::admin::list_artists))
        .route("/admin/artists/save", post(api::admin::save_artist))
        .route("/admin/artists/delete/{id}", post(api::admin::delete_artist))
        .route("/admin/genres", get(api::admin::list_genres))
        .route("/admin/genres/save", post(api::admin::save_genre))
        .route("/admin/genres/delete/{id}", post(api::admin::delete_genre))
        .route_layer(middleware::from_fn(auth::auth_admin))
        .route_layer(middleware::from_fn(auth::auth));

    public_routes
        .merge(protected_routes)
        .merge(upload_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth::identify))
        .layer(DefaultBodyLimit::max(state.config.max_form_size.as_u64() as usize))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) auth_svc: Arc<AuthService>,
    pub(crate) user_svc: Arc<UserService>,
    pub(crate) track_svc: Arc<TrackService>,
    pub(crate) album_svc: Arc<AlbumService>,
    pub(crate) artist_svc: Arc<ArtistService>,
    pub(crate) genre_svc: Arc<GenreService>,
    pub(crate) playlist_svc: Arc<PlaylistService>,
    pub(crate) subscription_svc: Arc<SubscriptionService>,
    pub(crate) admin_svc: Arc<AdminService>,
    pub(crate) search_svc: Arc<SearchService>,
    pub(crate) config: Config,
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::core::entity::user::Role;
    use crate::testing;

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_admin_routes_are_guarded() {
        let (db, state, app) = testing::test_app().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let user_token = state.auth_svc.login(&user).unwrap();
        let admin_token = state.auth_svc.login(&admin).unwrap();

        let resp = app.clone().oneshot(get("/admin/users", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/account/login");

        for uri in ["/admin", "/admin/users", "/admin/moderation", "/admin/genres"] {
            let resp = app.clone().oneshot(get(uri, Some(&user_token))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
        let resp = app
            .clone()
            .oneshot(post_form("/admin/users/1/make-admin", Some(&user_token), ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app.clone().oneshot(get("/admin", Some(&admin_token))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["view"], "admin/dashboard");
        assert_eq!(body["stats"]["total_users"], 2);
    }

    #[tokio::test]
    async fn test_public_and_protected_pages() {
        let (_db, _state, app) = testing::test_app().await;

        let resp = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["view"], "index");
        assert_eq!(body["viewer"]["authenticated"], false);

        let resp = app.clone().oneshot(get("/subscription/plans", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        for uri in ["/playlists", "/search?query=x", "/subscription/my", "/tracks/mine"] {
            let resp = app.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(location(&resp), "/account/login");
        }
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_logout_clears_session() {
        let (db, _state, app) = testing::test_app().await;
        testing::create_user(&db, "ann", Role::User).await;

        let resp = app
            .clone()
            .oneshot(post_form("/account/login", None, "username=ann&password=wrong"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/account/login?error");

        let body = format!("username=ann%40example.com&password={}", testing::TEST_PASSWORD);
        let resp = app
            .clone()
            .oneshot(post_form("/account/login", None, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        let cookie = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("HttpOnly"));
        let cookie = cookie.split(';').next().unwrap().to_string();

        let profile = || {
            Request::builder()
                .uri("/account/profile")
                .header(COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap()
        };
        let resp = app.clone().oneshot(profile()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["user"]["username"], "ann");

        let logout = Request::builder()
            .method("POST")
            .uri("/account/logout")
            .header(COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(logout).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = app.clone().oneshot(profile()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_upload_requires_musician() {
        let (db, state, app) = testing::test_app().await;
        let genre = testing::create_genre(&db, "Rock").await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let musician = testing::create_user(&db, "mia", Role::Musician).await;
        let user_token = state.auth_svc.login(&user).unwrap();
        let musician_token = state.auth_svc.login(&musician).unwrap();

        let form = format!("title=Demo&file_path=%2Fmusic%2Fdemo.mp3&duration=200&genre_id={}", genre.id);
        let resp = app
            .clone()
            .oneshot(post_form("/tracks/upload", Some(&user_token), &form))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app
            .clone()
            .oneshot(post_form("/tracks/upload", Some(&musician_token), &form))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/tracks/mine");

        let resp = app
            .clone()
            .oneshot(get("/tracks/mine", Some(&musician_token)))
            .await
            .unwrap();
        let body = json(resp).await;
        assert_eq!(body["flash"]["kind"], "success");
        assert_eq!(body["tracks"][0]["title"], "Demo");
        assert_eq!(body["tracks"][0]["is_moderated"], false);

        // not public until approved
        let resp = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(json(resp).await["popular_tracks"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_album_api() {
        let (db, state, app) = testing::test_app().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let token = state.auth_svc.login(&user).unwrap();
        let genre = testing::create_genre(&db, "Rock").await;
        let artist = testing::create_artist(&db, "The Band").await;
        let album = state
            .album_svc
            .save_album(
                None,
                crate::service::album::AlbumFields {
                    title: "First".into(),
                    artist_id: artist.id,
                    release_date: None,
                    cover_path: None,
                },
            )
            .await
            .unwrap();
        testing::create_album_track(&db, "One", genre.id, album.id, true).await;
        testing::create_album_track(&db, "Draft", genre.id, album.id, false).await;

        let resp = app
            .clone()
            .oneshot(get(&format!("/album/api/{}", album.id), Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["trackCount"], 1);
        assert_eq!(body["album"]["title"], "First");

        let resp = app
            .clone()
            .oneshot(get("/album/api/999", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Album not found");
    }

    #[tokio::test]
    async fn test_duplicate_genre_flashes_error() {
        let (db, state, app) = testing::test_app().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let token = state.auth_svc.login(&admin).unwrap();

        let resp = app
            .clone()
            .oneshot(post_form("/admin/genres/save", Some(&token), "name=Jazz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = app
            .clone()
            .oneshot(post_form("/admin/genres/save", Some(&token), "name=Jazz"))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/admin/genres");

        let resp = app.clone().oneshot(get("/admin/genres", Some(&token))).await.unwrap();
        let body = json(resp).await;
        assert_eq!(body["flash"]["kind"], "error");
        assert_eq!(body["genres"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_moderation_flow_over_http() {
        let (db, state, app) = testing::test_app().await;
        let admin = testing::create_user(&db, "root", Role::Admin).await;
        let token = state.auth_svc.login(&admin).unwrap();
        let genre = testing::create_genre(&db, "Rock").await;
        let track = testing::create_track(&db, "Demo", genre.id, false).await;

        let resp = app.clone().oneshot(get("/admin/moderation", Some(&token))).await.unwrap();
        assert_eq!(json(resp).await["pending_tracks"].as_array().unwrap().len(), 1);

        let resp = app
            .clone()
            .oneshot(post_form(
                &format!("/admin/tracks/{}/approve", track.id),
                Some(&token),
                "comment=",
            ))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/admin/moderation");

        let resp = app
            .clone()
            .oneshot(get(&format!("/admin/tracks/{}", track.id), Some(&token)))
            .await
            .unwrap();
        let body = json(resp).await;
        assert_eq!(body["track"]["is_moderated"], true);
        assert_eq!(body["history"][0]["status"], "Approved");
        assert_eq!(body["history"][0]["comment"], "Track approved");

        let resp = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(json(resp).await["popular_tracks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_accepts_extra_fields() {
        let (db, state, app) = testing::test_app().await;
        let user = testing::create_user(&db, "ann", Role::User).await;
        let token = state.auth_svc.login(&user).unwrap();

        let form = "plan=family&period=yearly&card_number=4111111111111111&card_expiry=12%2F30\
                    &card_cvc=123&card_name=Ann&promo_code=SPRING";
        let resp = app
            .clone()
            .oneshot(post_form("/subscription/create", Some(&token), form))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/subscription/success");

        let resp = app
            .clone()
            .oneshot(get("/subscription/my", Some(&token)))
            .await
            .unwrap();
        let body = json(resp).await;
        assert_eq!(body["active_subscription"]["status"], "active");
        assert_eq!(body["active_subscription"]["amount_cents"], 44_900 * 12);
    }
}
