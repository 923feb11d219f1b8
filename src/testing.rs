//! Fixtures shared by the unit tests: an in-memory database with the real
//! schema, row builders and a fully wired application.

use std::sync::Arc;

use axum::Router;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectOptions, Database, DatabaseConnection, Set};

use crate::config::{Config, PoolConfig, SessionConfig};
use crate::core::entity::user::Role;
use crate::core::entity::{artist, genre, track, user};
use crate::core::password::hash_password;
use crate::data::track::TrackFields;
use crate::server::{AppState, build_state, router};

pub const TEST_PASSWORD: &str = "password";

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        max_form_size: bytesize::ByteSize::kib(64),
        database_url: "sqlite::memory:".into(),
        static_dir: "static".into(),
        password_cost: 4,
        pool: PoolConfig::default(),
        session: SessionConfig {
            secret: "test-secret".into(),
            ..Default::default()
        },
        admin: None,
    }
}

pub async fn test_app() -> (DatabaseConnection, Arc<AppState>, Router) {
    let db = setup_db().await;
    let state = build_state(db.clone(), &test_config());
    let app = router(state.clone());
    (db, state, app)
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: Role) -> user::Model {
    user::ActiveModel {
        id: ActiveValue::NotSet,
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set(hash_password(TEST_PASSWORD, 4).await.unwrap()),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_genre(db: &DatabaseConnection, name: &str) -> genre::Model {
    genre::ActiveModel {
        id: ActiveValue::NotSet,
        name: Set(name.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_artist(db: &DatabaseConnection, name: &str) -> artist::Model {
    artist::ActiveModel {
        id: ActiveValue::NotSet,
        name: Set(name.to_string()),
        description: Set(String::new()),
        photo_path: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn track_fields(title: &str, genre_id: i64) -> TrackFields {
    TrackFields {
        title: title.to_string(),
        file_path: format!("/music/{}.mp3", title),
        duration: 180,
        genre_id,
        album_id: None,
        artist_id: None,
    }
}

async fn insert_track(
    db: &DatabaseConnection,
    fields: TrackFields,
    is_moderated: bool,
) -> track::Model {
    track::ActiveModel {
        id: ActiveValue::NotSet,
        title: Set(fields.title),
        file_path: Set(fields.file_path),
        duration: Set(fields.duration),
        genre_id: Set(fields.genre_id),
        album_id: Set(fields.album_id),
        artist_id: Set(fields.artist_id),
        is_moderated: Set(is_moderated),
        uploaded_by: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_track(
    db: &DatabaseConnection,
    title: &str,
    genre_id: i64,
    is_moderated: bool,
) -> track::Model {
    insert_track(db, track_fields(title, genre_id), is_moderated).await
}

pub async fn create_album_track(
    db: &DatabaseConnection,
    title: &str,
    genre_id: i64,
    album_id: i64,
    is_moderated: bool,
) -> track::Model {
    let fields = TrackFields {
        album_id: Some(album_id),
        ..track_fields(title, genre_id)
    };
    insert_track(db, fields, is_moderated).await
}

pub async fn create_artist_track(
    db: &DatabaseConnection,
    title: &str,
    genre_id: i64,
    artist_id: i64,
) -> track::Model {
    let fields = TrackFields {
        artist_id: Some(artist_id),
        ..track_fields(title, genre_id)
    };
    insert_track(db, fields, true).await
}
