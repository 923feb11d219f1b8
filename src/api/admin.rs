use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::track::{TrackForm, form_options};
use crate::api::{parse_id, parse_opt_id, redirect_err, redirect_with, render};
use crate::core::entity::user::Role;
use crate::core::session::Flash;
use crate::server::AppState;
use crate::service::album::AlbumFields;
use crate::service::{Error, Identity, Viewer};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumForm {
    pub id: Option<String>,
    pub title: String,
    pub artist_id: String,
    pub release_date: Option<String>,
    pub cover_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistForm {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub photo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenreForm {
    pub id: Option<String>,
    pub name: String,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match state.admin_svc.dashboard_stats().await {
        Ok(stats) => render(
            &state,
            &viewer,
            "admin/dashboard",
            serde_json::json!({ "stats": stats }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load dashboard").into_response(),
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match state.admin_svc.list_users(query.search.as_deref()).await {
        Ok(users) => render(
            &state,
            &viewer,
            "admin/users",
            serde_json::json!({ "users": users, "search": query.search }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load users").into_response(),
    }
}

async fn change_role(state: &AppState, viewer: &Viewer, identity: &Identity, id: i64, role: Role) -> Redirect {
    match state.admin_svc.change_role(&identity.user, id, role).await {
        Ok(user) => redirect_with(
            state,
            viewer,
            "/admin/users",
            Flash::success(format!("{} is now {:?}", user.username, role)),
        ),
        Err(e) => redirect_err(state, viewer, "/admin/users", e, "Failed to change role"),
    }
}

pub async fn make_user(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Redirect {
    change_role(&state, &viewer, &identity, id, Role::User).await
}

pub async fn make_subscriber(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Redirect {
    change_role(&state, &viewer, &identity, id, Role::Subscriber).await
}

pub async fn make_musician(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Redirect {
    change_role(&state, &viewer, &identity, id, Role::Musician).await
}

pub async fn make_admin(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Redirect {
    change_role(&state, &viewer, &identity, id, Role::Admin).await
}

pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match state.track_svc.list_tracks(query.search.as_deref()).await {
        Ok(tracks) => render(
            &state,
            &viewer,
            "admin/tracks",
            serde_json::json!({ "tracks": tracks, "search": query.search }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load tracks").into_response(),
    }
}

pub async fn new_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match form_options(&state).await {
        Ok(options) => render(
            &state,
            &viewer,
            "admin/track-form",
            serde_json::json!({ "track": null, "options": options }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin/tracks", e, "Failed to load form").into_response(),
    }
}

pub async fn edit_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Response {
    let result = async {
        let track = state.track_svc.get_track(id).await?;
        let options = form_options(&state).await?;
        anyhow::Ok((track, options))
    }
    .await;
    match result {
        Ok((track, options)) => render(
            &state,
            &viewer,
            "admin/track-form",
            serde_json::json!({ "track": track, "options": options }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin/tracks", e, "Failed to load track").into_response(),
    }
}

/// Track page for moderators, including every past decision.
pub async fn track_detail(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Response {
    match state.admin_svc.track_review(id).await {
        Ok(review) => render(&state, &viewer, "admin/track-detail", review).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin/tracks", e, "Failed to load track").into_response(),
    }
}

pub async fn save_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<TrackForm>,
) -> Redirect {
    let result = match form.into_fields() {
        Ok((id, fields)) => state.track_svc.save_track(id, fields, identity.user.id).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(track) => redirect_with(
            &state,
            &viewer,
            "/admin/tracks",
            Flash::success(format!("Track '{}' saved", track.title)),
        ),
        Err(e) => redirect_err(&state, &viewer, "/admin/tracks", e, "Error saving track"),
    }
}

pub async fn delete_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.track_svc.delete_track(id).await {
        Ok(()) => redirect_with(&state, &viewer, "/admin/tracks", Flash::success("Track deleted")),
        Err(e) => redirect_err(&state, &viewer, "/admin/tracks", e, "Error deleting track"),
    }
}

pub async fn approve_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Redirect {
    match state
        .admin_svc
        .approve_track(id, identity.user.id, form.comment)
        .await
    {
        Ok(_) => redirect_with(&state, &viewer, "/admin/moderation", Flash::success("Track approved")),
        Err(e) => redirect_err(&state, &viewer, "/admin/moderation", e, "Error approving track"),
    }
}

pub async fn reject_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Redirect {
    match state
        .admin_svc
        .reject_track(id, identity.user.id, form.comment)
        .await
    {
        Ok(_) => redirect_with(&state, &viewer, "/admin/moderation", Flash::success("Track rejected")),
        Err(e) => redirect_err(&state, &viewer, "/admin/moderation", e, "Error rejecting track"),
    }
}

pub async fn moderation_queue(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match state.admin_svc.pending_tracks().await {
        Ok(tracks) => render(
            &state,
            &viewer,
            "admin/moderation",
            serde_json::json!({ "pending_tracks": tracks }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load moderation queue").into_response(),
    }
}

pub async fn list_albums(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    let result = async {
        let albums = state.album_svc.list_albums().await?;
        let artists = state.artist_svc.list_artists().await?;
        anyhow::Ok((albums, artists))
    }
    .await;
    match result {
        Ok((albums, artists)) => render(
            &state,
            &viewer,
            "admin/albums",
            serde_json::json!({ "albums": albums, "artists": artists }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load albums").into_response(),
    }
}

fn parse_album_form(form: AlbumForm) -> Result<(Option<i64>, AlbumFields), Error> {
    let release_date = match form.release_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => None,
        Some(d) => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| Error::BadRequest("Invalid release date".to_string()))?,
        ),
    };
    Ok((
        parse_opt_id(form.id.as_deref(), "album id")?,
        AlbumFields {
            title: form.title,
            artist_id: parse_id(&form.artist_id, "artist")?,
            release_date,
            cover_path: form.cover_path,
        },
    ))
}

pub async fn save_album(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<AlbumForm>,
) -> Redirect {
    let result = match parse_album_form(form) {
        Ok((id, fields)) => state.album_svc.save_album(id, fields).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(album) => redirect_with(
            &state,
            &viewer,
            "/admin/albums",
            Flash::success(format!("Album '{}' saved", album.title)),
        ),
        Err(e) => redirect_err(&state, &viewer, "/admin/albums", e, "Error saving album"),
    }
}

pub async fn delete_album(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.album_svc.delete_album(id).await {
        Ok(()) => redirect_with(&state, &viewer, "/admin/albums", Flash::success("Album deleted")),
        Err(e) => redirect_err(&state, &viewer, "/admin/albums", e, "Error deleting album"),
    }
}

pub async fn list_artists(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match state.artist_svc.list_artists().await {
        Ok(artists) => render(
            &state,
            &viewer,
            "admin/artists",
            serde_json::json!({ "artists": artists }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load artists").into_response(),
    }
}

pub async fn save_artist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<ArtistForm>,
) -> Redirect {
    let result = match parse_opt_id(form.id.as_deref(), "artist id") {
        Ok(id) => {
            state
                .artist_svc
                .save_artist(id, &form.name, &form.description, form.photo_path)
                .await
        }
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(artist) => redirect_with(
            &state,
            &viewer,
            "/admin/artists",
            Flash::success(format!("Artist '{}' saved", artist.name)),
        ),
        Err(e) => redirect_err(&state, &viewer, "/admin/artists", e, "Error saving artist"),
    }
}

pub async fn delete_artist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.artist_svc.delete_artist(id).await {
        Ok(()) => redirect_with(&state, &viewer, "/admin/artists", Flash::success("Artist deleted")),
        Err(e) => redirect_err(&state, &viewer, "/admin/artists", e, "Error deleting artist"),
    }
}

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match state.genre_svc.list_genres().await {
        Ok(genres) => render(
            &state,
            &viewer,
            "admin/genres",
            serde_json::json!({ "genres": genres }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/admin", e, "Failed to load genres").into_response(),
    }
}

/// A duplicate name comes back as a flash error.
pub async fn save_genre(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<GenreForm>,
) -> Redirect {
    let result = match parse_opt_id(form.id.as_deref(), "genre id") {
        Ok(id) => state.genre_svc.save_genre(id, &form.name).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(genre) => redirect_with(
            &state,
            &viewer,
            "/admin/genres",
            Flash::success(format!("Genre '{}' saved", genre.name)),
        ),
        Err(e) => redirect_err(&state, &viewer, "/admin/genres", e, "Error saving genre"),
    }
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.genre_svc.delete_genre(id).await {
        Ok(()) => redirect_with(&state, &viewer, "/admin/genres", Flash::success("Genre deleted")),
        Err(e) => redirect_err(&state, &viewer, "/admin/genres", e, "Error deleting genre"),
    }
}
