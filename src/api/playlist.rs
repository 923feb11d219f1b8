use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;

use crate::api::{parse_id, redirect_err, redirect_with, render};
use crate::core::entity::playlist::Visibility;
use crate::core::session::Flash;
use crate::server::AppState;
use crate::service::playlist::PlaylistFields;
use crate::service::{Error, Identity, Viewer};

#[derive(Debug, Deserialize)]
pub struct PlaylistForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub visibility: Option<String>,
}

impl PlaylistForm {
    fn into_fields(self) -> Result<PlaylistFields, Error> {
        Ok(PlaylistFields {
            title: self.title,
            description: self.description,
            visibility: parse_visibility(self.visibility.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackRef {
    pub track_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderForm {
    pub track_id: String,
    pub position: String,
}

fn parse_visibility(value: Option<&str>) -> Result<Visibility, Error> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("private") => Ok(Visibility::Private),
        Some("public") => Ok(Visibility::Public),
        Some("unlisted") => Ok(Visibility::Unlisted),
        Some(other) => Err(Error::BadRequest(format!("Unknown visibility '{}'", other))),
    }
}

pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
) -> Response {
    match state.playlist_svc.get_user_playlists(identity.user.id).await {
        Ok(playlists) => render(
            &state,
            &viewer,
            "playlists/index",
            serde_json::json!({ "playlists": playlists }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load playlists").into_response(),
    }
}

pub async fn public_playlists(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match state.playlist_svc.get_public_playlists().await {
        Ok(playlists) => render(
            &state,
            &viewer,
            "playlists/public",
            serde_json::json!({ "playlists": playlists }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load playlists").into_response(),
    }
}

pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<PlaylistForm>,
) -> Redirect {
    let result = match form.into_fields() {
        Ok(fields) => state.playlist_svc.create_playlist(identity.user.id, fields).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(playlist) => redirect_with(
            &state,
            &viewer,
            &format!("/playlists/{}", playlist.id),
            Flash::success("Playlist created"),
        ),
        Err(e) => redirect_err(&state, &viewer, "/playlists", e, "Failed to create playlist"),
    }
}

pub async fn get_playlist_by_id(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Response {
    match state.playlist_svc.view_playlist(viewer.user_id(), id).await {
        Ok(view) => render(&state, &viewer, "playlists/view", view).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/playlists", e, "Failed to load playlist").into_response(),
    }
}

pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<PlaylistForm>,
) -> Redirect {
    let result = match form.into_fields() {
        Ok(fields) => state.playlist_svc.update_playlist(identity.user.id, id, fields).await,
        Err(e) => Err(e.into()),
    };
    let to = format!("/playlists/{}", id);
    match result {
        Ok(_) => redirect_with(&state, &viewer, &to, Flash::success("Playlist updated")),
        Err(e) => redirect_err(&state, &viewer, &to, e, "Failed to update playlist"),
    }
}

pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.playlist_svc.delete_playlist(identity.user.id, id).await {
        Ok(()) => redirect_with(&state, &viewer, "/playlists", Flash::success("Playlist deleted")),
        Err(e) => redirect_err(&state, &viewer, "/playlists", e, "Failed to delete playlist"),
    }
}

pub async fn add_track_to_playlist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<TrackRef>,
) -> Redirect {
    let result = match parse_id(&form.track_id, "track") {
        Ok(track_id) => {
            state
                .playlist_svc
                .add_to_playlist(identity.user.id, id, track_id)
                .await
        }
        Err(e) => Err(e.into()),
    };
    let to = format!("/playlists/{}", id);
    match result {
        Ok(()) => redirect_with(&state, &viewer, &to, Flash::success("Track added to playlist")),
        Err(e) => redirect_err(&state, &viewer, &to, e, "Failed to add track"),
    }
}

pub async fn remove_track_from_playlist(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<TrackRef>,
) -> Redirect {
    let result = match parse_id(&form.track_id, "track") {
        Ok(track_id) => {
            state
                .playlist_svc
                .remove_from_playlist(identity.user.id, id, track_id)
                .await
        }
        Err(e) => Err(e.into()),
    };
    let to = format!("/playlists/{}", id);
    match result {
        Ok(()) => redirect_with(&state, &viewer, &to, Flash::success("Track removed from playlist")),
        Err(e) => redirect_err(&state, &viewer, &to, e, "Failed to remove track"),
    }
}

pub async fn reorder_playlist_track(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Form(form): Form<ReorderForm>,
) -> Redirect {
    let parsed = parse_id(&form.track_id, "track").and_then(|track_id| {
        form.position
            .trim()
            .parse::<i32>()
            .map(|position| (track_id, position))
            .map_err(|_| Error::BadRequest("Invalid position".to_string()))
    });
    let result = match parsed {
        Ok((track_id, position)) => {
            state
                .playlist_svc
                .reorder_playlist(identity.user.id, id, track_id, position)
                .await
        }
        Err(e) => Err(e.into()),
    };
    let to = format!("/playlists/{}", id);
    match result {
        Ok(()) => Redirect::to(&to),
        Err(e) => redirect_err(&state, &viewer, &to, e, "Failed to reorder playlist"),
    }
}
