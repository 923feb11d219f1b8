use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};

use crate::api::{parse_id, parse_opt_id, redirect_err, redirect_with, render};
use crate::core::entity::{artist, genre};
use crate::core::session::Flash;
use crate::data::track::TrackFields;
use crate::server::AppState;
use crate::service::album::AlbumSummary;
use crate::service::{Error, Identity, Viewer};

/// Track metadata as posted by the upload and admin forms.
#[derive(Debug, Deserialize)]
pub struct TrackForm {
    pub id: Option<String>,
    pub title: String,
    pub file_path: String,
    pub duration: Option<String>,
    pub genre_id: String,
    pub album_id: Option<String>,
    pub artist_id: Option<String>,
}

impl TrackForm {
    pub fn into_fields(self) -> Result<(Option<i64>, TrackFields), Error> {
        let id = parse_opt_id(self.id.as_deref(), "track id")?;
        let duration = match self.duration.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            None => 0,
            Some(d) => d
                .parse()
                .map_err(|_| Error::BadRequest("Invalid duration".to_string()))?,
        };
        let fields = TrackFields {
            title: self.title.trim().to_string(),
            file_path: self.file_path.trim().to_string(),
            duration,
            genre_id: parse_id(&self.genre_id, "genre")?,
            album_id: parse_opt_id(self.album_id.as_deref(), "album")?,
            artist_id: parse_opt_id(self.artist_id.as_deref(), "artist")?,
        };
        Ok((id, fields))
    }
}

/// Choices offered by track forms.
#[derive(Debug, Serialize)]
pub struct TrackFormOptions {
    pub genres: Vec<genre::Model>,
    pub albums: Vec<AlbumSummary>,
    pub artists: Vec<artist::Model>,
}

pub async fn form_options(state: &AppState) -> anyhow::Result<TrackFormOptions> {
    Ok(TrackFormOptions {
        genres: state.genre_svc.list_genres().await?,
        albums: state.album_svc.list_albums().await?,
        artists: state.artist_svc.list_artists().await?,
    })
}

pub async fn view(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Response {
    match state.track_svc.track_page(id, &viewer).await {
        Ok(page) => render(&state, &viewer, "tracks/view", page).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load track").into_response(),
    }
}

pub async fn mine(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
) -> Response {
    match state.track_svc.tracks_by_uploader(identity.user.id).await {
        Ok(tracks) => render(
            &state,
            &viewer,
            "tracks/mine",
            serde_json::json!({ "tracks": tracks }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load your tracks").into_response(),
    }
}

pub async fn upload_page(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    match form_options(&state).await {
        Ok(options) => render(&state, &viewer, "tracks/upload", options).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/tracks/mine", e, "Failed to load form").into_response(),
    }
}

/// Metadata only; the audio file is expected at `file_path` already.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<TrackForm>,
) -> Redirect {
    let result = match form.into_fields() {
        Ok((_, fields)) => state.track_svc.upload_track(identity.user.id, fields).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(_) => redirect_with(
            &state,
            &viewer,
            "/tracks/mine",
            Flash::success("Track uploaded and waiting for moderation"),
        ),
        Err(e) => redirect_err(&state, &viewer, "/tracks/upload", e, "Failed to upload track"),
    }
}
