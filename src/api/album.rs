use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::{redirect_err, redirect_with, render, status_of};
use crate::core::entity::album;
use crate::core::session::Flash;
use crate::data::TrackDetail;
use crate::server::AppState;
use crate::service::Viewer;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumApiResponse {
    pub success: bool,
    pub album: album::Model,
    pub tracks: Vec<TrackDetail>,
    pub track_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
}

pub async fn view(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Response {
    match state.album_svc.album_page(id).await {
        Ok(page) => render(&state, &viewer, "album/view", page).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load album").into_response(),
    }
}

pub async fn api(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.album_svc.album_page(id).await {
        Ok(page) => Ok(Json(AlbumApiResponse {
            success: true,
            track_count: page.tracks.len(),
            album: page.album,
            tracks: page.tracks,
        })),
        Err(e) => {
            let status = status_of(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!("Failed to load album {}: {}", id, e);
            }
            let message = match e.downcast_ref::<crate::service::Error>() {
                Some(err) => err.message().to_string(),
                None => "Failed to load album".to_string(),
            };
            Err((
                status,
                Json(ApiError {
                    success: false,
                    message,
                }),
            ))
        }
    }
}

/// Starts playback at the album's first track.
pub async fn play(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.album_svc.first_track(id).await {
        Ok(Some(first)) => Redirect::to(&format!("/tracks/{}", first.track.id)),
        Ok(None) => redirect_with(
            &state,
            &viewer,
            &format!("/album/{}", id),
            Flash::error("No tracks available"),
        ),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load album"),
    }
}
