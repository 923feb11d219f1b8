use std::sync::Arc;

use axum::Extension;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::api::{redirect_err, render};
use crate::core::entity::album;
use crate::data::TrackDetail;
use crate::server::AppState;
use crate::service::Viewer;

#[derive(Debug, Serialize)]
pub struct HomeModel {
    pub popular_tracks: Vec<TrackDetail>,
    pub new_releases: Vec<album::Model>,
    pub is_subscriber: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    let popular_tracks = state.track_svc.popular_tracks().await;
    let new_releases = state.album_svc.new_releases().await;
    let (popular_tracks, new_releases) = match (popular_tracks, new_releases) {
        (Ok(t), Ok(a)) => (t, a),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to load home page: {}", e);
            (Vec::new(), Vec::new())
        }
    };

    let is_subscriber = match viewer.user() {
        Some(user) => state
            .subscription_svc
            .is_subscriber(user)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to check subscription: {}", e);
                false
            }),
        None => false,
    };

    let model = HomeModel {
        popular_tracks,
        new_releases,
        is_subscriber,
    };
    render(&state, &viewer, "index", model).into_response()
}

/// Users are part of the results only for admins.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let query = query.query.unwrap_or_default();
    match state.search_svc.search(&query, viewer.is_admin()).await {
        Ok(results) => render(&state, &viewer, "search/index", results).into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Search failed").into_response(),
    }
}
