use axum::Json;
use axum::http::StatusCode;
use axum::response::Redirect;
use serde::Serialize;

use crate::core::entity::user;
use crate::core::session::Flash;
use crate::server::AppState;
use crate::service::{Error, Viewer};

pub mod account;
pub mod admin;
pub mod album;
pub mod home;
pub mod playlist;
pub mod subscription;
pub mod track;

#[derive(Debug, Serialize)]
pub struct ViewerInfo {
    pub authenticated: bool,
    pub user: Option<user::Model>,
    pub is_admin: bool,
    pub is_musician: bool,
    pub can_upload_tracks: bool,
}

impl From<&Viewer> for ViewerInfo {
    fn from(viewer: &Viewer) -> Self {
        Self {
            authenticated: viewer.is_authenticated(),
            user: viewer.user().cloned(),
            is_admin: viewer.is_admin(),
            is_musician: viewer.is_musician(),
            can_upload_tracks: viewer.can_upload_tracks(),
        }
    }
}

/// A rendered page: the view name, a pending flash banner and the view model.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub view: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    pub viewer: ViewerInfo,
    #[serde(flatten)]
    pub model: T,
}

/// Builds the page and consumes the viewer's pending flash message.
pub fn render<T: Serialize>(
    state: &AppState,
    viewer: &Viewer,
    view: &'static str,
    model: T,
) -> Json<Page<T>> {
    let flash = viewer
        .session_id()
        .and_then(|sid| state.auth_svc.take_flash(&sid));
    Json(Page {
        view,
        flash,
        viewer: viewer.into(),
        model,
    })
}

pub fn redirect_with(state: &AppState, viewer: &Viewer, to: &str, flash: Flash) -> Redirect {
    if let Some(sid) = viewer.session_id() {
        state.auth_svc.set_flash(&sid, flash);
    }
    Redirect::to(to)
}

/// Redirects with an error banner. Domain errors keep their own message,
/// anything else is logged and shown as `fallback`.
pub fn redirect_err(
    state: &AppState,
    viewer: &Viewer,
    to: &str,
    e: anyhow::Error,
    fallback: &str,
) -> Redirect {
    let message = error_message(&e, fallback);
    redirect_with(state, viewer, to, Flash::error(message))
}

pub fn error_message(e: &anyhow::Error, fallback: &str) -> String {
    match e.downcast_ref::<Error>() {
        Some(Error::InternalServerError(_)) | None => {
            tracing::error!("{}: {:#}", fallback, e);
            fallback.to_string()
        }
        Some(err) => {
            tracing::debug!("{}: {}", fallback, err);
            err.message().to_string()
        }
    }
}

pub fn status_of(e: &anyhow::Error) -> StatusCode {
    match e.downcast_ref::<Error>() {
        Some(Error::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(Error::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
        Some(Error::BadRequest(_)) => StatusCode::BAD_REQUEST,
        Some(Error::Forbidden(_)) => StatusCode::FORBIDDEN,
        Some(Error::Conflict(_)) => StatusCode::CONFLICT,
        Some(Error::InternalServerError(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Optional numeric form field; an empty string means "not set".
pub fn parse_opt_id(value: Option<&str>, field: &str) -> Result<Option<i64>, Error> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::BadRequest(format!("Invalid {}", field))),
    }
}

pub fn parse_id(value: &str, field: &str) -> Result<i64, Error> {
    parse_opt_id(Some(value), field)?.ok_or_else(|| Error::BadRequest(format!("{} is required", field)))
}
