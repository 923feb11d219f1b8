use std::sync::Arc;

use axum::{
    Extension,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, header::COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::server::AppState;
use crate::service::{Identity, Viewer};

pub const LOGIN_PATH: &str = "/account/login";

/// Session token from the `Authorization: Bearer` header, falling back to the session cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves the caller for every request and stores a `Viewer` extension.
/// Anonymous callers get an empty viewer; nothing is rejected here.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_token(request.headers(), &state.config.session.cookie_name);

    let identity = match token {
        Some(token) => match state.auth_svc.resolve(&token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!("Failed to resolve session: {}", e);
                None
            }
        },
        None => None,
    };

    if let Some(identity) = &identity {
        request.extensions_mut().insert(identity.clone());
    }
    request.extensions_mut().insert(Viewer(identity));
    next.run(request).await
}

/// Requires a signed-in user; anonymous callers are sent to the login page.
pub async fn auth(
    Extension(viewer): Extension<Viewer>,
    request: Request,
    next: Next,
) -> Response {
    match viewer.is_authenticated() {
        true => next.run(request).await,
        false => Redirect::to(LOGIN_PATH).into_response(),
    }
}

pub async fn auth_admin(
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Response {
    match identity.user.is_admin() {
        true => next.run(request).await,
        false => (StatusCode::FORBIDDEN, "Access denied").into_response(),
    }
}

pub async fn can_upload(
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Response {
    match identity.user.can_upload_tracks() {
        true => next.run(request).await,
        false => (StatusCode::FORBIDDEN, "Access denied").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; soundhall_session=abc.def; other=1"),
        );
        assert_eq!(
            extract_token(&headers, "soundhall_session").as_deref(),
            Some("abc.def")
        );
        assert_eq!(extract_token(&headers, "missing"), None);
    }

    #[test]
    fn test_bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        headers.insert(COOKIE, HeaderValue::from_static("soundhall_session=cookie"));
        assert_eq!(
            extract_token(&headers, "soundhall_session").as_deref(),
            Some("tok")
        );
    }
}
