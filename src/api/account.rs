use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};

use crate::api::{error_message, redirect_err, redirect_with, render};
use crate::core::session::Flash;
use crate::server::AppState;
use crate::service::user::Registration;
use crate::service::{Identity, Viewer};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Serialize)]
pub struct FormModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let max_age = state.config.session.token_ttl_hours * 3600;
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.session.cookie_name, token, max_age
    )
}

fn clear_cookie(state: &AppState) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.session.cookie_name
    )
}

fn signed_in(state: &AppState, user: &crate::core::entity::user::Model) -> Response {
    match state.auth_svc.login(user) {
        Ok(token) => (
            AppendHeaders([(SET_COOKIE, session_cookie(state, &token))]),
            Redirect::to("/"),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to open session: {}", e);
            Redirect::to("/account/login?error").into_response()
        }
    }
}

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<LoginQuery>,
) -> Response {
    if viewer.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    let model = FormModel {
        error: query
            .error
            .map(|_| "Invalid username or password".to_string()),
        ..Default::default()
    };
    render(&state, &viewer, "account/login", model).into_response()
}

pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    match state
        .user_svc
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => signed_in(&state, &user),
        Err(e) => {
            tracing::debug!("Login failed for '{}': {}", form.username, e);
            Redirect::to("/account/login?error").into_response()
        }
    }
}

pub async fn register_page(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    if viewer.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    render(&state, &viewer, "account/register", FormModel::default()).into_response()
}

/// Successful registration signs the new user in. Failures re-render the form.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password,
        confirm_password: form.confirm_password,
    };

    match state.user_svc.register(registration).await {
        Ok(user) => signed_in(&state, &user),
        Err(e) => {
            let model = FormModel {
                error: Some(error_message(&e, "Registration failed")),
                username: Some(form.username),
                email: Some(form.email),
            };
            render(&state, &viewer, "account/register", model).into_response()
        }
    }
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let is_subscriber = match state.subscription_svc.is_subscriber(&identity.user).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to check subscription: {}", e);
            false
        }
    };
    let model = serde_json::json!({
        "user": identity.user,
        "is_subscriber": is_subscriber,
    });
    render(&state, &viewer, "account/profile", model).into_response()
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<PasswordForm>,
) -> Redirect {
    match state
        .user_svc
        .change_password(
            identity.user.id,
            &form.old_password,
            &form.new_password,
            &form.confirm_password,
        )
        .await
    {
        Ok(()) => redirect_with(
            &state,
            &viewer,
            "/account/profile",
            Flash::success("Password changed"),
        ),
        Err(e) => redirect_err(&state, &viewer, "/account/profile", e, "Failed to change password"),
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    state.auth_svc.logout(&identity.session_id);
    (
        AppendHeaders([(SET_COOKIE, clear_cookie(&state))]),
        Redirect::to("/"),
    )
}
