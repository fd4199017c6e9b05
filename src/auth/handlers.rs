use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::get,
    Form, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, NextQuery, RegisterForm},
        services::{authenticate, register_user, safe_next, LoginError},
        session::{FlashCategory, Session},
    },
    state::AppState,
    views,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", get(logout).post(logout))
}

pub(crate) fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".into(),
    )
}

#[instrument(skip(session))]
pub async fn register_page(mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, Html(views::render_register(&flashes)))
}

#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<(Session, Redirect), (StatusCode, String)> {
    let user = match register_user(state.store.as_ref(), &state.hasher, form).await {
        Ok(u) => u,
        Err(e) if e.is_user_error() => {
            warn!(reason = %e, "registration rejected");
            session.flash(FlashCategory::Danger, e.to_string());
            return Ok((session, Redirect::to("/auth/register")));
        }
        Err(e) => return Err(internal(e)),
    };

    info!(user_id = user.id, username = %user.username, "user registered");
    session.login(user.username);
    session.flash(
        FlashCategory::Success,
        "Registration successful. You are now logged in.",
    );
    Ok((session, Redirect::to("/profile")))
}

#[instrument(skip(session))]
pub async fn login_page(
    mut session: Session,
    Query(q): Query<NextQuery>,
) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    let next = safe_next(q.next.as_deref());
    (session, Html(views::render_login(next, &flashes)))
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Query(q): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<(Session, Redirect), (StatusCode, String)> {
    let username = form.username.trim();
    let back = match safe_next(q.next.as_deref()) {
        Some(next) => format!("/auth/login?next={}", urlencoding::encode(next)),
        None => "/auth/login".to_string(),
    };

    if username.is_empty() || form.password.is_empty() {
        session.flash(FlashCategory::Danger, "Enter username and password.");
        return Ok((session, Redirect::to(&back)));
    }

    let user = match authenticate(state.store.as_ref(), &state.hasher, username, &form.password)
        .await
    {
        Ok(u) => u,
        Err(LoginError::InvalidCredentials) => {
            warn!(username = %username, "login failed");
            session.flash(
                FlashCategory::Danger,
                LoginError::InvalidCredentials.to_string(),
            );
            return Ok((session, Redirect::to(&back)));
        }
        Err(e) => return Err(internal(e)),
    };

    info!(user_id = user.id, username = %user.username, "user logged in");
    session.login(user.username);
    session.flash(FlashCategory::Success, "Logged in.");
    let target = safe_next(q.next.as_deref()).unwrap_or("/profile");
    Ok((session, Redirect::to(target)))
}

#[instrument(skip(session))]
pub async fn logout(mut session: Session) -> (Session, Redirect) {
    if let Some(name) = session.username() {
        info!(username = %name, "user logged out");
    }
    session.logout();
    session.flash(FlashCategory::Info, "You have been logged out.");
    (session, Redirect::to("/"))
}
