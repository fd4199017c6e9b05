use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{instrument, warn};

use crate::{
    auth::{dto::PublicUser, extractors::CurrentUser, handlers::internal, session::FlashCategory},
    state::AppState,
    views,
};

#[instrument(skip(state, current), fields(username = %current.username))]
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, (StatusCode, String)> {
    let CurrentUser {
        username,
        mut session,
    } = current;

    let user = state
        .store
        .find_by_username(&username)
        .await
        .map_err(internal)?;

    let Some(user) = user else {
        warn!(username = %username, "session refers to a missing user");
        session.flash(FlashCategory::Danger, "User not found.");
        return Ok((session, Redirect::to("/")).into_response());
    };

    let flashes = session.take_flashes();
    let public = PublicUser::from(user);
    Ok((session, Html(views::render_profile(&public, &flashes))).into_response())
}
