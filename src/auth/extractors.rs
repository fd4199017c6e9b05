use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::session::{FlashCategory, Session, SessionKeys};

/// Username of the logged-in user, together with the session it came
/// from. Anonymous requests are sent to the login page with `next` set.
pub struct CurrentUser {
    pub username: String,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        match session.username() {
            Some(name) => Ok(CurrentUser {
                username: name.to_string(),
                session,
            }),
            None => {
                debug!(path = %parts.uri.path(), "anonymous request to protected page");
                session.flash(FlashCategory::Warning, "Please log in to continue.");
                let next = urlencoding::encode(parts.uri.path());
                let target = format!("/auth/login?next={next}");
                Err((session, Redirect::to(&target)).into_response())
            }
        }
    }
}
