use axum::response::Html;
use tracing::instrument;

use crate::{auth::session::Session, views};

#[instrument(skip(session))]
pub async fn index(mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    let html = views::render_index(session.username(), &flashes);
    (session, Html(html))
}
