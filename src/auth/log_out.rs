//! Log-out route handler that ends the session and clears the auth cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::{cookie::invalidate_auth_cookie, session::Session},
    endpoints,
};

/// End the session, invalidate the auth cookie and redirect the client to the log-in page.
pub async fn get_log_out(mut session: Session, jar: PrivateCookieJar) -> Response {
    if let Some(user) = session.user() {
        tracing::info!("Logging out user {}", user.id);
    }
    session.teardown();

    (invalidate_auth_cookie(jar), Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
