//! The per-request session that says who, if anyone, is logged in.
//!
//! A session starts out [SessionState::Loading], is resolved exactly once per
//! identity check, and is ended on log-out. [session_layer] performs the
//! identity check for every request and stores the session in the request
//! extensions, where handlers and other middleware read it with the
//! [Session] extractor.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{COOKIE_TOKEN, extend_auth_cookie_duration_if_needed, get_token_from_cookies},
    user::{SubscriptionTier, UserID, get_user_by_id},
};

/// The identity of a logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: UserID,
    pub tier: SubscriptionTier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The identity check has not finished.
    Loading,
    /// The identity check finished. `None` means nobody is logged in.
    Resolved(Option<AuthUser>),
    /// The session was torn down and will not be resolved again.
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: SessionState,
    resolution: u64,
}

impl Session {
    /// A session whose identity check has not finished.
    pub fn start() -> Self {
        Self {
            state: SessionState::Loading,
            resolution: 0,
        }
    }

    /// Record the outcome of an identity check.
    ///
    /// Every call counts as a new resolution, even if `user` has not changed.
    /// Ended sessions ignore further resolutions.
    pub fn resolve(&mut self, user: Option<AuthUser>) {
        if self.state == SessionState::Ended {
            tracing::debug!("Ignoring identity check for an ended session.");
            return;
        }

        self.state = SessionState::Resolved(user);
        self.resolution += 1;
    }

    /// End the session and forget the user.
    pub fn teardown(&mut self) {
        self.state = SessionState::Ended;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// How many times the session has been resolved.
    pub fn resolution(&self) -> u64 {
        self.resolution
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match &self.state {
            SessionState::Resolved(user) => user.as_ref(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    /// Reads the session stored by [session_layer]. Requests that did not pass
    /// through the layer get a session that is still loading.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Session>()
            .cloned()
            .unwrap_or_else(Session::start))
    }
}

/// The state needed to identify the user behind a request.
#[derive(Debug, Clone)]
pub struct SessionLayerState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How far each authenticated request pushes out the cookie expiry.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SessionLayerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<SessionLayerState> for Key {
    fn from_ref(state: &SessionLayerState) -> Self {
        state.cookie_key.clone()
    }
}

/// Look up the user named by the auth cookie in `jar`.
///
/// Any failure means nobody is logged in. Failures other than a missing
/// cookie are logged.
pub fn identify_user(jar: &PrivateCookieJar, db_connection: &Mutex<Connection>) -> Option<AuthUser> {
    let token = match get_token_from_cookies(jar) {
        Ok(token) => token,
        Err(Error::CookieMissing) => return None,
        Err(error) => {
            tracing::info!("Could not read auth cookie: {error}");
            return None;
        }
    };

    let connection = match db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return None;
        }
    };

    match get_user_by_id(token.user_id, &connection) {
        Ok(user) => Some(AuthUser {
            id: user.id,
            tier: user.tier,
        }),
        Err(error) => {
            tracing::warn!("Auth cookie names user {} but: {error}", token.user_id);
            None
        }
    }
}

/// Middleware that resolves a [Session] for every request.
///
/// For logged-in users the auth cookie is extended by the configured cookie
/// duration, unless the handler already set or cleared the cookie itself.
pub async fn session_layer(
    State(state): State<SessionLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::<Key>::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    };

    let mut session = Session::start();
    session.resolve(identify_user(&jar, &state.db_connection));
    let is_authenticated = session.is_authenticated();
    parts.extensions.insert(session);

    let response = next.run(Request::from_parts(parts, body)).await;

    if !is_authenticated || sets_auth_cookie(&response) {
        return response;
    }

    let jar = match extend_auth_cookie_duration_if_needed(jar, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error extending cookie duration: {error}. Leaving cookie as is.");
            return response;
        }
    };

    let (mut parts, body) = response.into_parts();
    for (key, value) in jar.into_response().headers().iter() {
        if key == SET_COOKIE {
            parts.headers.append(key, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

fn sets_auth_cookie(response: &Response) -> bool {
    let prefix = format!("{COOKIE_TOKEN}=");

    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}
