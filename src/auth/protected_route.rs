//! Keeps anonymous users out of the app screens.
//!
//! [ProtectedRoute] decides what to do with a [Session] and the path being
//! visited. The middleware functions wrap it for page routes and for htmx
//! `/api` routes.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    auth::{
        redirect::{log_in_url, return_target_from_hx_headers},
        session::{Session, SessionState},
    },
    endpoints,
};

/// Something that can send the user to another page.
pub trait Navigator {
    fn navigate(&mut self, to: &str);
}

/// What a protected route should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The session has not been resolved, or has ended. Show nothing.
    Pending,
    /// A user is logged in. Show the protected content.
    Render,
    /// Nobody is logged in. Show nothing, the user is sent to the log-in page.
    Redirected,
}

/// Guards a route against anonymous users.
///
/// The guard remembers which session resolution it navigated for, so
/// evaluating the same resolution again does not navigate a second time.
#[derive(Debug, Default)]
pub struct ProtectedRoute {
    navigated_for: Option<u64>,
}

impl ProtectedRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to show for `session` at `current_path`, navigating to the log-in
    /// page if nobody is logged in.
    ///
    /// `current_path` becomes the log-in page's return URL. Paths that are not
    /// safe to return to are replaced with the dashboard.
    pub fn evaluate(
        &mut self,
        session: &Session,
        current_path: &str,
        navigator: &mut impl Navigator,
    ) -> RouteOutcome {
        match session.state() {
            SessionState::Loading | SessionState::Ended => RouteOutcome::Pending,
            SessionState::Resolved(Some(_)) => RouteOutcome::Render,
            SessionState::Resolved(None) => {
                if self.navigated_for != Some(session.resolution()) {
                    self.navigated_for = Some(session.resolution());
                    navigator.navigate(&log_in_url(current_path));
                }

                RouteOutcome::Redirected
            }
        }
    }
}

/// Remembers where the guard navigated to so that it can be sent as a response.
#[derive(Debug, Default)]
struct ResponseNavigator {
    location: Option<String>,
}

impl Navigator for ResponseNavigator {
    fn navigate(&mut self, to: &str) {
        self.location = Some(to.to_owned());
    }
}

async fn protected_route_internal(
    request: Request,
    next: Next,
    current_path: &str,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_else(Session::start);

    let mut navigator = ResponseNavigator::default();

    match ProtectedRoute::new().evaluate(&session, current_path, &mut navigator) {
        RouteOutcome::Render => next.run(request).await,
        RouteOutcome::Pending => StatusCode::NO_CONTENT.into_response(),
        RouteOutcome::Redirected => {
            let location = navigator
                .location
                .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned());
            get_redirect(&location)
        }
    }
}

/// Middleware for page routes. Anonymous users are redirected to the log-in
/// page with `303 See Other`, returning to the requested page afterwards.
///
/// Must run inside [crate::auth::session_layer].
pub async fn protected_route(request: Request, next: Next) -> Response {
    let current_path = request
        .uri()
        .path_and_query()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| endpoints::DASHBOARD_VIEW.to_owned());

    protected_route_internal(request, next, &current_path, |location| {
        Redirect::to(location).into_response()
    })
    .await
}

/// Middleware for htmx `/api` routes. Anonymous users are sent to the log-in
/// page with an `HX-Redirect` header, returning to the page the request came
/// from afterwards.
///
/// Must run inside [crate::auth::session_layer].
pub async fn protected_route_hx(request: Request, next: Next) -> Response {
    let current_path = return_target_from_hx_headers(request.headers())
        .unwrap_or_else(|| endpoints::DASHBOARD_VIEW.to_owned());

    protected_route_internal(request, next, &current_path, |location| {
        (HxRedirect(location.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
