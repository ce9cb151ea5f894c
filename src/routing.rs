//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, get_accounts_page,
        get_edit_account_page, get_new_account_page, reconcile_account_endpoint,
        update_account_endpoint,
    },
    auth::{
        get_log_in_page, get_log_out, get_register_page, post_log_in, protected_route,
        protected_route_hx, register_user, session_layer,
    },
    dashboard::get_dashboard_page,
    endpoints,
    feature::get_features_page,
    hello::get_hello,
    internal_server_error::get_internal_server_error_page,
    logging::logging_middleware,
    not_found::get_404_not_found,
    pwa::{get_manifest, get_offline_page, get_service_worker, get_service_worker_registration},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_edit_transaction_page,
        get_new_transaction_page, get_transactions_page, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every request passes through the session layer, so handlers and the
/// route guards can read the [crate::auth::Session].
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::FEATURES_VIEW, get(get_features_page))
        .route(endpoints::HELLO, get(get_hello))
        .route(endpoints::MANIFEST, get(get_manifest))
        .route(endpoints::OFFLINE_VIEW, get(get_offline_page))
        .route(endpoints::SERVICE_WORKER, get(get_service_worker))
        .route(
            endpoints::SERVICE_WORKER_REGISTRATION,
            get(get_service_worker_registration),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_pages = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::NEW_TRANSACTION_VIEW, get(get_new_transaction_page))
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
        .route(endpoints::NEW_ACCOUNT_VIEW, get(get_new_account_page))
        .route(endpoints::EDIT_ACCOUNT_VIEW, get(get_edit_account_page))
        .route_layer(middleware::from_fn(protected_route));

    // htmx requests need the HX-Redirect header for the log-in redirect to replace the whole page.
    let protected_api = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::ACCOUNTS_API, post(create_account_endpoint))
        .route(
            endpoints::ACCOUNT,
            put(update_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::RECONCILE_ACCOUNT,
            post(reconcile_account_endpoint),
        )
        .route_layer(middleware::from_fn(protected_route_hx));

    protected_pages
        .merge(protected_api)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        AppState, Environment,
        db::open_storage,
        endpoints,
        pwa::{DEFAULT_API_PATTERN, PwaConfig},
    };

    use super::build_router;

    fn get_test_state() -> AppState {
        let storage = open_storage(None).expect("could not open in-memory storage");

        AppState::new(
            storage,
            "foobar",
            "Etc/UTC",
            PwaConfig::for_environment(Environment::Production, DEFAULT_API_PATTERN),
        )
    }

    fn get_test_server() -> TestServer {
        TestServer::new(build_router(get_test_state()))
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn protected_page_redirects_to_log_in_with_return_url() {
        let server = get_test_server();

        let response = server.get("/transactions?kind=expense").await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            "/auth/login?returnUrl=%2Ftransactions%3Fkind%3Dexpense"
        );
    }

    #[tokio::test]
    async fn protected_api_redirects_with_hx_redirect() {
        let server = get_test_server();

        let response = server
            .delete("/api/transactions/1")
            .add_header("hx-request", "true")
            .add_header("hx-current-url", "http://localhost/transactions")
            .await;

        assert_eq!(
            response.header("hx-redirect"),
            "/auth/login?returnUrl=%2Ftransactions"
        );
    }

    #[tokio::test]
    async fn public_routes_do_not_need_log_in() {
        let server = get_test_server();

        for path in [
            endpoints::LOG_IN_VIEW,
            endpoints::REGISTER_VIEW,
            endpoints::FEATURES_VIEW,
            endpoints::HELLO,
            endpoints::OFFLINE_VIEW,
            endpoints::MANIFEST,
            endpoints::SERVICE_WORKER,
            endpoints::SERVICE_WORKER_REGISTRATION,
        ] {
            let response = server.get(path).await;
            assert_eq!(response.status_code(), StatusCode::OK, "GET {path}");
        }
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let server = get_test_server();

        server.get("/no/such/page").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn registered_user_sees_dashboard() {
        let server = get_test_server();
        let registration = server
            .post(endpoints::USERS)
            .form(&[
                ("password", "correct horse battery staple"),
                ("confirm_password", "correct horse battery staple"),
            ])
            .await;

        let response = server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookies(registration.cookies())
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("id=\"total-balance\""));
    }
}
