//! Defines the page to display for an internal server error.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

pub struct InternalServerError<'a> {
    pub description: &'a str,
    pub fix: &'a str,
}

impl Default for InternalServerError<'_> {
    fn default() -> Self {
        Self {
            description: "Sorry, something went wrong.",
            fix: "Try again later or check the server logs",
        }
    }
}

impl IntoResponse for InternalServerError<'_> {
    fn into_response(self) -> Response {
        let page = error_view("Internal Server Error", "500", self.description, self.fix);

        (StatusCode::INTERNAL_SERVER_ERROR, Html(page.into_string())).into_response()
    }
}

pub async fn get_internal_server_error_page() -> Response {
    InternalServerError::default().into_response()
}

#[cfg(test)]
mod internal_server_error_tests {
    use axum::http::StatusCode;
    use scraper::Selector;

    use crate::test_utils::parse_html_document;

    use super::{InternalServerError, get_internal_server_error_page};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn default_page_is_500() {
        let response = get_internal_server_error_page().await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn page_shows_fix() {
        let response = InternalServerError {
            description: "Broken",
            fix: "Restart the server",
        }
        .into_response();

        let document = parse_html_document(response).await;
        let selector = Selector::parse("p").unwrap();
        let text: Vec<String> = document
            .select(&selector)
            .map(|paragraph| paragraph.text().collect::<String>().trim().to_owned())
            .collect();
        assert!(text.contains(&"Restart the server".to_owned()), "got {text:?}");
    }
}
