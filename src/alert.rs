//! Alerts for telling the user whether an action succeeded.
//!
//! Alerts are swapped out-of-band into the alert container that
//! [crate::html::base] mounts in the global modal, so any htmx response can
//! show one regardless of its target.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};

use crate::html::ALERT_CONTAINER_ID;

/// A message shown to the user in the global modal.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// An action succeeded and there is more to say about it.
    Success {
        /// The headline.
        message: String,
        /// Further information shown under the headline.
        details: String,
    },
    /// An action succeeded.
    SuccessSimple {
        /// The headline.
        message: String,
    },
    /// An action failed.
    Error {
        /// The headline.
        message: String,
        /// What went wrong and how to fix it.
        details: String,
    },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, details),
            Alert::SuccessSimple { message } => (false, message, String::new()),
            Alert::Error { message, details } => (true, message, details),
        };

        let container_style = if is_error {
            "flex items-start p-4 mb-4 rounded-lg border text-red-800 border-red-300 \
            bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "flex items-start p-4 mb-4 rounded-lg border text-green-800 border-green-300 \
            bg-green-50 dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html! {
            div id=(ALERT_CONTAINER_ID) hx-swap-oob="true"
            {
                div
                    class=(container_style)
                    role="alert"
                    data-alert-kind=(if is_error { "error" } else { "success" })
                {
                    div class="flex-1"
                    {
                        p class="font-medium" { (message) }

                        @if !details.is_empty()
                        {
                            p class="mt-1 text-sm" { (details) }
                        }
                    }

                    button
                        type="button"
                        class="ms-auto -mx-1.5 -my-1.5 rounded-lg p-1.5 inline-flex items-center justify-center h-8 w-8"
                        aria-label="Close"
                        onclick="this.closest('[role=alert]').remove()"
                    {
                        "✕"
                    }
                }
            }
        }
    }

    /// Render the alert with `status`.
    ///
    /// Use a 2xx status for alerts that accompany a successful swap, htmx does not
    /// swap the main target for error statuses.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Html(self.into_html().into_string())).into_response()
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        let status = match self {
            Alert::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        };

        self.into_response_with_status(status)
    }
}
