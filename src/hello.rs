//! A JSON endpoint for checking that the server is up.

use axum::{Json, response::IntoResponse};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub message: String,
    /// The current time in RFC 3339 format.
    pub timestamp: String,
    /// The name and version of the server.
    pub runtime_version: String,
}

pub async fn get_hello() -> impl IntoResponse {
    // Formatting the current UTC time as RFC 3339 only fails for years outside 0..=9999.
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|error| {
            tracing::error!("could not format timestamp: {error}");
            String::new()
        });

    Json(Hello {
        message: "Hello from Pocket Ledger".to_owned(),
        timestamp,
        runtime_version: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
    })
}
