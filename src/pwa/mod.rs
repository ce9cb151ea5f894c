//! Offline support: the caching configuration, web app manifest, service
//! worker and its registration script.

mod config;
mod handlers;

pub use config::{DEFAULT_API_PATTERN, PwaConfig};
pub use handlers::{
    get_manifest, get_offline_page, get_service_worker, get_service_worker_registration,
};
