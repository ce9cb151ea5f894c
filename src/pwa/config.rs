//! How the service worker caches the app shell, visited pages and API responses.

use serde::Serialize;

use crate::{Environment, endpoints};

/// Matches requests to the app's own API on any host.
pub const DEFAULT_API_PATTERN: &str = r"^https?://[^/]+/api/";

/// The cache API responses are kept in.
const API_CACHE_NAME: &str = "api-cache";
const API_CACHE_MAX_ENTRIES: u32 = 50;
const API_CACHE_MAX_AGE_SECONDS: u64 = 24 * 60 * 60;

/// The cache visited pages are kept in, so the app can launch offline.
const PAGES_CACHE_NAME: &str = "pages";
const PAGES_CACHE_MAX_ENTRIES: u32 = 30;
const PAGES_CACHE_MAX_AGE_SECONDS: u64 = 7 * 24 * 60 * 60;

/// The files the app shell needs to start without a network connection.
const SHELL_FILES: [&str; 7] = [
    "/static/main.css",
    "/static/htmx-2.0.8-min.js",
    "/static/htmx-ext-response-targets-2.0.4.js",
    "/static/echarts.6.0.0.min.js",
    "/static/icon-192x192.png",
    endpoints::MANIFEST,
    endpoints::OFFLINE_VIEW,
];

/// The offline caching configuration, serialised into the service worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PwaConfig {
    /// No service worker is served and existing ones are removed.
    pub disabled: bool,
    /// Register the service worker when a page loads.
    pub register: bool,
    /// A new worker replaces the waiting one without a manual reload.
    pub skip_waiting: bool,
    /// A new worker takes control of open pages as soon as it activates.
    pub clients_claim: bool,
    /// URLs cached when the worker installs.
    pub precache: Vec<String>,
    /// Caching rules for requests made while the app runs.
    pub runtime_caching: Vec<RuntimeCachingRule>,
    /// How page navigations are answered, `None` leaves them to the browser.
    pub navigation: Option<NavigationRule>,
}

/// Page navigations go to the network first. Offline, the last cached copy of
/// the page is shown, or `offline_url` when the page was never visited.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRule {
    pub options: CacheOptions,
    /// A precached page.
    pub offline_url: String,
}

/// How requests matching `url_pattern` are answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCachingRule {
    /// A JavaScript regular expression source matched against request URLs.
    pub url_pattern: String,
    pub handler: CacheStrategy,
    pub options: CacheOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStrategy {
    /// Try the network and fall back to the cache when offline.
    NetworkFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    /// The Cache Storage name, removed on activation when no rule uses it.
    pub cache_name: String,
    pub expiration: CacheExpiration,
}

/// Limits on a runtime cache. The oldest entries are evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExpiration {
    pub max_entries: u32,
    pub max_age_seconds: u64,
}

impl PwaConfig {
    /// The configuration for `environment`.
    ///
    /// Offline caching is disabled in development so changes show up on reload.
    /// Requests whose URL matches `api_pattern` are cached network first.
    pub fn for_environment(environment: Environment, api_pattern: &str) -> Self {
        if environment.is_development() {
            return Self::disabled();
        }

        Self {
            disabled: false,
            register: true,
            skip_waiting: true,
            clients_claim: true,
            precache: SHELL_FILES.iter().map(|&path| path.to_owned()).collect(),
            runtime_caching: vec![RuntimeCachingRule {
                url_pattern: api_pattern.to_owned(),
                handler: CacheStrategy::NetworkFirst,
                options: CacheOptions {
                    cache_name: API_CACHE_NAME.to_owned(),
                    expiration: CacheExpiration {
                        max_entries: API_CACHE_MAX_ENTRIES,
                        max_age_seconds: API_CACHE_MAX_AGE_SECONDS,
                    },
                },
            }],
            navigation: Some(NavigationRule {
                options: CacheOptions {
                    cache_name: PAGES_CACHE_NAME.to_owned(),
                    expiration: CacheExpiration {
                        max_entries: PAGES_CACHE_MAX_ENTRIES,
                        max_age_seconds: PAGES_CACHE_MAX_AGE_SECONDS,
                    },
                },
                offline_url: endpoints::OFFLINE_VIEW.to_owned(),
            }),
        }
    }

    fn disabled() -> Self {
        Self {
            disabled: true,
            register: false,
            skip_waiting: false,
            clients_claim: false,
            precache: Vec::new(),
            runtime_caching: Vec::new(),
            navigation: None,
        }
    }
}
