//! Routes serving the manifest, the generated service worker and the script
//! that registers it.

use axum::{
    extract::{FromRef, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, endpoints, html::error_view, pwa::PwaConfig};

impl FromRef<AppState> for PwaConfig {
    fn from_ref(state: &AppState) -> Self {
        state.pwa.clone()
    }
}

const JAVASCRIPT: &str = "text/javascript; charset=utf-8";

/// Caches the shell under a name tied to the build, so a new release drops the old shell.
const SHELL_CACHE_NAME: &str = concat!("pocket-ledger-shell-v", env!("CARGO_PKG_VERSION"));

const SERVICE_WORKER_BODY: &str = r#"
async function putWithTimestamp(cache, request, response, maxEntries) {
  const headers = new Headers(response.headers);
  headers.set("sw-cached-at", Date.now().toString());
  const body = await response.blob();
  await cache.put(request, new Response(body, {
    status: response.status,
    statusText: response.statusText,
    headers,
  }));

  const keys = await cache.keys();
  const excess = keys.length - maxEntries;
  for (const key of keys.slice(0, Math.max(0, excess))) {
    await cache.delete(key);
  }
}

async function matchFresh(cache, request, maxAgeSeconds) {
  const cached = await cache.match(request);
  if (!cached) return undefined;

  const cachedAt = Number(cached.headers.get("sw-cached-at") || 0);
  if (Date.now() - cachedAt > maxAgeSeconds * 1000) {
    await cache.delete(request);
    return undefined;
  }

  return cached;
}

async function networkFirst(request, options) {
  const cache = await caches.open(options.cacheName);
  try {
    const response = await fetch(request);
    if (response.ok) {
      await putWithTimestamp(cache, request, response.clone(), options.expiration.maxEntries);
    }
    return response;
  } catch (error) {
    const cached = await matchFresh(cache, request, options.expiration.maxAgeSeconds);
    if (cached) return cached;
    throw error;
  }
}

const STRATEGIES = { NetworkFirst: networkFirst };

async function navigate(request, navigation) {
  try {
    return await networkFirst(request, navigation.options);
  } catch (error) {
    const offline = await caches.match(navigation.offlineUrl);
    if (offline) return offline;
    throw error;
  }
}

self.addEventListener("install", (event) => {
  event.waitUntil(
    caches.open(SHELL_CACHE).then((cache) => cache.addAll(CONFIG.precache))
  );
  if (CONFIG.skipWaiting) self.skipWaiting();
});

self.addEventListener("activate", (event) => {
  const keep = new Set([SHELL_CACHE, ...CONFIG.runtimeCaching.map((rule) => rule.options.cacheName)]);
  if (CONFIG.navigation) keep.add(CONFIG.navigation.options.cacheName);
  event.waitUntil(
    caches.keys()
      .then((names) => Promise.all(names.filter((name) => !keep.has(name)).map((name) => caches.delete(name))))
      .then(() => (CONFIG.clientsClaim ? self.clients.claim() : undefined))
  );
});

self.addEventListener("fetch", (event) => {
  if (event.request.method !== "GET") return;

  if (event.request.mode === "navigate" && CONFIG.navigation) {
    event.respondWith(navigate(event.request, CONFIG.navigation));
    return;
  }

  const url = event.request.url;
  const rule = CONFIG.runtimeCaching.find((rule) => new RegExp(rule.urlPattern).test(url));
  if (rule) {
    event.respondWith(STRATEGIES[rule.handler](event.request, rule.options));
    return;
  }

  const path = new URL(url).pathname;
  if (CONFIG.precache.includes(path)) {
    event.respondWith(
      caches.match(event.request).then((cached) => cached || fetch(event.request))
    );
  }
});
"#;

const REGISTER_SCRIPT: &str = r#"
if ("serviceWorker" in navigator) {
  window.addEventListener("load", () => {
    navigator.serviceWorker.register(SERVICE_WORKER_URL).catch((error) => {
      console.error("Service worker registration failed:", error);
    });
  });
}
"#;

const UNREGISTER_SCRIPT: &str = r#"
if ("serviceWorker" in navigator) {
  navigator.serviceWorker.getRegistrations().then((registrations) => {
    for (const registration of registrations) registration.unregister();
  });
}
if ("caches" in window) {
  caches.keys().then((names) => names.forEach((name) => caches.delete(name)));
}
"#;

/// Build the service worker script for `config`.
fn render_service_worker(config: &PwaConfig) -> Result<String, serde_json::Error> {
    let config_json = serde_json::to_string(config)?;

    Ok(format!(
        "const CONFIG = {config_json};\nconst SHELL_CACHE = \"{SHELL_CACHE_NAME}\";\n{SERVICE_WORKER_BODY}"
    ))
}

/// Serves the service worker, or 404 when offline caching is disabled.
pub async fn get_service_worker(State(config): State<PwaConfig>) -> Response {
    if config.disabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match render_service_worker(&config) {
        Ok(script) => (
            [
                (header::CONTENT_TYPE, JAVASCRIPT),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            script,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not serialise the service worker config: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serves the script that registers the service worker, or removes existing
/// workers and their caches when offline caching is disabled.
pub async fn get_service_worker_registration(State(config): State<PwaConfig>) -> Response {
    let script = if config.disabled || !config.register {
        UNREGISTER_SCRIPT.to_owned()
    } else {
        format!(
            "const SERVICE_WORKER_URL = \"{}\";\n{REGISTER_SCRIPT}",
            endpoints::SERVICE_WORKER
        )
    };

    (
        [
            (header::CONTENT_TYPE, JAVASCRIPT),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    )
        .into_response()
}

/// The page shown when navigating offline to a page that was never cached.
pub async fn get_offline_page() -> Response {
    let page = error_view(
        "Offline",
        "Offline",
        "You're offline.",
        "This page hasn't been saved on this device yet. Reconnect to load it.",
    );

    Html(page.into_string()).into_response()
}

/// Serves the web app manifest.
pub async fn get_manifest() -> Response {
    let manifest = json!({
        "name": "Pocket Ledger",
        "short_name": "Ledger",
        "description": "Track expenses, income and account balances.",
        "start_url": endpoints::DASHBOARD_VIEW,
        "scope": endpoints::ROOT,
        "display": "standalone",
        "background_color": "#f9fafb",
        "theme_color": "#2563eb",
        "icons": [
            {
                "src": "/static/icon-192x192.png",
                "sizes": "192x192",
                "type": "image/png"
            },
            {
                "src": "/static/icon-512x512.png",
                "sizes": "512x512",
                "type": "image/png"
            }
        ]
    });

    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        manifest.to_string(),
    )
        .into_response()
}
