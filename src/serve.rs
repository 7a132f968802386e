//! Development server with live reload support.
//!
//! A lightweight HTTP server built on `tiny_http`:
//!
//! - `/` renders the index from the card sources on every request, with
//!   `environment = "development"` in the template context
//! - `/_r` upgrades to a WebSocket used by the reload script
//! - everything else is served from the build output directory
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (File Monitor)  │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Handle requests         Rebuild on change
//!    Serve files             Ping reload sockets
//! ```

use crate::{
    build,
    config::SiteConfig,
    log,
    reload::{self, ReloadHub},
    render,
    watch::watch_for_changes_blocking,
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs, io,
    net::SocketAddr,
    path::{Component, Path},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// WebSocket endpoint polled by the reload script.
const RELOAD_PATH: &str = "/_r";

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the development server with optional file watching.
///
/// Binds the configured interface and port, installs a Ctrl+C handler for
/// graceful shutdown, spawns the watcher thread, then blocks handling
/// requests until interrupted.
pub fn serve_site(config: &'static SiteConfig) -> Result<()> {
    let interface: std::net::IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid [serve.interface]: {}", config.serve.interface))?;
    let addr = SocketAddr::new(interface, config.serve.port);

    let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {addr}: {e}"))?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    let hub = Arc::new(ReloadHub::new());

    // Spawn file watcher thread
    if config.serve.watch {
        let watcher_hub = Arc::clone(&hub);
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking(config, watcher_hub) {
                log!("watch"; "{err:#}");
            }
        });
    }

    // Handle requests in main thread (blocks until Ctrl+C)
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config, &hub) {
            log!("serve"; "request error: {e:#}");
        }
    }

    Ok(())
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Resolution order: reload endpoint, development index, static file from
/// the output directory.
fn handle_request(request: Request, config: &SiteConfig, hub: &ReloadHub) -> Result<()> {
    let path = normalize_url(request.url());

    if path == RELOAD_PATH {
        let client = reload::accept_websocket(request)?;
        hub.register(client);
        return Ok(());
    }

    if path == "/" {
        return serve_index(request, config);
    }

    serve_static(request, &path, config)
}

/// Decode percent-encoding and drop any query string.
///
/// Query stripping matters for cache-busting URLs like `style.css?t=123`.
fn normalize_url(url: &str) -> String {
    let decoded = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    match decoded.split_once('?') {
        Some((path, _query)) => path.to_owned(),
        None => decoded,
    }
}

/// Map a URL path onto a path relative to the output directory.
///
/// Rejects every component that is not a plain name, so `..` cannot escape
/// the served tree.
fn sanitize_request_path(path: &str) -> Option<&str> {
    let relative = path.trim_start_matches('/');
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then_some(relative)
}

/// Render the index page from the current card sources.
///
/// Rendering per request means metadata edits show up on reload without
/// waiting for the full rebuild to finish.
fn serve_index(request: Request, config: &SiteConfig) -> Result<()> {
    let page = build::collect_cards(config)
        .and_then(|cards| render::render_index(&config.build.site, &cards, true));

    match page {
        Ok(html) => serve_content(request, 200, "text/html", html.into_bytes()),
        Err(e) => serve_error(request, &e),
    }
}

fn serve_static(request: Request, path: &str, config: &SiteConfig) -> Result<()> {
    let Some(relative) = sanitize_request_path(path) else {
        return serve_not_found(request);
    };
    let local_path = config.build.output.join(relative);

    if local_path.is_dir() {
        return serve_not_found(request);
    }

    match fs::read(&local_path) {
        Ok(content) => serve_content(request, 200, content_type(&local_path), content),
        Err(e) if matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::IsADirectory
        ) =>
        {
            serve_not_found(request)
        }
        Err(e) => serve_error(request, &e.into()),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn serve_content(
    request: Request,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(Header::from_bytes("Content-Type", content_type).unwrap());
    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    serve_content(request, 404, "text/plain", b"Not Found".to_vec())
}

fn serve_error(request: Request, err: &anyhow::Error) -> Result<()> {
    log!("error"; "{err:#}");
    let body = format!("Internal Server Error\n\n{err:#}");
    serve_content(request, 500, "text/plain", body.into_bytes())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Content type from file extension. Unknown extensions fall back to plain
/// text so error pages and stray files stay readable in the browser.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("html") => "text/html",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

// ============================================================================
// Tests
// ============================================================================
