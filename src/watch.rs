//! File system watcher for live reload.
//!
//! Monitors the cards and site directories, batches rapid events with a
//! short debounce window, rebuilds the site, and pings connected reload
//! clients once the rebuild lands.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Event Loop                         │
//! │                                                        │
//! │  ┌──────────┐    ┌──────────┐    ┌──────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│    rebuild()     │  │
//! │  │ events   │    │ (100ms)  │    │ build + notify   │  │
//! │  └──────────┘    └──────────┘    └──────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```

use crate::{build, config::SiteConfig, log, reload::ReloadHub};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 100;

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp") || name.ends_with('~') || name.starts_with('.')
}

/// Format path as relative to root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events. Every event pushes the deadline back, so the
/// rebuild fires once the burst has been quiet for the full window.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handling
// =============================================================================

const fn is_relevant(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

/// Rebuild the site and, on success, ping every connected client.
///
/// A failed rebuild is logged and the watcher keeps running; the next change
/// gets another chance.
fn rebuild(changed: &[PathBuf], config: &SiteConfig, hub: &ReloadHub) {
    let root = config.get_root();
    let triggers: Vec<String> = changed.iter().map(|p| rel_path(p, root)).collect();
    log!("watch"; "{} changed, rebuilding...", triggers.join(", "));

    match build::build_site(config) {
        Ok(_) => {
            let clients = hub.notify_all();
            if clients > 0 {
                log!("watch"; "refreshed {clients} client(s)");
            }
        }
        Err(e) => log!("error"; "rebuild failed: {e:#}"),
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live rebuild.
pub fn watch_for_changes_blocking(config: &'static SiteConfig, hub: Arc<ReloadHub>) -> Result<()> {
    if !config.serve.watch {
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;

    let root = config.get_root();
    for dir in [&config.build.cards, &config.build.site] {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }
    log!("watch"; "watching {}/, {}/",
         rel_path(&config.build.cards, root),
         rel_path(&config.build.site, root));

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                rebuild(&debouncer.take(), config, &hub);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Access events, timeout without a pending batch
            _ => {}
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
