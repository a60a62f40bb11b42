//! Cover artwork resolution and render deduplication.
//!
//! Tracks of one album usually share a cover; the session only reads
//! and redraws art when the resolved path actually differs from the
//! one already on screen. File reads happen off the event loop and
//! come back through the session's cover channel.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::library::database::cover_path;
use crate::library::{ArtSource, Track};

/// A cover file read off the event loop, tagged with the path it was
/// resolved from.
pub struct CoverLoaded {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct CoverState {
    rendered: Option<PathBuf>,
}

impl CoverState {
    /// Where the artwork for `track` lives on disk.
    pub fn resolve(track: &Track, database_dir: &Path) -> PathBuf {
        match track.art_source() {
            ArtSource::Embedded(index) => cover_path(database_dir, index),
            ArtSource::SiblingFile(path) => path,
        }
    }

    /// Starts a background read for `path` unless that cover is already
    /// on screen. The read result arrives on `tx`; failures are logged
    /// and never reach the session.
    pub fn request(&mut self, path: PathBuf, tx: mpsc::Sender<CoverLoaded>) {
        if self.rendered.as_deref() == Some(path.as_path()) {
            debug!("cover {} already rendered", path.display());
            return;
        }
        self.rendered = Some(path.clone());
        tokio::spawn(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => {
                    let _ = tx.send(CoverLoaded { path, data }).await;
                }
                Err(e) => error!("reading cover {}: {e}", path.display()),
            }
        });
    }

    /// Drops a stale in-flight read: only the cover requested last gets
    /// drawn.
    pub fn is_current(&self, loaded: &CoverLoaded) -> bool {
        self.rendered.as_deref() == Some(loaded.path.as_path())
    }
}
