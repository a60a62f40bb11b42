use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Track;

pub const DATABASE_FILE: &str = "database.json";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("no database at {0}; run `aria reindex <dir>` first")]
    Missing(PathBuf),
    #[error("unknown album \"{0}\"")]
    UnknownAlbum(String),
}

/// The flat library database written by reindex: albums keyed by their
/// `"artist - album"` ref. Cover blobs live next to it as `cover<N>`
/// files, referenced by index from the tracks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub albums: BTreeMap<String, Vec<Track>>,
}

impl Database {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(DATABASE_FILE);
        if !path.exists() {
            return Err(DatabaseError::Missing(dir.to_path_buf()).into());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let db = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(db)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DATABASE_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn album(&self, album_ref: &str) -> Result<&[Track]> {
        self.albums
            .get(album_ref)
            .map(Vec::as_slice)
            .ok_or_else(|| DatabaseError::UnknownAlbum(album_ref.to_string()).into())
    }

    pub fn albums(&self) -> impl Iterator<Item = (&str, &[Track])> {
        self.albums.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn track_count(&self) -> usize {
        self.albums.values().map(Vec::len).sum()
    }

    /// Groups a freshly scanned track list into albums.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut albums: BTreeMap<String, Vec<Track>> = BTreeMap::new();
        for track in tracks {
            albums.entry(track.album_ref()).or_default().push(track);
        }
        Self { albums }
    }
}

/// Path of a deduplicated cover blob inside the database directory.
pub fn cover_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("cover{index}"))
}
