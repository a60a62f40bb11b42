pub mod database;
pub mod reindex;

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use database::{Database, DatabaseError};

/// One track as persisted in the library database.
///
/// Everything except `path` comes from file tags and may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub title: String,
    /// 1-based position within the album, when the tag carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Index into the deduplicated cover store, when the file had
    /// embedded art.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<u32>,
}

/// Where a track's artwork comes from.
///
/// Tracks without embedded art fall back to a `cover.jpg` sitting next
/// to the audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtSource {
    /// Index into the cover store written by reindex.
    Embedded(u32),
    SiblingFile(PathBuf),
}

impl Track {
    pub fn art_source(&self) -> ArtSource {
        match self.cover {
            Some(idx) => ArtSource::Embedded(idx),
            None => {
                let dir = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
                ArtSource::SiblingFile(dir.join("cover.jpg"))
            }
        }
    }

    /// `"artist - album"`, the key albums are grouped and searched under.
    pub fn album_ref(&self) -> String {
        format!("{} - {}", self.artist, self.album)
    }
}

/// The ordered track list for one playback session.
///
/// The order fixed here is the order the engine queue is primed in and
/// the index space for goto/next/prev; it never changes afterwards.
#[derive(Debug, Clone)]
pub struct Album {
    tracks: Vec<Track>,
}

impl Album {
    /// Sorts once: numbered tracks numerically, unnumbered ones after
    /// them by case-insensitive title. The sort is stable, so two
    /// unnumbered tracks with equal titles keep their input order.
    pub fn new(mut tracks: Vec<Track>) -> Self {
        tracks.sort_by(|a, b| match (a.track, b.track) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        });
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn find_by_path(&self, path: &std::path::Path) -> Option<&Track> {
        self.tracks.iter().find(|t| t.path == path)
    }

    /// Total album duration in seconds, but only when every track has a
    /// known duration. A single missing duration hides the summary.
    pub fn total_duration(&self) -> Option<f64> {
        let mut total = 0.0;
        for t in &self.tracks {
            total += t.duration?;
        }
        Some(total)
    }

    /// Best output sample rate for the album (max across tracks,
    /// floored at 44.1kHz).
    pub fn output_sample_rate(&self) -> u32 {
        self.tracks
            .iter()
            .filter_map(|t| t.sample_rate)
            .fold(44_100, u32::max)
    }
}
