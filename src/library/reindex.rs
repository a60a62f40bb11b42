//! Library reindexing: walk a music directory, read tags, and rebuild
//! the database, the search index and the cover store from scratch.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::PictureType;
use lofty::tag::Accessor;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::library::database::{cover_path, Database};
use crate::library::Track;
use crate::search::SearchIndex;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "mp4", "ogg", "opus", "wav", "aiff"];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// Deduplicated store of embedded cover images. Identical bytes across
/// tracks of an album collapse to one entry.
#[derive(Default)]
struct CoverStore {
    covers: Vec<Vec<u8>>,
}

impl CoverStore {
    fn insert(&mut self, data: &[u8]) -> u32 {
        match self.covers.iter().position(|c| c == data) {
            Some(idx) => idx as u32,
            None => {
                self.covers.push(data.to_vec());
                (self.covers.len() - 1) as u32
            }
        }
    }

    fn write(&self, dir: &Path) -> Result<()> {
        for (idx, data) in self.covers.iter().enumerate() {
            let path = cover_path(dir, idx as u32);
            fs::write(&path, data)
                .with_context(|| format!("writing cover {}", path.display()))?;
        }
        Ok(())
    }
}

fn front_cover(tagged: &lofty::file::TaggedFile) -> Option<&[u8]> {
    for tag in tagged.tags() {
        for picture in tag.pictures() {
            if picture.pic_type() == PictureType::CoverFront
                || picture.pic_type() == PictureType::Other
            {
                return Some(picture.data());
            }
        }
    }
    None
}

fn read_track(path: &Path, covers: &mut CoverStore) -> Option<Track> {
    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            warn!("skipping {}: {e}", path.display());
            return None;
        }
    };

    let properties = tagged.properties();
    let duration = properties.duration().as_secs_f64();
    let sample_rate = properties.sample_rate();
    let cover = front_cover(&tagged).map(|data| covers.insert(data));

    let default_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let mut track = Track {
        path: path.to_path_buf(),
        title: default_title,
        duration: (duration > 0.0).then_some(duration),
        sample_rate,
        cover,
        ..Track::default()
    };
    if let Some(tag) = tag {
        if let Some(title) = tag.title().filter(|t| !t.trim().is_empty()) {
            track.title = title.to_string();
        }
        if let Some(artist) = tag.artist() {
            track.artist = artist.to_string();
        }
        if let Some(album) = tag.album() {
            track.album = album.to_string();
        }
        track.track = tag.track();
        track.year = tag.year();
    }
    Some(track)
}

/// Rebuilds the database directory from the music under `music_dir`.
///
/// The old database directory is removed first so cover files from a
/// previous run never leak into the new store.
pub fn reindex(music_dir: &Path, database_dir: &Path) -> Result<Database> {
    info!(
        "reindexing {} into {}",
        music_dir.display(),
        database_dir.display()
    );

    let mut covers = CoverStore::default();
    let mut tracks: Vec<Track> = Vec::new();

    for entry in WalkDir::new(music_dir).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_audio_file(path) {
            debug!("reading {}", path.display());
            if let Some(track) = read_track(path, &mut covers) {
                tracks.push(track);
            }
        }
    }

    if database_dir.exists() {
        fs::remove_dir_all(database_dir)
            .with_context(|| format!("clearing {}", database_dir.display()))?;
    }
    fs::create_dir_all(database_dir)
        .with_context(|| format!("creating {}", database_dir.display()))?;

    let database = Database::from_tracks(tracks);
    database.save(database_dir)?;
    let index = SearchIndex::build(database.albums());
    index.save(database_dir)?;
    covers.write(database_dir)?;

    info!(
        "indexed {} tracks in {} albums, {} covers",
        database.track_count(),
        database.album_count(),
        covers.covers.len()
    );
    Ok(database)
}
