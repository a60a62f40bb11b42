//! Album search over the indexed library.
//!
//! The index is a flat list of album references paired with a searchable
//! haystack (artist, album title and track titles mashed together). It is
//! rebuilt at reindex time and persisted next to the database so lookups
//! never re-read audio files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::library::Track;

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub album_ref: String,
    haystack: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchIndex {
    entries: Vec<IndexEntry>,
}

impl SearchIndex {
    pub fn build<'a>(albums: impl IntoIterator<Item = (&'a str, &'a [Track])>) -> Self {
        let entries = albums
            .into_iter()
            .map(|(album_ref, tracks)| {
                let mut haystack = album_ref.to_string();
                for track in tracks {
                    haystack.push(' ');
                    haystack.push_str(&track.title);
                }
                IndexEntry {
                    album_ref: album_ref.to_string(),
                    haystack,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading search index {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing search index {}", path.display()))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(INDEX_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw)
            .with_context(|| format!("writing search index {}", path.display()))
    }

    /// Fuzzy-match `query` against every album, best score first.
    pub fn query(&self, query: &str) -> Vec<&str> {
        let matcher = SkimMatcherV2::default();
        let mut matched: Vec<(i64, &str)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                matcher
                    .fuzzy_match(&entry.haystack, query)
                    .map(|score| (score, entry.album_ref.as_str()))
            })
            .collect();
        matched.sort_by(|a, b| b.0.cmp(&a.0));
        debug!("query {query:?} matched {} albums", matched.len());
        matched.into_iter().map(|(_, album)| album).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.to_string(),
            ..Track::default()
        }
    }

    fn index() -> SearchIndex {
        let mezzanine = [track("Angel"), track("Teardrop")];
        let kid_a = [track("Everything in Its Right Place"), track("Idioteque")];
        SearchIndex::build([
            ("Massive Attack - Mezzanine", &mezzanine[..]),
            ("Radiohead - Kid A", &kid_a[..]),
        ])
    }

    #[test]
    fn matches_album_title() {
        let idx = index();
        assert_eq!(idx.query("mezzanine"), vec!["Massive Attack - Mezzanine"]);
    }

    #[test]
    fn matches_track_title() {
        let idx = index();
        assert_eq!(idx.query("idioteque"), vec!["Radiohead - Kid A"]);
    }

    #[test]
    fn no_match_is_none() {
        let idx = index();
        assert!(idx.query("zzzzqqqq").is_empty());
    }

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        index().save(dir.path()).unwrap();
        let loaded = SearchIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.query("teardrop"), vec!["Massive Attack - Mezzanine"]);
    }
}
