pub mod local;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use local::LocalEngine;

/// What the engine reports about the track it is currently decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSong {
    pub path: PathBuf,
    /// Epoch milliseconds when the engine first produced audio for this
    /// track. Engines that cannot pin this down report `None` and the
    /// session captures its own wall-clock fallback.
    pub first_read_timestamp: Option<u64>,
    /// True once the decoder has consumed the whole file.
    pub end_of_decode: bool,
}

/// The narrow interface the playback session drives the audio engine
/// through. Decoding, buffering and output are the engine's business.
pub trait Engine {
    /// Appends a file to the back of the play queue.
    fn queue(&self, path: &Path) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn next(&self) -> Result<()>;
    fn prev(&self) -> Result<()>;
    /// Jumps to the 1-based position in the queued order. Callers
    /// validate the range; out-of-range targets are never issued.
    fn goto(&self, index: usize) -> Result<()>;
    fn current_song(&self) -> Result<Option<CurrentSong>>;
}
