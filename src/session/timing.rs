//! Pause-aware elapsed-time reconciliation.
//!
//! The engine only reports when it first read the current file; elapsed
//! time is derived on our side. Pausing freezes the reading, and every
//! resume shifts the first-read baseline forward by the pause span so
//! the clock continues where it stopped.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::CurrentSong;

/// What a poll pass learned about the engine's current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Same track as before, nothing to re-render beyond the clock.
    Unchanged,
    /// The engine moved on to another file.
    TrackChanged,
}

#[derive(Debug)]
pub struct PlaybackClock {
    current_path: Option<PathBuf>,
    first_read: u64,
    paused: bool,
    paused_at: u64,
    /// Duration of the current track in seconds. Unbounded until the
    /// library metadata for the track is known.
    duration: f64,
    end_of_decode: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            current_path: None,
            first_read: 0,
            paused: false,
            paused_at: 0,
            duration: f64::INFINITY,
            end_of_decode: false,
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Folds one engine report into the clock. `now` is epoch
    /// milliseconds at the time of the poll.
    pub fn reconcile(&mut self, song: &CurrentSong, now: u64) -> Reconciled {
        let changed = self.current_path.as_deref() != Some(song.path.as_path());
        self.end_of_decode = song.end_of_decode;
        if !changed {
            return Reconciled::Unchanged;
        }

        debug!("track changed to {}", song.path.display());
        self.current_path = Some(song.path.clone());
        self.first_read = song.first_read_timestamp.unwrap_or(now);
        // a new track starts with unknown length until metadata arrives
        self.duration = f64::INFINITY;
        // re-baseline so a paused clock reads as 00:00, not a stale span
        self.paused_at = self.first_read;
        Reconciled::TrackChanged
    }

    /// Forgets the current track. The next reconcile pass treats
    /// whatever the engine reports as a change, forcing a re-render
    /// even when a jump lands on the file already playing.
    pub fn invalidate(&mut self) {
        self.current_path = None;
    }

    /// Records the track length once library metadata is resolved.
    pub fn set_duration(&mut self, seconds: Option<f64>) {
        self.duration = seconds.unwrap_or(f64::INFINITY);
    }

    pub fn pause(&mut self, now: u64) {
        if !self.paused {
            self.paused = true;
            self.paused_at = now;
        }
    }

    /// Shifts the baseline forward by the span spent paused, so elapsed
    /// time continues from where it froze.
    pub fn resume(&mut self, now: u64) {
        if self.paused {
            self.paused = false;
            self.first_read += now.saturating_sub(self.paused_at);
        }
    }

    pub fn toggle_pause(&mut self, now: u64) -> bool {
        if self.paused {
            self.resume(now);
        } else {
            self.pause(now);
        }
        self.paused
    }

    pub fn elapsed_ms(&self, now: u64) -> u64 {
        let reference = if self.paused { self.paused_at } else { now };
        // the engine stamps first_read on its own thread, so it can land
        // a moment ahead of the `now` the poll captured
        reference.saturating_sub(self.first_read)
    }

    /// Whether the elapsed clock should be drawn at all. Once the
    /// decoder has finished and the clock has reached the track length,
    /// the display freezes at the full duration instead of counting
    /// past it.
    pub fn show_elapsed(&self, now: u64) -> bool {
        if self.current_path.is_none() {
            return false;
        }
        let elapsed_secs = self.elapsed_ms(now) as f64 / 1000.0;
        !(self.end_of_decode && elapsed_secs >= self.duration)
    }
}
