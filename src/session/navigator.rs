//! Digit-buffer track jumping.
//!
//! Typed digits accumulate in a buffer. A buffer that is a unique
//! prefix of exactly one track number resolves immediately; an
//! ambiguous one waits for the debounce deadline, at which point the
//! buffer is read as a plain number and jumped to if it names a track.
//! A leading zero switches matching to zero-padded labels, so in a
//! 12-track album "03" resolves without also shadowing track 1.

use tracing::debug;

/// Resolves typed digits to 1-based track indices.
#[derive(Debug)]
pub struct TrackNavigator {
    buffer: String,
    track_count: usize,
}

impl TrackNavigator {
    pub fn new(track_count: usize) -> Self {
        Self {
            buffer: String::new(),
            track_count,
        }
    }

    /// Width of zero-padded track labels: the decimal width of the
    /// track count.
    fn pad_width(&self) -> usize {
        self.track_count.to_string().len()
    }

    fn label(&self, index: usize) -> String {
        if self.buffer.starts_with('0') {
            format!("{index:0width$}", width = self.pad_width())
        } else {
            index.to_string()
        }
    }

    /// Feeds one typed digit. Returns the track to jump to when the
    /// buffer now names exactly one track; `None` means the caller
    /// should (re)arm the debounce deadline.
    pub fn push(&mut self, digit: char) -> Option<usize> {
        debug_assert!(digit.is_ascii_digit());
        self.buffer.push(digit);

        let mut matches = (1..=self.track_count).filter(|&i| self.label(i).starts_with(&self.buffer));
        match (matches.next(), matches.next()) {
            (Some(only), None) => {
                debug!("digit buffer {:?} uniquely names track {only}", self.buffer);
                self.buffer.clear();
                Some(only)
            }
            _ => None,
        }
    }

    /// Debounce deadline fired: read the buffer as a plain number and
    /// jump if it names a track, otherwise discard it.
    pub fn flush(&mut self) -> Option<usize> {
        let buffer = std::mem::take(&mut self.buffer);
        let parsed = buffer.parse::<usize>().ok()?;
        (1..=self.track_count)
            .contains(&parsed)
            .then_some(parsed)
    }

    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
