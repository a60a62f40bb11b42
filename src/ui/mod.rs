//! Inline playback panel.
//!
//! The panel lives in the normal terminal scrollback rather than an
//! alternate screen: eleven lines are reserved below the prompt, the
//! cursor position is saved as an anchor, and every redraw restores the
//! anchor and moves up by a fixed offset. Artwork fills a 20-column,
//! 10-row block on the left using upper-half-block cells with the top
//! pixel as foreground and the bottom pixel as background; metadata
//! starts at column 21.

use std::io::{self, Write};

use anyhow::Result;
use crossterm::cursor::{Hide, MoveToColumn, MoveUp, RestorePosition, SavePosition, Show};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use image::{DynamicImage, GenericImageView};

use crate::library::{Album, Track};

/// Total panel height: 10 artwork rows plus one spacer above the anchor.
pub const PANEL_LINES: u16 = 11;
/// First column of the metadata block, right of the artwork.
pub const METADATA_COLUMN: u16 = 20;

pub const COVER_COLUMNS: u32 = 20;
pub const COVER_ROWS: u32 = 10;

/// Seconds to a `MM:SS` clock.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `"<n> songs (<total>)"`, or nothing when any track length is
/// unknown; a partial sum would understate the album.
pub fn album_summary(album: &Album) -> Option<String> {
    let total = album.total_duration()?;
    Some(format!("{} songs ({})", album.len(), format_clock(total)))
}

/// The static text block for one track, formatted once per track
/// change. The elapsed clock is the only part redrawn per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub album_line: String,
    pub artist: String,
    pub title_line: String,
    pub duration_line: String,
    pub summary: Option<String>,
}

impl Metadata {
    pub fn for_track(album: &Album, track: &Track) -> Self {
        let album_line = match track.year {
            Some(year) => format!("{} ({year})", track.album),
            None => track.album.clone(),
        };
        let title_line = match track.track {
            Some(number) => format!("{number}. {}", track.title),
            None => track.title.clone(),
        };
        let duration_line = match track.duration {
            Some(seconds) => format!("00:00 / {}", format_clock(seconds)),
            None => String::new(),
        };
        Self {
            album_line,
            artist: track.artist.clone(),
            title_line,
            duration_line,
            summary: album_summary(album),
        }
    }

    /// All-blank fields, drawn when the engine reports a path the
    /// catalog does not know.
    pub fn blank() -> Self {
        Self {
            album_line: String::new(),
            artist: String::new(),
            title_line: String::new(),
            duration_line: String::new(),
            summary: None,
        }
    }
}

/// Drawing seam between the session and the terminal.
pub trait Renderer {
    /// Reserves the panel area and saves the cursor anchor.
    fn setup(&mut self) -> Result<()>;
    fn draw_metadata(&mut self, metadata: &Metadata) -> Result<()>;
    /// Overwrites the elapsed part of the duration line.
    fn draw_elapsed(&mut self, clock: &str) -> Result<()>;
    fn draw_cover(&mut self, image: &DynamicImage) -> Result<()>;
    /// Moves the cursor back below the panel.
    fn teardown(&mut self) -> Result<()>;
}

pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Restore the anchor, then position at `rows_up` above it in the
    /// given column.
    fn move_to(&mut self, rows_up: u16, column: u16) -> Result<()> {
        queue!(
            self.out,
            RestorePosition,
            MoveUp(rows_up),
            MoveToColumn(column)
        )?;
        Ok(())
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn setup(&mut self) -> Result<()> {
        execute!(
            self.out,
            Print("\n".repeat(PANEL_LINES as usize)),
            SavePosition,
            Hide
        )?;
        Ok(())
    }

    fn draw_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        // each field overwrites whatever the previous track left there
        self.move_to(10, METADATA_COLUMN)?;
        queue!(
            self.out,
            Clear(ClearType::UntilNewLine),
            Print(&metadata.album_line)
        )?;

        self.move_to(9, METADATA_COLUMN)?;
        queue!(
            self.out,
            Clear(ClearType::UntilNewLine),
            SetForegroundColor(Color::DarkGrey),
            Print(&metadata.artist),
            ResetColor
        )?;

        self.move_to(7, METADATA_COLUMN)?;
        queue!(
            self.out,
            Clear(ClearType::UntilNewLine),
            SetAttribute(Attribute::Bold),
            Print(&metadata.title_line),
            SetAttribute(Attribute::Reset)
        )?;

        self.move_to(4, METADATA_COLUMN)?;
        queue!(
            self.out,
            Clear(ClearType::UntilNewLine),
            Print(&metadata.duration_line)
        )?;

        self.move_to(2, METADATA_COLUMN)?;
        queue!(self.out, Clear(ClearType::UntilNewLine))?;
        if let Some(summary) = &metadata.summary {
            queue!(
                self.out,
                SetForegroundColor(Color::DarkGrey),
                Print(summary),
                ResetColor
            )?;
        }

        queue!(self.out, RestorePosition)?;
        self.out.flush()?;
        Ok(())
    }

    fn draw_elapsed(&mut self, clock: &str) -> Result<()> {
        self.move_to(4, METADATA_COLUMN)?;
        queue!(self.out, Print(clock), RestorePosition)?;
        self.out.flush()?;
        Ok(())
    }

    fn draw_cover(&mut self, image: &DynamicImage) -> Result<()> {
        // 2 pixels per terminal row
        let resized = image.resize_exact(
            COVER_COLUMNS,
            COVER_ROWS * 2,
            image::imageops::FilterType::Triangle,
        );

        for row in 0..COVER_ROWS {
            self.move_to((COVER_ROWS - row) as u16, 0)?;
            for x in 0..COVER_COLUMNS {
                let top = resized.get_pixel(x, row * 2);
                let bottom = resized.get_pixel(x, row * 2 + 1);
                // upper half block with fg=top pixel, bg=bottom pixel
                queue!(
                    self.out,
                    SetForegroundColor(Color::Rgb {
                        r: top[0],
                        g: top[1],
                        b: top[2]
                    }),
                    SetBackgroundColor(Color::Rgb {
                        r: bottom[0],
                        g: bottom[1],
                        b: bottom[2]
                    }),
                    Print('▀')
                )?;
            }
            queue!(self.out, ResetColor)?;
        }

        queue!(self.out, RestorePosition)?;
        self.out.flush()?;
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        execute!(self.out, RestorePosition, Show, Print("\n"))?;
        Ok(())
    }
}
