//! The playback session: one album, one engine, one panel.
//!
//! The session owns the event loop. Every 500 ms it reconciles the
//! panel against what the engine reports, so track advances made by the
//! engine on its own (end of a song) and jumps we asked for are handled
//! by the same code path. Keys, the digit-jump debounce, cover loads
//! and the poll timers all meet in one `select!`.

pub mod cover;
pub mod navigator;
pub mod timing;

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::engine::Engine;
use crate::library::Album;
use crate::ui::{format_clock, Metadata, Renderer};

use cover::{CoverLoaded, CoverState};
use navigator::TrackNavigator;
use timing::{PlaybackClock, Reconciled};

/// Engine reconciliation period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// How long an ambiguous digit buffer waits before being read as a
/// plain track number.
pub const JUMP_DEBOUNCE: Duration = Duration::from_millis(500);

/// What a keypress asks of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    /// A digit left the buffer ambiguous; (re)arm the debounce.
    ArmJumpDeadline,
    /// The buffer resolved; drop any pending debounce.
    CancelJumpDeadline,
    Quit,
}

pub struct Session<E, R> {
    engine: E,
    renderer: R,
    album: Album,
    database_dir: PathBuf,
    clock: PlaybackClock,
    navigator: TrackNavigator,
    cover: CoverState,
    cover_tx: mpsc::Sender<CoverLoaded>,
    cover_rx: Option<mpsc::Receiver<CoverLoaded>>,
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Sleeps until `deadline`, or forever when there is none. Recreated
/// every loop iteration, so clearing the option cancels the timer.
async fn deadline_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<E: Engine, R: Renderer> Session<E, R> {
    pub fn new(engine: E, renderer: R, album: Album, database_dir: PathBuf) -> Self {
        let track_count = album.len();
        let (cover_tx, cover_rx) = mpsc::channel(8);
        Self {
            engine,
            renderer,
            album,
            database_dir,
            clock: PlaybackClock::new(),
            navigator: TrackNavigator::new(track_count),
            cover: CoverState::default(),
            cover_tx,
            cover_rx: Some(cover_rx),
        }
    }

    /// Reserves the panel. The engine arrives already primed: every
    /// track queued in album order and playback started.
    pub fn start(&mut self) -> Result<()> {
        self.renderer.setup()
    }

    /// One reconciliation pass: fold the engine report into the clock,
    /// redraw the static block on a track change, and advance the
    /// elapsed display.
    pub fn poll(&mut self, now: u64) -> Result<()> {
        if let Some(song) = self.engine.current_song()? {
            if self.clock.reconcile(&song, now) == Reconciled::TrackChanged {
                match self.album.find_by_path(&song.path) {
                    Some(track) => {
                        self.clock.set_duration(track.duration);
                        let metadata = Metadata::for_track(&self.album, track);
                        self.renderer.draw_metadata(&metadata)?;
                        let art = CoverState::resolve(track, &self.database_dir);
                        self.cover.request(art, self.cover_tx.clone());
                    }
                    None => {
                        // engine playing something outside the catalog
                        debug!("no metadata for {}", song.path.display());
                        self.clock.set_duration(None);
                        self.renderer.draw_metadata(&Metadata::blank())?;
                    }
                }
            }
        }

        if self.clock.show_elapsed(now) {
            let elapsed = self.clock.elapsed_ms(now) as f64 / 1000.0;
            self.renderer.draw_elapsed(&format_clock(elapsed))?;
        }
        Ok(())
    }

    pub fn handle_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        now: u64,
    ) -> Result<KeyOutcome> {
        match code {
            KeyCode::Char('q') => return Ok(KeyOutcome::Quit),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(KeyOutcome::Quit)
            }
            KeyCode::Char(' ') => {
                if self.clock.is_paused() {
                    self.engine.play()?;
                } else {
                    self.engine.pause()?;
                }
                self.clock.toggle_pause(now);
            }
            KeyCode::Char('n') | KeyCode::Down => self.engine.next()?,
            KeyCode::Char('p') | KeyCode::Up => self.engine.prev()?,
            KeyCode::Char(digit @ '0'..='9') => {
                return match self.navigator.push(digit) {
                    Some(index) => {
                        self.jump(index)?;
                        Ok(KeyOutcome::CancelJumpDeadline)
                    }
                    None => Ok(KeyOutcome::ArmJumpDeadline),
                };
            }
            _ => {}
        }
        Ok(KeyOutcome::Continue)
    }

    /// Debounce deadline fired: resolve the buffer numerically.
    pub fn flush_jump(&mut self) -> Result<()> {
        if let Some(index) = self.navigator.flush() {
            self.jump(index)?;
        }
        Ok(())
    }

    /// Jump to a 1-based track index. The clock forgets its current
    /// track so the next poll re-renders even when the engine lands on
    /// the same file.
    fn jump(&mut self, index: usize) -> Result<()> {
        info!("jumping to track {index}");
        self.clock.invalidate();
        self.engine.goto(index)
    }

    /// A cover read finished; draw it unless a newer request superseded
    /// it in the meantime.
    pub fn cover_loaded(&mut self, loaded: CoverLoaded) -> Result<()> {
        if !self.cover.is_current(&loaded) {
            return Ok(());
        }
        match image::load_from_memory(&loaded.data) {
            Ok(img) => self.renderer.draw_cover(&img),
            Err(e) => {
                error!("decoding cover {}: {e}", loaded.path.display());
                Ok(())
            }
        }
    }

    /// Runs the session until quit. Completion of this future is the
    /// end of the session; the caller restores the prompt after it.
    pub async fn run(mut self) -> Result<()> {
        let mut cover_rx = self
            .cover_rx
            .take()
            .context("session already ran")?;

        terminal::enable_raw_mode()?;
        let result = self.event_loop(&mut cover_rx).await;
        terminal::disable_raw_mode()?;
        self.renderer.teardown()?;
        result
    }

    async fn event_loop(&mut self, cover_rx: &mut mpsc::Receiver<CoverLoaded>) -> Result<()> {
        self.start()?;

        let started = Instant::now();
        let mut ticker = time::interval_at(started + POLL_INTERVAL, POLL_INTERVAL);
        // one extra early pass so the panel fills before the first
        // full interval elapses
        let mut early_poll = Some(started + POLL_INTERVAL / 4);
        let mut jump_deadline: Option<Instant> = None;
        let mut keys = EventStream::new();

        self.poll(epoch_ms())?;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(epoch_ms())?,
                _ = deadline_sleep(early_poll) => {
                    early_poll = None;
                    self.poll(epoch_ms())?;
                }
                _ = deadline_sleep(jump_deadline) => {
                    jump_deadline = None;
                    self.flush_jump()?;
                }
                Some(loaded) = cover_rx.recv() => self.cover_loaded(loaded)?,
                event = keys.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code, key.modifiers, epoch_ms())? {
                            KeyOutcome::Quit => break,
                            KeyOutcome::ArmJumpDeadline => {
                                jump_deadline = Some(Instant::now() + JUMP_DEBOUNCE);
                            }
                            KeyOutcome::CancelJumpDeadline => jump_deadline = None,
                            KeyOutcome::Continue => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }
        }
        Ok(())
    }
}
