use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use image::DynamicImage;

use aria::engine::{CurrentSong, Engine};
use aria::library::{Album, Track};
use aria::session::cover::CoverLoaded;
use aria::session::{KeyOutcome, Session};
use aria::ui::{Metadata, Renderer};

#[derive(Debug, Default)]
struct FakeEngineState {
    queued: Vec<PathBuf>,
    playing: bool,
    gotos: Vec<usize>,
    nexts: usize,
    prevs: usize,
    current: Option<CurrentSong>,
}

#[derive(Debug, Clone, Default)]
struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
}

impl FakeEngine {
    fn report(&self, path: &str, first_read: Option<u64>, end_of_decode: bool) {
        self.state.lock().unwrap().current = Some(CurrentSong {
            path: PathBuf::from(path),
            first_read_timestamp: first_read,
            end_of_decode,
        });
    }

    fn snapshot<T>(&self, f: impl FnOnce(&FakeEngineState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }
}

impl Engine for FakeEngine {
    fn queue(&self, path: &std::path::Path) -> Result<()> {
        self.state.lock().unwrap().queued.push(path.to_path_buf());
        Ok(())
    }

    fn play(&self) -> Result<()> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn next(&self) -> Result<()> {
        self.state.lock().unwrap().nexts += 1;
        Ok(())
    }

    fn prev(&self) -> Result<()> {
        self.state.lock().unwrap().prevs += 1;
        Ok(())
    }

    fn goto(&self, index: usize) -> Result<()> {
        self.state.lock().unwrap().gotos.push(index);
        Ok(())
    }

    fn current_song(&self) -> Result<Option<CurrentSong>> {
        Ok(self.state.lock().unwrap().current.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Drawn {
    Setup,
    Metadata(Metadata),
    Elapsed(String),
    Cover,
    Teardown,
}

#[derive(Debug, Clone, Default)]
struct FakeRenderer {
    drawn: Arc<Mutex<Vec<Drawn>>>,
}

impl FakeRenderer {
    fn drawn(&self) -> Vec<Drawn> {
        self.drawn.lock().unwrap().clone()
    }

    fn elapsed_draws(&self) -> Vec<String> {
        self.drawn()
            .into_iter()
            .filter_map(|d| match d {
                Drawn::Elapsed(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn metadata_draws(&self) -> Vec<Metadata> {
        self.drawn()
            .into_iter()
            .filter_map(|d| match d {
                Drawn::Metadata(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for FakeRenderer {
    fn setup(&mut self) -> Result<()> {
        self.drawn.lock().unwrap().push(Drawn::Setup);
        Ok(())
    }

    fn draw_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.drawn
            .lock()
            .unwrap()
            .push(Drawn::Metadata(metadata.clone()));
        Ok(())
    }

    fn draw_elapsed(&mut self, clock: &str) -> Result<()> {
        self.drawn
            .lock()
            .unwrap()
            .push(Drawn::Elapsed(clock.to_string()));
        Ok(())
    }

    fn draw_cover(&mut self, _image: &DynamicImage) -> Result<()> {
        self.drawn.lock().unwrap().push(Drawn::Cover);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.drawn.lock().unwrap().push(Drawn::Teardown);
        Ok(())
    }
}

fn track(path: &str, number: u32, title: &str, duration: Option<f64>) -> Track {
    Track {
        path: PathBuf::from(path),
        artist: "Massive Attack".into(),
        album: "Mezzanine".into(),
        title: title.into(),
        track: Some(number),
        year: Some(1998),
        duration,
        ..Track::default()
    }
}

/// Two-track album: the second track's length is unknown, so the panel
/// must never show an album summary.
fn test_album() -> Album {
    Album::new(vec![
        track("/m/01.flac", 1, "Angel", Some(125.0)),
        track("/m/02.flac", 2, "Risingson", None),
    ])
}

fn session(
    album: Album,
) -> (Session<FakeEngine, FakeRenderer>, FakeEngine, FakeRenderer) {
    let engine = FakeEngine::default();
    let renderer = FakeRenderer::default();
    let session = Session::new(
        engine.clone(),
        renderer.clone(),
        album,
        PathBuf::from("/tmp/aria-test-db"),
    );
    (session, engine, renderer)
}

#[tokio::test]
async fn start_reserves_the_panel_before_anything_is_drawn() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();
    assert_eq!(renderer.drawn(), vec![Drawn::Setup]);
    // priming the queue is the caller's job, not the session's
    engine.snapshot(|s| {
        assert!(s.queued.is_empty());
        assert!(!s.playing);
    });
}

#[tokio::test]
async fn first_poll_renders_metadata_and_a_correct_clock() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();

    engine.report("/m/01.flac", Some(10_000), false);
    session.poll(13_000).unwrap();

    let metadata = renderer.metadata_draws();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0].album_line, "Mezzanine (1998)");
    assert_eq!(metadata[0].title_line, "1. Angel");
    assert_eq!(metadata[0].duration_line, "00:00 / 02:05");
    assert_eq!(metadata[0].summary, None);
    assert_eq!(renderer.elapsed_draws(), vec!["00:03"]);
}

#[tokio::test]
async fn metadata_is_drawn_once_per_track_change() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();

    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();
    session.poll(500).unwrap();
    session.poll(1_000).unwrap();
    assert_eq!(renderer.metadata_draws().len(), 1);
    assert_eq!(renderer.elapsed_draws(), vec!["00:00", "00:00", "00:01"]);

    // the engine advances on its own at the end of the song
    engine.report("/m/02.flac", Some(125_000), false);
    session.poll(125_200).unwrap();
    let metadata = renderer.metadata_draws();
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[1].title_line, "2. Risingson");
}

#[tokio::test]
async fn unknown_path_renders_blank_fields() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();

    engine.report("/elsewhere/other.flac", Some(0), false);
    session.poll(0).unwrap();

    let metadata = renderer.metadata_draws();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0], Metadata::blank());
    // the clock still runs against the unknown track
    session.poll(2_000).unwrap();
    assert_eq!(renderer.elapsed_draws(), vec!["00:00", "00:02"]);
}

#[tokio::test]
async fn nothing_is_drawn_before_the_engine_reports_a_song() {
    let (mut session, _engine, renderer) = session(test_album());
    session.start().unwrap();

    session.poll(1_000).unwrap();
    assert!(renderer.metadata_draws().is_empty());
    assert!(renderer.elapsed_draws().is_empty());
}

#[tokio::test]
async fn space_pauses_the_engine_and_freezes_the_clock() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();
    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();

    let outcome = session
        .handle_key(KeyCode::Char(' '), KeyModifiers::NONE, 5_000)
        .unwrap();
    assert_eq!(outcome, KeyOutcome::Continue);
    assert!(engine.snapshot(|s| !s.playing));

    session.poll(30_000).unwrap();
    session.poll(60_000).unwrap();
    assert_eq!(renderer.elapsed_draws(), vec!["00:00", "00:05", "00:05"]);

    // resume: the clock continues from the freeze point
    session
        .handle_key(KeyCode::Char(' '), KeyModifiers::NONE, 60_000)
        .unwrap();
    assert!(engine.snapshot(|s| s.playing));
    session.poll(62_000).unwrap();
    assert_eq!(renderer.elapsed_draws().last().unwrap(), "00:07");
}

#[tokio::test]
async fn unique_digit_jumps_immediately() {
    let (mut session, engine, _renderer) = session(test_album());
    session.start().unwrap();

    let outcome = session
        .handle_key(KeyCode::Char('2'), KeyModifiers::NONE, 0)
        .unwrap();
    assert_eq!(outcome, KeyOutcome::CancelJumpDeadline);
    assert_eq!(engine.snapshot(|s| s.gotos.clone()), vec![2]);
}

#[tokio::test]
async fn ambiguous_digit_waits_for_the_debounce() {
    let twelve = Album::new(
        (1..=12)
            .map(|i| track(&format!("/m/{i:02}.flac"), i, "t", Some(60.0)))
            .collect(),
    );
    let (mut session, engine, _renderer) = session(twelve);
    session.start().unwrap();

    let outcome = session
        .handle_key(KeyCode::Char('1'), KeyModifiers::NONE, 0)
        .unwrap();
    assert_eq!(outcome, KeyOutcome::ArmJumpDeadline);
    assert!(engine.snapshot(|s| s.gotos.is_empty()));

    // deadline fires: "1" is read as track 1
    session.flush_jump().unwrap();
    assert_eq!(engine.snapshot(|s| s.gotos.clone()), vec![1]);
}

#[tokio::test]
async fn jump_to_the_playing_track_still_rerenders() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();
    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();
    assert_eq!(renderer.metadata_draws().len(), 1);

    session
        .handle_key(KeyCode::Char('1'), KeyModifiers::NONE, 100)
        .unwrap();
    // the engine restarts the same file with a fresh first read
    engine.report("/m/01.flac", Some(200), false);
    session.poll(300).unwrap();
    assert_eq!(renderer.metadata_draws().len(), 2);
}

#[tokio::test]
async fn next_and_prev_keys_reach_the_engine() {
    let (mut session, engine, _renderer) = session(test_album());
    session.start().unwrap();

    session
        .handle_key(KeyCode::Char('n'), KeyModifiers::NONE, 0)
        .unwrap();
    session
        .handle_key(KeyCode::Down, KeyModifiers::NONE, 0)
        .unwrap();
    session
        .handle_key(KeyCode::Char('p'), KeyModifiers::NONE, 0)
        .unwrap();
    session
        .handle_key(KeyCode::Up, KeyModifiers::NONE, 0)
        .unwrap();
    engine.snapshot(|s| {
        assert_eq!(s.nexts, 2);
        assert_eq!(s.prevs, 2);
    });
}

#[tokio::test]
async fn q_and_ctrl_c_quit() {
    let (mut session, _engine, _renderer) = session(test_album());
    let q = session
        .handle_key(KeyCode::Char('q'), KeyModifiers::NONE, 0)
        .unwrap();
    assert_eq!(q, KeyOutcome::Quit);
    let ctrl_c = session
        .handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, 0)
        .unwrap();
    assert_eq!(ctrl_c, KeyOutcome::Quit);
}

#[tokio::test]
async fn clock_stops_drawing_once_decode_and_duration_run_out() {
    let (mut session, engine, renderer) = session(test_album());
    session.start().unwrap();

    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();

    // decoder finished but the song is still sounding out
    engine.report("/m/01.flac", Some(0), true);
    session.poll(124_000).unwrap();
    assert_eq!(renderer.elapsed_draws().last().unwrap(), "02:04");

    let draws_before = renderer.elapsed_draws().len();
    session.poll(125_000).unwrap();
    session.poll(126_000).unwrap();
    assert_eq!(renderer.elapsed_draws().len(), draws_before);
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn loaded_cover_is_drawn_only_when_still_current() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cover0"), png_bytes()).unwrap();

    let album = Album::new(vec![Track {
        cover: Some(0),
        ..track("/m/01.flac", 1, "Angel", Some(125.0))
    }]);
    let engine = FakeEngine::default();
    let renderer = FakeRenderer::default();
    let mut session = Session::new(
        engine.clone(),
        renderer.clone(),
        album,
        dir.path().to_path_buf(),
    );
    session.start().unwrap();

    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();

    // the read the poll kicked off comes back
    session
        .cover_loaded(CoverLoaded {
            path: dir.path().join("cover0"),
            data: png_bytes(),
        })
        .unwrap();
    assert_eq!(
        renderer.drawn().iter().filter(|d| **d == Drawn::Cover).count(),
        1
    );

    // a stale read for some other path is ignored
    session
        .cover_loaded(CoverLoaded {
            path: PathBuf::from("/elsewhere/cover.jpg"),
            data: png_bytes(),
        })
        .unwrap();
    assert_eq!(
        renderer.drawn().iter().filter(|d| **d == Drawn::Cover).count(),
        1
    );
}

#[tokio::test]
async fn corrupt_cover_bytes_are_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cover0"), b"not an image").unwrap();

    let album = Album::new(vec![Track {
        cover: Some(0),
        ..track("/m/01.flac", 1, "Angel", Some(125.0))
    }]);
    let engine = FakeEngine::default();
    let renderer = FakeRenderer::default();
    let mut session = Session::new(
        engine.clone(),
        renderer.clone(),
        album,
        dir.path().to_path_buf(),
    );
    session.start().unwrap();
    engine.report("/m/01.flac", Some(0), false);
    session.poll(0).unwrap();

    session
        .cover_loaded(CoverLoaded {
            path: dir.path().join("cover0"),
            data: b"not an image".to_vec(),
        })
        .unwrap();
    assert!(renderer.drawn().iter().all(|d| *d != Drawn::Cover));
}
