//! Local audio engine: rodio playback on a dedicated thread.
//!
//! The audio output stream is not `Send`, so it lives on its own thread
//! behind a command channel; status flows back through a shared handle
//! that `current_song()` snapshots.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rodio::{Decoder, OutputStream, Sink};
use tracing::{debug, warn};

use super::{CurrentSong, Engine};

enum EngineCmd {
    Queue(PathBuf),
    Play,
    Pause,
    Next,
    Prev,
    Goto(usize),
    Shutdown,
}

#[derive(Default)]
struct EngineStatus {
    current: Option<CurrentSong>,
}

pub struct LocalEngine {
    tx: Sender<EngineCmd>,
    status: Arc<Mutex<EngineStatus>>,
    handle: Option<JoinHandle<()>>,
}

impl LocalEngine {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(EngineStatus::default()));
        let worker_status = status.clone();
        let handle = std::thread::spawn(move || audio_thread(rx, worker_status));
        Self {
            tx,
            status,
            handle: Some(handle),
        }
    }

    fn send(&self, cmd: EngineCmd) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("audio thread is gone"))
    }
}

impl Engine for LocalEngine {
    fn queue(&self, path: &Path) -> Result<()> {
        self.send(EngineCmd::Queue(path.to_path_buf()))
    }

    fn play(&self) -> Result<()> {
        self.send(EngineCmd::Play)
    }

    fn pause(&self) -> Result<()> {
        self.send(EngineCmd::Pause)
    }

    fn next(&self) -> Result<()> {
        self.send(EngineCmd::Next)
    }

    fn prev(&self) -> Result<()> {
        self.send(EngineCmd::Prev)
    }

    fn goto(&self, index: usize) -> Result<()> {
        self.send(EngineCmd::Goto(index))
    }

    fn current_song(&self) -> Result<Option<CurrentSong>> {
        let status = self
            .status
            .lock()
            .map_err(|_| anyhow::anyhow!("engine status poisoned"))?;
        Ok(status.current.clone())
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn audio_thread(rx: Receiver<EngineCmd>, status: Arc<Mutex<EngineStatus>>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!("no audio output device: {e}");
            return;
        }
    };

    let mut queue: Vec<PathBuf> = Vec::new();
    let mut pos: usize = 0;
    let mut paused = true;
    let mut sink: Option<Sink> = None;
    let mut started = false;

    let set_current = |path: &Path, first_read: u64, end_of_decode: bool| {
        if let Ok(mut st) = status.lock() {
            st.current = Some(CurrentSong {
                path: path.to_path_buf(),
                first_read_timestamp: Some(first_read),
                end_of_decode,
            });
        }
    };

    let start_track = |queue: &[PathBuf],
                       pos: usize,
                       sink: &mut Option<Sink>,
                       paused: bool|
     -> Option<u64> {
        if let Some(old) = sink.take() {
            old.stop();
        }
        let path = queue.get(pos)?;
        let new_sink = Sink::try_new(&stream_handle).ok()?;
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open {}: {e}", path.display());
                return None;
            }
        };
        let source = match Decoder::new(BufReader::new(file)) {
            Ok(s) => s,
            Err(e) => {
                warn!("cannot decode {}: {e}", path.display());
                return None;
            }
        };
        new_sink.append(source);
        if paused {
            new_sink.pause();
        } else {
            new_sink.play();
        }
        debug!("decoding {}", path.display());
        *sink = Some(new_sink);
        Some(epoch_ms())
    };

    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(EngineCmd::Queue(path)) => queue.push(path),
            Ok(EngineCmd::Play) => {
                if !started {
                    started = true;
                    pos = 0;
                    paused = false;
                    if let Some(first_read) = start_track(&queue, pos, &mut sink, paused) {
                        set_current(&queue[pos], first_read, false);
                    }
                } else {
                    paused = false;
                    if let Some(s) = sink.as_ref() {
                        s.play();
                    }
                }
            }
            Ok(EngineCmd::Pause) => {
                paused = true;
                if let Some(s) = sink.as_ref() {
                    s.pause();
                }
            }
            Ok(EngineCmd::Next) => {
                if started && !queue.is_empty() {
                    // wrap around: the album repeats
                    pos = (pos + 1) % queue.len();
                    if let Some(first_read) = start_track(&queue, pos, &mut sink, paused) {
                        set_current(&queue[pos], first_read, false);
                    }
                }
            }
            Ok(EngineCmd::Prev) => {
                if started && pos > 0 {
                    pos -= 1;
                    if let Some(first_read) = start_track(&queue, pos, &mut sink, paused) {
                        set_current(&queue[pos], first_read, false);
                    }
                }
            }
            Ok(EngineCmd::Goto(index)) => {
                if index >= 1 && index <= queue.len() {
                    started = true;
                    pos = index - 1;
                    if let Some(first_read) = start_track(&queue, pos, &mut sink, paused) {
                        set_current(&queue[pos], first_read, false);
                    }
                }
            }
            Ok(EngineCmd::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                let Some(s) = sink.as_ref() else { continue };
                if !s.empty() {
                    continue;
                }
                // decode finished; advance unless this is the last track
                if let Ok(mut st) = status.lock() {
                    if let Some(cur) = st.current.as_mut() {
                        cur.end_of_decode = true;
                    }
                }
                if !paused && !queue.is_empty() && pos + 1 < queue.len() {
                    pos += 1;
                    if let Some(first_read) = start_track(&queue, pos, &mut sink, paused) {
                        set_current(&queue[pos], first_read, false);
                    }
                }
            }
        }
    }
}
