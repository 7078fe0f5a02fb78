//! Headless replay of a recorded canvas session.
//!
//! Reads one JSON envelope per line, feeds it through the engine with
//! in-memory surfaces, renders a preview and a cursor frame after every event,
//! and prints what ended up on screen.
//!
//! Inbound events (`draw`, `cursor`, `historyUpdate`, `init`, `user-joined`,
//! `user-left`) are applied as if they came off the socket. Local input is
//! replayed with `pen-down`/`pen-move` (`{ "x", "y" }`), `pen-up`, `set-color`
//! (`"#rrggbb"`), `toggle-eraser`, `undo`, `redo` and `clear-canvas`. An
//! optional top-level `ts` (ms) pins the clock; otherwise it advances one
//! frame per line.


use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use sketchboard::config::{ConfigError, EngineConfig, HistoryCheck};
use sketchboard::emit::RecordingTransport;
use sketchboard::engine::EngineCore;
use sketchboard::model::Point;
use sketchboard::scheduler::FrameOutcome;
use sketchboard::surface::{MarkerSurface, RecordingSurface, Surface};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Parser, Debug)]
#[command(name = "sketchboard", about = "Replay a canvas event log through the live-stroke engine")]
struct Cli {
    /// JSONL file with one `{ "event", "data" }` envelope per line.
    #[arg(long, env = "SKETCH_REPLAY_FILE")]
    file: PathBuf,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// How history updates are classified as appends: `length` or `prefix-ids`.
    #[arg(long, value_parser = HistoryCheck::parse)]
    history_check: Option<HistoryCheck>,

    #[arg(long)]
    draw_throttle_ms: Option<f64>,

    /// Clock advance per line when the envelope carries no `ts`.
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Summary {
    applied: usize,
    malformed: usize,
    watermark: usize,
    live_strokes: usize,
    cursors: usize,
    committed_segments: usize,
    preview_segments: usize,
    sent: usize,
    faulted_frames: u64,
}

struct Replay {
    core: EngineCore<RecordingTransport>,
    committed: RecordingSurface,
    live: RecordingSurface,
    cursor: RecordingSurface,
    now_ms: f64,
    frame_ms: f64,
    applied: usize,
    malformed: usize,
    preview_segments: usize,
}

impl Replay {
    fn new(config: EngineConfig, width: f64, height: f64, frame_ms: f64) -> Self {
        Self {
            core: EngineCore::new(config, RecordingTransport::new()),
            committed: RecordingSurface::new(width, height),
            live: RecordingSurface::new(width, height),
            cursor: RecordingSurface::new(width, height),
            now_ms: 0.0,
            frame_ms,
            applied: 0,
            malformed: 0,
            preview_segments: 0,
        }
    }

    /// Apply one log line. Blank lines and `#` comments are skipped.
    fn line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let envelope: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, "skipping line that is not JSON");
                self.malformed += 1;
                return;
            }
        };
        let Some(event) = envelope.get("event").and_then(Value::as_str) else {
            tracing::warn!("skipping envelope without `event`");
            self.malformed += 1;
            return;
        };
        let null = Value::Null;
        let data = envelope.get("data").unwrap_or(&null);

        self.now_ms = envelope
            .get("ts")
            .and_then(Value::as_f64)
            .unwrap_or(self.now_ms + self.frame_ms);
        self.core.poll_timers(self.now_ms);

        if self.event(event, data) {
            self.applied += 1;
        } else {
            self.malformed += 1;
        }
        self.frame();
    }

    fn event(&mut self, event: &str, data: &Value) -> bool {
        let now = self.now_ms;
        match event {
            "pen-down" | "pen-move" => {
                let Some(pos) = point(data) else {
                    tracing::warn!(event, "pen event without x/y");
                    return false;
                };
                if event == "pen-down" {
                    self.core.pen_down(now, pos);
                } else {
                    self.core.pen_move(now, pos);
                }
            }
            "pen-up" => {
                self.core.pen_up(now);
            }
            "set-color" => match data.as_str() {
                Some(color) => self.core.set_color(color),
                None => return false,
            },
            "toggle-eraser" => {
                self.core.toggle_eraser();
            }
            "undo" => {
                self.core.undo();
            }
            "redo" => {
                self.core.redo();
            }
            "clear-canvas" => {
                self.core.clear_canvas();
            }
            _ => {
                let surface: &mut dyn Surface = &mut self.committed;
                match self.core.handle_message(event, data, Some(surface)) {
                    Ok(effect) => tracing::debug!(event, ?effect, "applied"),
                    Err(err) => {
                        tracing::warn!(event, %err, "dropped inbound message");
                        return false;
                    }
                }
            }
        }
        true
    }

    fn frame(&mut self) {
        let live: &mut dyn Surface = &mut self.live;
        if let FrameOutcome::Drawn { items } = self.core.render_preview(Some(live)) {
            self.preview_segments = items;
        }
        let cursor: &mut dyn MarkerSurface = &mut self.cursor;
        self.core.render_cursors(Some(cursor));
    }

    /// Let every pending trailing emission fire.
    fn drain(&mut self) {
        while let Some(due) = self.core.next_deadline() {
            self.now_ms = self.now_ms.max(due);
            self.core.poll_timers(self.now_ms);
        }
    }

    fn summary(&self) -> Summary {
        Summary {
            applied: self.applied,
            malformed: self.malformed,
            watermark: self.core.history().watermark(),
            live_strokes: self.core.store().len(),
            cursors: self.core.cursors().len(),
            committed_segments: self.committed.visible_segments().len(),
            preview_segments: self.preview_segments,
            sent: self.core.emitter().transport().sent().len(),
            faulted_frames: self.core.scheduler().preview_stats().faulted + self.core.scheduler().cursor_stats().faulted,
        }
    }
}

fn point(data: &Value) -> Option<Point> {
    Some(Point::new(data.get("x")?.as_f64()?, data.get("y")?.as_f64()?))
}

fn replay<R: BufRead>(reader: R, path: &str, replay: &mut Replay) -> Result<Summary, ReplayError> {
    for line in reader.lines() {
        let line = line.map_err(|source| ReplayError::Io { path: path.to_owned(), source })?;
        replay.line(&line);
    }
    replay.drain();
    Ok(replay.summary())
}

fn main() -> Result<(), ReplayError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(check) = cli.history_check {
        config.history_check = check;
    }
    if let Some(ms) = cli.draw_throttle_ms {
        config.draw_throttle_ms = ms;
    }

    let path = cli.file.display().to_string();
    let file = File::open(&cli.file).map_err(|source| ReplayError::Io { path: path.clone(), source })?;
    let mut state = Replay::new(config, cli.width, cli.height, cli.frame_ms);
    let summary = replay(BufReader::new(file), &path, &mut state)?;
    tracing::info!(file = %path, applied = summary.applied, malformed = summary.malformed, "replay finished");

    println!("events applied:      {}", summary.applied);
    println!("malformed dropped:   {}", summary.malformed);
    println!("history watermark:   {}", summary.watermark);
    println!("live strokes:        {}", summary.live_strokes);
    println!("remote cursors:      {}", summary.cursors);
    println!("committed segments:  {}", summary.committed_segments);
    println!("preview segments:    {}", summary.preview_segments);
    println!("messages sent:       {}", summary.sent);
    println!("faulted frames:      {}", summary.faulted_frames);
    Ok(())
}
