//! NDJSON replay source.
//!
//! Reads one JSON input event per line from any reader (stdin, a recorded
//! session file) and forwards it to the agent. Lines with a `t_ms` offset
//! are held back until that much time has passed since the replay began,
//! so recorded sessions play back at their original pace.

use super::events::{EventSender, InputEvent, Key};
use crate::error::ReplayError;
use serde::Deserialize;
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// One line of the replay format.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    KeyDown {
        key: String,
        #[serde(default)]
        t_ms: Option<f64>,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        t_ms: Option<f64>,
    },
    PointerDown {
        #[serde(default)]
        t_ms: Option<f64>,
    },
}

impl ReplayEvent {
    /// Offset from replay start, if the line carries one.
    pub fn offset(&self) -> Result<Option<Duration>, ReplayError> {
        let t_ms = match self {
            Self::KeyDown { t_ms, .. } => *t_ms,
            Self::PointerMove { t_ms, .. } => *t_ms,
            Self::PointerDown { t_ms } => *t_ms,
        };
        match t_ms {
            None => Ok(None),
            Some(t_ms) if t_ms < 0.0 => Err(ReplayError::InvalidOffset(t_ms)),
            Some(t_ms) => Duration::try_from_secs_f64(t_ms / 1000.0)
                .map(Some)
                .map_err(|_| ReplayError::OffsetOverflow(t_ms)),
        }
    }

    /// Instant this line is due, measured from `started`.
    fn due_at(&self, started: Instant) -> Result<Option<Instant>, ReplayError> {
        match self.offset()? {
            None => Ok(None),
            Some(offset) => started
                .checked_add(offset)
                .map(Some)
                .ok_or(ReplayError::OffsetOverflow(offset.as_secs_f64() * 1000.0)),
        }
    }

    /// Converts into an aggregator event stamped `at`.
    pub fn into_input(self, at: Instant) -> InputEvent {
        match self {
            Self::KeyDown { key, .. } => InputEvent::KeyDown {
                key: Key::from_name(&key),
                at,
            },
            Self::PointerMove { x, y, .. } => InputEvent::PointerMove { x, y, at },
            Self::PointerDown { .. } => InputEvent::PointerDown { at },
        }
    }
}

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ReplayEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Outcome of a finished replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub forwarded: u64,
    pub skipped: u64,
}

/// Completion signal of a replay thread.
#[derive(Debug)]
pub struct ReplayHandle {
    done: oneshot::Receiver<ReplaySummary>,
}

impl ReplayHandle {
    /// Resolves once the replay ends. `None` if the thread died first.
    pub async fn finished(self) -> Option<ReplaySummary> {
        self.done.await.ok()
    }

    /// Blocking form of [`finished`](Self::finished), for non-async callers.
    pub fn wait(self) -> Option<ReplaySummary> {
        self.done.blocking_recv().ok()
    }
}

/// Spawns a detached thread that replays `reader` into `sender`.
///
/// The thread ends at end of input, on a read error, or at the first
/// event after the agent stops accepting them. A reader blocked on input
/// keeps the thread alive but holds nothing else up.
pub fn spawn_replay<R>(reader: R, sender: EventSender) -> ReplayHandle
where
    R: BufRead + Send + 'static,
{
    let (done_tx, done) = oneshot::channel();
    thread::spawn(move || {
        let summary = replay(reader, &sender);
        let _ = done_tx.send(summary);
    });
    ReplayHandle { done }
}

fn replay<R: BufRead>(reader: R, sender: &EventSender) -> ReplaySummary {
    let started = Instant::now();
    let mut summary = ReplaySummary::default();

    tracing::info!("Replay source started");

    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(?e, "Replay input read failed");
                break;
            }
        };

        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed replay line");
                summary.skipped += 1;
                continue;
            }
        };

        let at = match event.due_at(started) {
            Ok(Some(due)) => {
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
                due
            }
            Ok(None) => Instant::now(),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping replay line");
                summary.skipped += 1;
                continue;
            }
        };

        if !sender.send(event.into_input(at)) {
            tracing::debug!("Agent stopped, detaching replay source");
            break;
        }
        summary.forwarded += 1;
    }

    tracing::info!(
        forwarded = summary.forwarded,
        skipped = summary.skipped,
        "Replay source finished"
    );
    summary
}
