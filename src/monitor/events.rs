//! Input events shared by every capture source.

use std::time::Instant;
use tokio::sync::mpsc;

/// Key identity as far as telemetry cares.
///
/// Only deletion keys are told apart; every other key collapses into
/// [`Key::Other`] so no typed content leaves the capture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Backspace,
    Delete,
    Other,
}

impl Key {
    /// Maps a DOM-style key name (`"Backspace"`, `"a"`, `"Enter"`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            _ => Self::Other,
        }
    }

    /// Whether this press counts toward the backspace rate.
    pub fn is_backspace(self) -> bool {
        self == Self::Backspace
    }
}

/// A raw input event stamped at capture time.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { key: Key, at: Instant },
    PointerMove { x: f64, y: f64, at: Instant },
    PointerDown { at: Instant },
}

/// Cloneable handle capture sources use to feed the agent.
///
/// Every send returns `false` once the agent has stopped, which is the
/// signal for a source to detach.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<InputEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<InputEvent>) -> Self {
        Self { tx }
    }

    /// Sends an already stamped event.
    pub fn send(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.send(InputEvent::KeyDown {
            key,
            at: Instant::now(),
        })
    }

    pub fn pointer_move(&self, x: f64, y: f64) -> bool {
        self.send(InputEvent::PointerMove {
            x,
            y,
            at: Instant::now(),
        })
    }

    pub fn pointer_down(&self) -> bool {
        self.send(InputEvent::PointerDown { at: Instant::now() })
    }

    /// True once the receiving agent is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
