//! Cross-platform global input listener built on `rdev`.
//!
//! `rdev::listen` blocks its thread for the life of the process and has no
//! unregister call. Once the agent stops, the callback sees a closed
//! sender and drops every further event.

use super::events::{EventSender, Key};
use std::thread::{self, JoinHandle};

fn key_class(key: rdev::Key) -> Key {
    match key {
        rdev::Key::Backspace => Key::Backspace,
        rdev::Key::Delete => Key::Delete,
        _ => Key::Other,
    }
}

/// Spawns the listener thread.
pub fn spawn_rdev_listener(sender: EventSender) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::info!("rdev input listener starting");

        let callback = move |event: rdev::Event| {
            if sender.is_closed() {
                return;
            }
            match event.event_type {
                rdev::EventType::KeyPress(key) => {
                    sender.key_down(key_class(key));
                }
                rdev::EventType::MouseMove { x, y } => {
                    sender.pointer_move(x, y);
                }
                rdev::EventType::ButtonPress(_) => {
                    sender.pointer_down();
                }
                _ => {}
            }
        };

        if let Err(e) = rdev::listen(callback) {
            tracing::error!(error = ?e, "rdev input listener failed");
        }
    })
}
