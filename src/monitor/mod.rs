//! Input capture.
//!
//! Every source turns its platform stream into [`InputEvent`]s and pushes
//! them through an [`EventSender`]:
//! - `input_hooks`: Windows low-level hooks (Windows only)
//! - `rdev_listener`: global listener on other desktops (`rdev` feature)
//! - `replay`: NDJSON from stdin or a recorded file

pub mod events;
#[cfg(windows)]
pub mod input_hooks;
#[cfg(feature = "rdev")]
pub mod rdev_listener;
pub mod replay;

pub use events::*;
#[cfg(windows)]
pub use input_hooks::{spawn_hook_thread, HookThread};
#[cfg(feature = "rdev")]
pub use rdev_listener::spawn_rdev_listener;
pub use replay::{parse_line, spawn_replay, ReplayEvent, ReplayHandle, ReplaySummary};
