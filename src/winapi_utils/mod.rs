//! Safe wrappers around the Windows API calls used for input capture.
//!
//! Low-level hooks need an installing thread that pumps messages; this
//! module provides the RAII hook guard and that message loop.

pub mod hooks;
pub mod message_loop;

pub use hooks::*;
pub use message_loop::*;
