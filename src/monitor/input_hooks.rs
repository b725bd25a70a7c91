//! Windows low-level hook capture source.
//!
//! The hook callbacks run synchronously in the Windows input pipeline, so
//! they only classify the event and hand it to the agent's channel. Any
//! delay here is system-wide input lag. The callbacks must:
//! - Never block or take a lock
//! - Never perform I/O
//! - Always call `CallNextHookEx`

use super::events::{EventSender, Key};
use crate::winapi_utils::{post_quit_message, run_message_loop, HookGuard};
use once_cell::sync::OnceCell;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{VK_BACK, VK_DELETE};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, HC_ACTION, KBDLLHOOKSTRUCT, MSLLHOOKSTRUCT, WM_KEYDOWN, WM_LBUTTONDOWN,
    WM_MBUTTONDOWN, WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_SYSKEYDOWN, WM_XBUTTONDOWN,
};

/// Where hook callbacks deliver events. Set once per process.
static HOOK_SINK: OnceCell<EventSender> = OnceCell::new();

// ============================================================================
// Hook Callbacks
// ============================================================================

/// Low-level keyboard hook callback.
///
/// Forwards WM_KEYDOWN and WM_SYSKEYDOWN. Key-up is ignored so a press is
/// counted once.
///
/// # Safety
/// Called by Windows on the hook thread with a valid `KBDLLHOOKSTRUCT`
/// pointer in `lparam` when `code == HC_ACTION`.
pub unsafe extern "system" fn keyboard_hook_proc(
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if code == HC_ACTION as i32 {
        let msg = wparam.0 as u32;

        if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            if let Some(sink) = HOOK_SINK.get() {
                sink.key_down(key_from_vk(info.vkCode));
            }
        }
    }

    // CRITICAL: Always call next hook in chain
    CallNextHookEx(None, code, wparam, lparam)
}

/// Low-level mouse hook callback.
///
/// Forwards pointer moves with screen coordinates and any button press.
/// Wheel events are ignored.
///
/// # Safety
/// Called by Windows on the hook thread with a valid `MSLLHOOKSTRUCT`
/// pointer in `lparam` when `code == HC_ACTION`.
pub unsafe extern "system" fn mouse_hook_proc(
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if code == HC_ACTION as i32 {
        if let Some(sink) = HOOK_SINK.get() {
            match wparam.0 as u32 {
                WM_MOUSEMOVE => {
                    let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
                    sink.pointer_move(info.pt.x as f64, info.pt.y as f64);
                }
                WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN | WM_XBUTTONDOWN => {
                    sink.pointer_down();
                }
                _ => {}
            }
        }
    }

    // CRITICAL: Always call next hook in chain
    CallNextHookEx(None, code, wparam, lparam)
}

/// Maps a virtual-key code to the telemetry key class.
pub fn key_from_vk(vk_code: u32) -> Key {
    if vk_code == VK_BACK.0 as u32 {
        Key::Backspace
    } else if vk_code == VK_DELETE.0 as u32 {
        Key::Delete
    } else {
        Key::Other
    }
}

// ============================================================================
// Hook Thread
// ============================================================================

/// A running hook thread. Hooks are removed when the thread's message
/// loop exits.
pub struct HookThread {
    handle: JoinHandle<()>,
}

impl HookThread {
    /// Posts WM_QUIT to the hook thread and waits for it to unhook.
    pub fn stop(self) {
        post_quit_message(0);
        if self.handle.join().is_err() {
            tracing::error!("Hook thread panicked");
        }
    }
}

/// Installs keyboard and mouse hooks on a dedicated thread that runs the
/// message pump they need.
///
/// Fails if hooks were already bound to another agent in this process or
/// if Windows refuses to install them.
pub fn spawn_hook_thread(sender: EventSender) -> Result<HookThread, Box<dyn std::error::Error>> {
    HOOK_SINK
        .set(sender)
        .map_err(|_| "input hooks are already bound to an agent")?;

    let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();

    let handle = thread::spawn(move || {
        let hooks = HookGuard::install_keyboard_hook(Some(keyboard_hook_proc)).and_then(|kb| {
            HookGuard::install_mouse_hook(Some(mouse_hook_proc)).map(|mouse| (kb, mouse))
        });

        let _hooks = match hooks {
            Ok(hooks) => {
                let _ = ready_tx.send(Ok(()));
                hooks
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
        };

        // Hooks are dropped (unhooked) when the loop returns.
        run_message_loop();
    });

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(HookThread { handle }),
        Ok(Err(e)) => Err(format!("failed to install input hooks: {e}").into()),
        Err(_) => Err("hook thread exited before installing hooks".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_vk() {
        assert_eq!(key_from_vk(0x08), Key::Backspace);
        assert_eq!(key_from_vk(0x2E), Key::Delete);
        assert_eq!(key_from_vk(0x41), Key::Other);
    }
}
