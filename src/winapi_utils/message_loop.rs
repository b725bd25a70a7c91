//! Message pump for the hook thread.
//!
//! Low-level hooks are serviced through the message queue of the thread
//! that installed them. The capture thread runs [`run_message_loop`] and
//! any other thread stops it with [`post_quit_message`].

use std::sync::atomic::{AtomicU32, Ordering};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG, WM_QUIT,
};

/// Thread id of the running hook loop, 0 when none is running.
static LOOP_THREAD_ID: AtomicU32 = AtomicU32::new(0);

/// Pumps messages on the calling thread until WM_QUIT arrives.
pub fn run_message_loop() {
    let thread_id = unsafe { GetCurrentThreadId() };
    LOOP_THREAD_ID.store(thread_id, Ordering::SeqCst);

    tracing::debug!(thread_id, "Hook message loop starting");

    let mut msg = MSG::default();
    unsafe {
        // 0 on WM_QUIT, -1 on error; both end the loop.
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    LOOP_THREAD_ID.store(0, Ordering::SeqCst);
    tracing::debug!("Hook message loop exited");
}

/// Posts WM_QUIT to the hook loop thread. Safe to call from any thread.
pub fn post_quit_message(exit_code: i32) {
    let thread_id = LOOP_THREAD_ID.load(Ordering::SeqCst);
    if thread_id == 0 {
        tracing::warn!("Hook loop is not running, nothing to quit");
        return;
    }

    let result = unsafe {
        PostThreadMessageW(thread_id, WM_QUIT, WPARAM(exit_code as usize), LPARAM(0))
    };
    match result {
        Ok(()) => tracing::debug!(exit_code, thread_id, "Posted quit to hook loop"),
        Err(e) => tracing::error!(?e, "Failed to post quit to hook loop"),
    }
}
