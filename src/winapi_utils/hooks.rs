//! Low-level hook installation.
//!
//! A [`HookGuard`] owns one installed hook and removes it on drop, so hooks
//! never outlive the capture thread that installed them.

use windows::Win32::UI::WindowsAndMessaging::{
    SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, HOOKPROC, WH_KEYBOARD_LL, WH_MOUSE_LL,
    WINDOWS_HOOK_ID,
};

/// The two global hooks the capture source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Keyboard,
    Mouse,
}

impl HookKind {
    fn id(self) -> WINDOWS_HOOK_ID {
        match self {
            Self::Keyboard => WH_KEYBOARD_LL,
            Self::Mouse => WH_MOUSE_LL,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard_ll",
            Self::Mouse => "mouse_ll",
        }
    }
}

/// RAII guard for an installed hook.
///
/// # Important
/// - The callback must return in well under a millisecond
/// - The callback must end with `CallNextHookEx`
/// - The installing thread must run a message pump, or Windows silently
///   removes the hook after its timeout
pub struct HookGuard {
    handle: HHOOK,
    kind: HookKind,
}

impl HookGuard {
    /// Installs a global hook of `kind` on the calling thread.
    pub fn install(kind: HookKind, callback: HOOKPROC) -> windows::core::Result<Self> {
        let handle = unsafe { SetWindowsHookExW(kind.id(), callback, None, 0)? };
        tracing::info!(hook_type = kind.name(), "Hook installed");
        Ok(Self { handle, kind })
    }

    pub fn install_keyboard_hook(callback: HOOKPROC) -> windows::core::Result<Self> {
        Self::install(HookKind::Keyboard, callback)
    }

    pub fn install_mouse_hook(callback: HOOKPROC) -> windows::core::Result<Self> {
        Self::install(HookKind::Mouse, callback)
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        match unsafe { UnhookWindowsHookEx(self.handle) } {
            Ok(_) => tracing::info!(hook_type = self.kind.name(), "Hook removed"),
            Err(e) => tracing::error!(
                hook_type = self.kind.name(),
                error = ?e,
                "Failed to unhook"
            ),
        }
    }
}
