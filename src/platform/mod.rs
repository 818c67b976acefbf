use std::sync::Arc;
use std::time::Instant;

use crate::error::HookError;

/// One physical key-down transition (auto-repeat included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDown {
    /// Platform key code, opaque to the engine.
    pub key_code: u32,
    pub at: Instant,
}

impl KeyDown {
    pub fn new(key_code: u32) -> Self {
        Self {
            key_code,
            at: Instant::now(),
        }
    }
}

/// Receives every key-down from inside the OS callback. Must not block.
pub type KeyListener = Arc<dyn Fn(KeyDown) + Send + Sync + 'static>;

/// A live OS keyboard intercept. Dropping it removes the intercept.
pub trait InstalledHook: Send {
    fn describe(&self) -> String;
}

/// Trait for platform-specific low-level keyboard hooks
pub trait KeyboardHookProvider: Send + Sync {
    /// Install a system-wide intercept forwarding key-downs to `listener`.
    fn install(&self, listener: KeyListener) -> Result<Box<dyn InstalledHook>, HookError>;
}

mod instance;
pub use instance::InstanceLock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

/// Fallback for targets without a hook backend
pub struct UnsupportedHookProvider;

impl KeyboardHookProvider for UnsupportedHookProvider {
    fn install(&self, _listener: KeyListener) -> Result<Box<dyn InstalledHook>, HookError> {
        Err(HookError::PlatformRejected(format!(
            "no global keyboard hook available on {}",
            std::env::consts::OS
        )))
    }
}

/// Factory for creating platform-specific implementations
pub struct PlatformFactory;

impl PlatformFactory {
    pub fn create_hook_provider() -> Box<dyn KeyboardHookProvider> {
        #[cfg(target_os = "windows")]
        return Box::new(windows::WindowsHookProvider::new());
        #[cfg(target_os = "macos")]
        return Box::new(macos::MacosHookProvider::new());
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return Box::new(UnsupportedHookProvider);
    }

    /// Pump pending native UI messages on the calling thread.
    pub fn pump_messages() {
        #[cfg(target_os = "windows")]
        windows::pump_messages();
        #[cfg(target_os = "macos")]
        macos::pump_messages();
    }
}
