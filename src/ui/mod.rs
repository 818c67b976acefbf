//! Front ends driving the engine controller

pub mod cli;
#[cfg(any(target_os = "windows", target_os = "macos"))]
mod system_tray;

pub use cli::run_console;
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub use system_tray::run_app;
