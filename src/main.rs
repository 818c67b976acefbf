//! Keyboard Sound - Main Entry Point
//!
//! Supports two modes:
//! - CLI mode: console control surface (run with --cli flag)
//! - UI mode: system tray (default on Windows and macOS)
//!
//! Other flags: `--debug` for verbose logs, `--data-dir <path>` to relocate
//! config, sounds and log file.

use anyhow::Result;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use keyboard_sound::business::EngineNotice;
use keyboard_sound::platform::{InstanceLock, PlatformFactory};
use keyboard_sound::{
    AppPaths, AudioFileRepository, AudioPlaybackEngine, EngineLifecycleController, RodioPlayer,
    TomlConfigStore,
};

struct Options {
    cli_mode: bool,
    debug: bool,
    data_dir: Option<String>,
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let data_dir = args
        .iter()
        .position(|a| a == "--data-dir")
        .and_then(|i| args.get(i + 1).cloned());

    Options {
        cli_mode: args.iter().any(|a| a == "--cli" || a == "-c"),
        debug: args.iter().any(|a| a == "--debug" || a == "-d"),
        data_dir,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = parse_args();
    let paths = AppPaths::resolve(options.data_dir.as_deref());
    let _log_guards = init_logging(options.debug, &paths.log_dir());

    info!(
        "Starting Keyboard Sound v{} (data dir: {})",
        env!("CARGO_PKG_VERSION"),
        paths.root().display()
    );

    let _instance = match InstanceLock::acquire(paths.root())? {
        Some(lock) => lock,
        None => {
            warn!(
                "Keyboard Sound is already running for {}, exiting",
                paths.root().display()
            );
            return Ok(());
        }
    };

    let controller = Arc::new(build_controller(&paths));

    let result = if options.cli_mode || !tray_supported() {
        if !options.cli_mode {
            warn!("No system tray on this platform, using console mode");
        }
        run_cli_mode(controller.clone())
    } else {
        run_ui_mode(controller.clone()).await
    };

    // Deterministic hook removal before the process exits.
    controller.shutdown();
    info!("Application exited");
    result
}

fn build_controller(paths: &AppPaths) -> EngineLifecycleController {
    let store = TomlConfigStore::new(paths.config_file());
    let repository = AudioFileRepository::new(paths.sounds_dir());
    let engine = Arc::new(AudioPlaybackEngine::new(Arc::new(RodioPlayer::new())));

    EngineLifecycleController::new(
        Box::new(store),
        repository,
        PlatformFactory::create_hook_provider(),
        engine,
    )
}

fn tray_supported() -> bool {
    cfg!(any(target_os = "windows", target_os = "macos"))
}

/// Run in console mode
fn run_cli_mode(controller: Arc<EngineLifecycleController>) -> Result<()> {
    controller.set_on_notice(|notice| match notice {
        EngineNotice::NoFileConfigured => {
            println!("⚠️  No sound file configured - use `list` and `use <name>`")
        }
        EngineNotice::HookUnavailable(e) => {
            println!("❌ Keyboard hook unavailable, key sounds are off: {}", e)
        }
        EngineNotice::EnabledChanged(enabled) => {
            println!("   Key sounds {}", if enabled { "enabled" } else { "disabled" })
        }
        EngineNotice::ActiveFileChanged(_) => {}
    });

    let snapshot = controller.start();
    info!("Engine started: {:?}", snapshot);

    keyboard_sound::ui::run_console(controller)
}

/// Run in full UI mode with system tray
#[cfg(any(target_os = "windows", target_os = "macos"))]
async fn run_ui_mode(controller: Arc<EngineLifecycleController>) -> Result<()> {
    let snapshot = controller.start();
    info!("Engine started: {:?}", snapshot);

    keyboard_sound::ui::run_app(controller).await
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
async fn run_ui_mode(controller: Arc<EngineLifecycleController>) -> Result<()> {
    run_cli_mode(controller)
}

/// Console plus append-only `debug.log`. Both sinks go through background
/// writers so logging from the hook callback never blocks on I/O.
fn init_logging(debug: bool, log_dir: &Path) -> Vec<WorkerGuard> {
    let level = if debug {
        "keyboard_sound=debug"
    } else {
        "keyboard_sound=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    let (console, console_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![console_guard];
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(console).with_target(true));

    match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::never(log_dir, "debug.log");
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            guards.push(file_guard);
        }
        Err(e) => {
            registry.init();
            warn!("Cannot create log directory {}: {}", log_dir.display(), e);
        }
    }

    guards
}
