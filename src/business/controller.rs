//! Engine Lifecycle Controller
//!
//! Single owner of the engine settings. Front ends call into it; it keeps
//! the shared state, the installed hook and the persisted config in step.
//! All mutations are serialized through one lock so a settings toggle can
//! never race the startup installation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::AudioPlaybackEngine;
use crate::business::{ActiveFile, EngineState, GlobalInputHook, PlaybackDispatcher};
use crate::data::{AppConfig, AudioFileRepository, ConfigStore};
use crate::error::{HookError, InvalidFileSelection, RepositoryError};
use crate::platform::KeyboardHookProvider;

/// Something the UI should know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineNotice {
    /// No usable sound is selected; the user has to pick one.
    NoFileConfigured,
    /// The keyboard hook could not be installed; the feature is off.
    HookUnavailable(HookError),
    EnabledChanged(bool),
    ActiveFileChanged(Option<String>),
}

/// Current state as rendered by a front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub enabled: bool,
    pub active_file: Option<String>,
    pub hook_installed: bool,
}

type NoticeCallback = Arc<dyn Fn(EngineNotice) + Send + Sync + 'static>;

pub struct EngineLifecycleController {
    state: Arc<EngineState>,
    hook: GlobalInputHook,
    engine: Arc<AudioPlaybackEngine>,
    repository: AudioFileRepository,
    store: Box<dyn ConfigStore>,
    config: Mutex<AppConfig>,
    on_notice: Mutex<Option<NoticeCallback>>,
}

impl EngineLifecycleController {
    pub fn new(
        store: Box<dyn ConfigStore>,
        repository: AudioFileRepository,
        hook_provider: Box<dyn KeyboardHookProvider>,
        engine: Arc<AudioPlaybackEngine>,
    ) -> Self {
        let state = Arc::new(EngineState::new());
        let dispatcher = Arc::new(PlaybackDispatcher::new(state.clone(), engine.clone()));
        let hook = GlobalInputHook::new(hook_provider, dispatcher.listener());

        Self {
            state,
            hook,
            engine,
            repository,
            store,
            config: Mutex::new(AppConfig::safe_fallback()),
            on_notice: Mutex::new(None),
        }
    }

    /// Set callback for UI notifications.
    pub fn set_on_notice<F>(&self, callback: F)
    where
        F: Fn(EngineNotice) + Send + Sync + 'static,
    {
        if let Ok(mut cb) = self.on_notice.lock() {
            *cb = Some(Arc::new(callback));
        }
    }

    fn notify(&self, notice: EngineNotice) {
        let callback = self.on_notice.lock().ok().and_then(|cb| cb.clone());
        if let Some(cb) = callback {
            cb(notice);
        }
    }

    fn config(&self) -> MutexGuard<'_, AppConfig> {
        match self.config.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, config: &AppConfig) {
        if let Err(e) = self.store.save(config) {
            tracing::error!("Failed to save configuration: {}", e);
        }
    }

    pub fn repository(&self) -> &AudioFileRepository {
        &self.repository
    }

    pub fn engine(&self) -> &Arc<AudioPlaybackEngine> {
        &self.engine
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            enabled: self.state.is_enabled(),
            active_file: self.state.active_file().map(|f| f.name.clone()),
            hook_installed: self.hook.is_installed(),
        }
    }

    /// Load the configuration, validate the sound and install the hook if enabled.
    pub fn start(&self) -> EngineSnapshot {
        let mut config = self.config();

        *config = match self.store.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!("Failed to load configuration, using safe defaults: {}", e);
                AppConfig::safe_fallback()
            }
        };
        tracing::info!(
            "Configuration loaded. enabled: {}, active_file: {:?}",
            config.general.enabled,
            config.active_file()
        );

        if let Err(e) = self.repository.ensure_storage_exists() {
            tracing::warn!("Cannot create sound storage: {}", e);
        }

        let has_sound = self.load_active_file(&mut config);

        self.state.set_enabled(config.general.enabled);
        let hook_result = if config.general.enabled {
            self.hook.install()
        } else {
            tracing::info!("Engine is disabled, skipping hook installation");
            Ok(())
        };
        drop(config);

        if !has_sound {
            self.notify(EngineNotice::NoFileConfigured);
        }
        if let Err(e) = hook_result {
            // Keep the persisted flag so the next launch tries again.
            self.state.set_enabled(false);
            self.notify(EngineNotice::HookUnavailable(e));
        }

        self.snapshot()
    }

    /// Resolve the configured sound, clearing it if it is gone.
    ///
    /// Returns whether a sound ended up selected.
    fn load_active_file(&self, config: &mut AppConfig) -> bool {
        if let Some(name) = config.active_file().map(str::to_string) {
            match self.repository.resolve_full_path(&name) {
                Ok(path) => {
                    tracing::info!("Sound file loaded: {}", path.display());
                    self.state.set_active_file(Some(ActiveFile::new(name, path)));
                    return true;
                }
                Err(e) => {
                    tracing::warn!("Configured sound file is unusable: {}", e);
                    config.sound.active_file.clear();
                    self.persist(config);
                }
            }
        }

        if config.sound.auto_select_first {
            if let Some(first) = self.repository.list_files().into_iter().next() {
                if let Ok(path) = self.repository.resolve_full_path(&first) {
                    tracing::info!("Auto-selected first sound file: {}", first);
                    config.sound.active_file = first.clone();
                    self.persist(config);
                    self.state.set_active_file(Some(ActiveFile::new(first, path)));
                    return true;
                }
            }
        }

        tracing::info!("No sound file set - user must select one");
        self.state.set_active_file(None);
        false
    }

    /// Turn key sounds on or off, installing or removing the hook.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), HookError> {
        let mut config = self.config();
        let result = self.apply_enabled(&mut config, enabled);
        drop(config);
        self.report_enabled(enabled, result)
    }

    /// Flip the enabled flag, returning the new value.
    pub fn toggle_enabled(&self) -> Result<bool, HookError> {
        let mut config = self.config();
        let next = !self.state.is_enabled();
        let result = self.apply_enabled(&mut config, next);
        drop(config);
        self.report_enabled(next, result)?;
        Ok(next)
    }

    /// Caller holds the config lock. Returns whether the flag changed.
    fn apply_enabled(&self, config: &mut AppConfig, enabled: bool) -> Result<bool, HookError> {
        let was_enabled = self.state.is_enabled();

        if enabled && !was_enabled {
            self.hook.install()?;
            self.state.set_enabled(true);
        } else if !enabled && was_enabled {
            self.state.set_enabled(false);
            self.hook.uninstall();
        }

        config.general.enabled = enabled;
        self.persist(config);
        Ok(enabled != was_enabled)
    }

    fn report_enabled(
        &self,
        enabled: bool,
        result: Result<bool, HookError>,
    ) -> Result<(), HookError> {
        match result {
            Ok(changed) => {
                tracing::info!("Key sounds {}", if enabled { "enabled" } else { "disabled" });
                if changed {
                    self.notify(EngineNotice::EnabledChanged(enabled));
                }
                Ok(())
            }
            Err(e) => {
                self.notify(EngineNotice::HookUnavailable(e.clone()));
                Err(e)
            }
        }
    }

    /// Select the sound to play. On rejection the previous sound stays active.
    pub fn set_active_file(&self, file_name: &str) -> Result<(), InvalidFileSelection> {
        let mut config = self.config();

        let path = match self.repository.resolve_full_path(file_name) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Rejected sound selection {:?}: {}", file_name, e);
                return Err(e);
            }
        };

        let name = file_name.trim().to_string();
        self.state
            .set_active_file(Some(ActiveFile::new(name.clone(), path)));
        config.sound.active_file = name.clone();
        self.persist(&config);
        drop(config);

        tracing::info!("Default sound file set to: {}", name);
        self.notify(EngineNotice::ActiveFileChanged(Some(name)));
        Ok(())
    }

    pub fn clear_active_file(&self) {
        let mut config = self.config();
        self.clear_locked(&mut config);
        drop(config);
        self.report_cleared();
    }

    /// Caller holds the config lock.
    fn clear_locked(&self, config: &mut AppConfig) {
        self.state.set_active_file(None);
        config.sound.active_file.clear();
        self.persist(config);
    }

    fn report_cleared(&self) {
        tracing::info!("Default sound file cleared");
        self.notify(EngineNotice::ActiveFileChanged(None));
        self.notify(EngineNotice::NoFileConfigured);
    }

    /// Re-check the active sound on disk; clears it if it has disappeared.
    ///
    /// Returns whether a usable sound is still configured.
    pub fn revalidate_active_file(&self) -> bool {
        let mut config = self.config();
        let Some(active) = self.state.active_file() else {
            return false;
        };

        if self.repository.resolve_full_path(&active.name).is_ok() {
            return true;
        }

        tracing::warn!("Active sound file disappeared: {}", active.path().display());
        self.clear_locked(&mut config);
        drop(config);
        self.report_cleared();
        false
    }

    pub fn list_sounds(&self) -> Vec<String> {
        self.repository.list_files()
    }

    /// Copy an external file into the sound storage.
    pub fn add_sound(&self, source: &Path) -> Result<String, RepositoryError> {
        self.repository.add_file(source)
    }

    /// Delete a stored sound, clearing the selection if it was active.
    pub fn delete_sound(&self, file_name: &str) -> Result<bool, RepositoryError> {
        let mut config = self.config();
        let deleted = self.repository.delete_file(file_name)?;

        let was_active = self
            .state
            .active_file()
            .map(|f| f.name == file_name)
            .unwrap_or(false);
        if !(deleted && was_active) {
            return Ok(deleted);
        }

        self.clear_locked(&mut config);
        drop(config);
        self.report_cleared();
        Ok(true)
    }

    /// Remove the hook. Playback already in flight finishes on its own.
    pub fn shutdown(&self) {
        let _config = self.config();
        self.state.set_enabled(false);
        self.hook.uninstall();
        tracing::info!("Engine shut down");
    }
}
