//! Global Input Hook
//!
//! Owns the single OS keyboard intercept for the process. Install and
//! uninstall are serialized through one mutex; installing while installed
//! replaces the previous intercept, so at most one is ever live.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::HookError;
use crate::platform::{InstalledHook, KeyListener, KeyboardHookProvider};

pub struct GlobalInputHook {
    provider: Box<dyn KeyboardHookProvider>,
    handle: Mutex<Option<Box<dyn InstalledHook>>>,
    listener: KeyListener,
}

impl GlobalInputHook {
    /// `listener` receives every key-down once installed.
    pub fn new(provider: Box<dyn KeyboardHookProvider>, listener: KeyListener) -> Self {
        Self {
            provider,
            handle: Mutex::new(None),
            listener,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn InstalledHook>>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.lock().is_some()
    }

    /// Install the intercept, replacing any existing one.
    pub fn install(&self) -> Result<(), HookError> {
        let mut handle = self.lock();

        if let Some(old) = handle.take() {
            tracing::info!("Replacing installed keyboard hook ({})", old.describe());
            drop(old);
        }

        tracing::info!("Installing keyboard hook...");
        match self.provider.install(Arc::clone(&self.listener)) {
            Ok(new) => {
                tracing::info!("Keyboard hook installed: {}", new.describe());
                *handle = Some(new);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to install keyboard hook: {}", e);
                Err(e)
            }
        }
    }

    /// Remove the intercept. No-op when not installed.
    pub fn uninstall(&self) {
        if let Some(old) = self.lock().take() {
            tracing::info!("Uninstalling keyboard hook ({})", old.describe());
            drop(old);
            tracing::info!("Keyboard hook uninstalled");
        }
    }
}

impl Drop for GlobalInputHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::platform::KeyDown;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hook backend that tracks live handles and can replay key-downs.
    #[derive(Default)]
    pub struct FakeHookProvider {
        pub live: Arc<AtomicUsize>,
        pub max_live: Arc<AtomicUsize>,
        pub installs: Arc<AtomicUsize>,
        pub refuse: Arc<Mutex<Option<HookError>>>,
        pub listeners: Arc<Mutex<Vec<(usize, KeyListener)>>>,
    }

    impl FakeHookProvider {
        /// Shares counters with the returned provider so tests keep a view.
        pub fn shared(&self) -> Self {
            Self {
                live: self.live.clone(),
                max_live: self.max_live.clone(),
                installs: self.installs.clone(),
                refuse: self.refuse.clone(),
                listeners: self.listeners.clone(),
            }
        }

        pub fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        /// Deliver a key-down to every live handle's listener.
        pub fn press(&self, key_code: u32) {
            let listeners: Vec<KeyListener> = self
                .listeners
                .lock()
                .unwrap()
                .iter()
                .map(|(_, l)| l.clone())
                .collect();
            for listener in listeners {
                listener(KeyDown::new(key_code));
            }
        }
    }

    struct FakeHandle {
        serial: usize,
        live: Arc<AtomicUsize>,
        listeners: Arc<Mutex<Vec<(usize, KeyListener)>>>,
    }

    impl InstalledHook for FakeHandle {
        fn describe(&self) -> String {
            format!("fake hook {}", self.serial)
        }
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.listeners
                .lock()
                .unwrap()
                .retain(|(serial, _)| *serial != self.serial);
        }
    }

    impl KeyboardHookProvider for FakeHookProvider {
        fn install(&self, listener: KeyListener) -> Result<Box<dyn InstalledHook>, HookError> {
            if let Some(err) = self.refuse.lock().unwrap().clone() {
                return Err(err);
            }
            let serial = self.installs.fetch_add(1, Ordering::SeqCst);
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(now, Ordering::SeqCst);
            self.listeners.lock().unwrap().push((serial, listener));
            Ok(Box::new(FakeHandle {
                serial,
                live: self.live.clone(),
                listeners: self.listeners.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeHookProvider;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hook() -> (FakeHookProvider, GlobalInputHook, Arc<AtomicUsize>) {
        let fake = FakeHookProvider::default();
        let presses = Arc::new(AtomicUsize::new(0));
        let counter = presses.clone();
        let hook = GlobalInputHook::new(
            Box::new(fake.shared()),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (fake, hook, presses)
    }

    #[test]
    fn install_and_uninstall() {
        let (fake, hook, presses) = hook();
        hook.install().unwrap();
        assert!(hook.is_installed());
        assert_eq!(fake.live(), 1);

        fake.press(65);
        assert_eq!(presses.load(Ordering::SeqCst), 1);

        hook.uninstall();
        assert!(!hook.is_installed());
        assert_eq!(fake.live(), 0);

        fake.press(65);
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reinstall_replaces_instead_of_stacking() {
        let (fake, hook, presses) = hook();
        hook.install().unwrap();
        hook.install().unwrap();
        hook.install().unwrap();

        assert_eq!(fake.live(), 1);
        assert_eq!(fake.max_live.load(Ordering::SeqCst), 1);
        fake.press(1);
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uninstall_when_not_installed_is_noop() {
        let (fake, hook, _) = hook();
        hook.uninstall();
        hook.uninstall();
        assert_eq!(fake.live(), 0);
    }

    #[test]
    fn refused_install_leaves_nothing_live() {
        let (fake, hook, _) = hook();
        *fake.refuse.lock().unwrap() = Some(HookError::PermissionDenied("no".into()));

        let err = hook.install().unwrap_err();
        assert!(matches!(err, HookError::PermissionDenied(_)));
        assert!(!hook.is_installed());
        assert_eq!(fake.live(), 0);
    }

    #[test]
    fn drop_uninstalls() {
        let (fake, hook, _) = hook();
        hook.install().unwrap();
        drop(hook);
        assert_eq!(fake.live(), 0);
    }
}
