//! Single-instance guard
//!
//! A second process sharing the same data directory would install a second
//! system-wide hook and every key would play twice, so startup takes an
//! exclusive per-data-directory lock first. Windows uses a named mutex,
//! unix targets an `flock`ed file inside the data directory.

use std::path::Path;

use crate::error::InstanceLockError;

#[cfg(unix)]
const LOCK_FILE_NAME: &str = "keyboard-sound.lock";

/// Held for the life of the process; dropping it releases the lock.
pub struct InstanceLock {
    #[cfg(unix)]
    _file: std::fs::File,
    #[cfg(windows)]
    handle: windows::Win32::Foundation::HANDLE,
}

impl InstanceLock {
    /// Take the lock for `data_dir`. `Ok(None)` means another instance holds it.
    #[cfg(unix)]
    pub fn acquire(data_dir: &Path) -> Result<Option<Self>, InstanceLockError> {
        use std::fs::{self, OpenOptions};
        use std::io::{self, Write};
        use std::os::unix::io::AsRawFd;

        let path = data_dir.join(LOCK_FILE_NAME);
        let create_err = |source| InstanceLockError::Create {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(data_dir).map_err(create_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(create_err)?;

        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                tracing::debug!("{} is held by another process", path.display());
                return Ok(None);
            }
            return Err(InstanceLockError::Lock { path, source: err });
        }

        // Owner pid, informational only.
        let _ = file.set_len(0);
        let _ = write!(file, "{}", std::process::id());

        Ok(Some(Self { _file: file }))
    }

    /// Take the lock for `data_dir`. `Ok(None)` means another instance holds it.
    #[cfg(windows)]
    pub fn acquire(data_dir: &Path) -> Result<Option<Self>, InstanceLockError> {
        use windows::core::HSTRING;
        use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS};
        use windows::Win32::System::Threading::CreateMutexW;

        let name = HSTRING::from(mutex_name(data_dir));
        let handle = unsafe { CreateMutexW(None, false, &name) }.map_err(|e| {
            InstanceLockError::Create {
                path: data_dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            }
        })?;

        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            let _ = unsafe { CloseHandle(handle) };
            tracing::debug!("Instance mutex {} already exists", name);
            return Ok(None);
        }

        Ok(Some(Self { handle }))
    }

    /// Fallback for targets with neither primitive: never blocks startup.
    #[cfg(not(any(unix, windows)))]
    pub fn acquire(_data_dir: &Path) -> Result<Option<Self>, InstanceLockError> {
        Ok(Some(Self {}))
    }
}

#[cfg(windows)]
impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = unsafe { windows::Win32::Foundation::CloseHandle(self.handle) };
    }
}

/// Mutex names may not contain backslashes past the namespace prefix.
#[cfg(windows)]
fn mutex_name(data_dir: &Path) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    data_dir
        .to_string_lossy()
        .to_lowercase()
        .hash(&mut hasher);
    format!("Local\\KeyboardSound-{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();

        let first = InstanceLock::acquire(dir.path()).unwrap();
        assert!(first.is_some());
        assert!(InstanceLock::acquire(dir.path()).unwrap().is_none());

        drop(first);
        assert!(InstanceLock::acquire(dir.path()).unwrap().is_some());
    }

    #[test]
    fn separate_data_dirs_do_not_conflict() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        let _first = InstanceLock::acquire(a.path()).unwrap().unwrap();
        assert!(InstanceLock::acquire(b.path()).unwrap().is_some());
    }
}
