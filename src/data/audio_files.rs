//! Audio File Repository
//!
//! Stores the user's sound files in a single directory and resolves
//! configured file names to validated absolute paths.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{InvalidFileSelection, RepositoryError};

/// Audio container extensions accepted for storage and playback.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["mp3", "wav", "wma", "m4a", "aac", "ogg", "flac"];

/// Whether `path` carries an allow-listed extension (case-insensitive).
pub fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Whether `path` is an existing regular file with an allow-listed extension.
pub fn validate_audio_file(path: &Path) -> bool {
    path.is_file() && is_allowed(path)
}

/// Sound file storage rooted at one directory
#[derive(Debug, Clone)]
pub struct AudioFileRepository {
    storage_dir: PathBuf,
}

impl AudioFileRepository {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn ensure_storage_exists(&self) -> Result<&Path, RepositoryError> {
        fs::create_dir_all(&self.storage_dir)?;
        Ok(&self.storage_dir)
    }

    /// Resolve a stored file name to its absolute path.
    ///
    /// Only bare file names inside the storage directory are accepted, and
    /// the file must exist with an allow-listed extension.
    pub fn resolve_full_path(&self, file_name: &str) -> Result<PathBuf, InvalidFileSelection> {
        let name = file_name.trim();
        if name.is_empty() {
            return Err(InvalidFileSelection::Empty);
        }
        if !is_plain_file_name(name) {
            return Err(InvalidFileSelection::InvalidName(name.to_string()));
        }

        let path = self.storage_dir.join(name);
        if !is_allowed(&path) {
            return Err(InvalidFileSelection::UnsupportedExtension(name.to_string()));
        }
        if !path.is_file() {
            return Err(InvalidFileSelection::NotFound(name.to_string()));
        }

        Ok(absolutize(path))
    }

    /// Copy an external audio file into storage, returning the stored name.
    ///
    /// Name collisions are resolved as `stem (1).ext`, `stem (2).ext`, ...
    pub fn add_file(&self, source: &Path) -> Result<String, RepositoryError> {
        if !source.is_file() {
            return Err(RepositoryError::SourceMissing(source.to_path_buf()));
        }
        if !is_allowed(source) {
            return Err(RepositoryError::UnsupportedExtension(
                source.display().to_string(),
            ));
        }

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RepositoryError::InvalidName(source.display().to_string()))?;

        self.ensure_storage_exists()?;

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut stored_name = file_name.to_string();
        let mut counter = 1;
        while self.storage_dir.join(&stored_name).exists() {
            stored_name = format!("{} ({}).{}", stem, counter, ext);
            counter += 1;
        }

        fs::copy(source, self.storage_dir.join(&stored_name))?;
        tracing::info!("Stored sound file {} as {}", source.display(), stored_name);
        Ok(stored_name)
    }

    /// Delete a stored file. Returns `false` if it did not exist.
    pub fn delete_file(&self, file_name: &str) -> Result<bool, RepositoryError> {
        if file_name.trim().is_empty() || !is_plain_file_name(file_name) {
            return Err(RepositoryError::InvalidName(file_name.to_string()));
        }

        let path = self.storage_dir.join(file_name);
        if !path.is_file() {
            return Ok(false);
        }

        fs::remove_file(&path)?;
        tracing::info!("Deleted sound file {}", file_name);
        Ok(true)
    }

    /// Sorted names of all stored, allow-listed sound files.
    pub fn list_files(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", self.storage_dir.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| validate_audio_file(path))
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        names.sort();
        names
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, AudioFileRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = AudioFileRepository::new(dir.path().join("AudioFiles"));
        repo.ensure_storage_exists().unwrap();
        (dir, repo)
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_allowed(Path::new("click.WAV")));
        assert!(is_allowed(Path::new("a/b/tap.flac")));
        assert!(!is_allowed(Path::new("notes.txt")));
        assert!(!is_allowed(Path::new("noext")));
    }

    #[test]
    fn resolves_existing_allowed_file() {
        let (_dir, repo) = repo();
        fs::write(repo.storage_dir().join("click.wav"), b"RIFF").unwrap();

        let path = repo.resolve_full_path("click.wav").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("click.wav"));
    }

    #[test]
    fn resolve_rejects_bad_names() {
        let (_dir, repo) = repo();
        fs::write(repo.storage_dir().join("notes.txt"), b"x").unwrap();

        assert_eq!(repo.resolve_full_path("  "), Err(InvalidFileSelection::Empty));
        assert!(matches!(
            repo.resolve_full_path("../escape.wav"),
            Err(InvalidFileSelection::InvalidName(_))
        ));
        assert!(matches!(
            repo.resolve_full_path("notes.txt"),
            Err(InvalidFileSelection::UnsupportedExtension(_))
        ));
        assert!(matches!(
            repo.resolve_full_path("missing.mp3"),
            Err(InvalidFileSelection::NotFound(_))
        ));
    }

    #[test]
    fn add_file_renames_duplicates() {
        let (dir, repo) = repo();
        let source = dir.path().join("beep.wav");
        fs::write(&source, b"RIFF").unwrap();

        assert_eq!(repo.add_file(&source).unwrap(), "beep.wav");
        assert_eq!(repo.add_file(&source).unwrap(), "beep (1).wav");
        assert_eq!(repo.add_file(&source).unwrap(), "beep (2).wav");
        assert_eq!(
            repo.list_files(),
            vec!["beep (1).wav", "beep (2).wav", "beep.wav"]
        );
    }

    #[test]
    fn add_file_rejects_missing_and_unsupported() {
        let (dir, repo) = repo();
        let text = dir.path().join("readme.txt");
        fs::write(&text, b"x").unwrap();

        assert!(matches!(
            repo.add_file(&dir.path().join("nope.wav")),
            Err(RepositoryError::SourceMissing(_))
        ));
        assert!(matches!(
            repo.add_file(&text),
            Err(RepositoryError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn delete_and_list() {
        let (_dir, repo) = repo();
        fs::write(repo.storage_dir().join("a.mp3"), b"x").unwrap();
        fs::write(repo.storage_dir().join("b.ogg"), b"x").unwrap();
        fs::write(repo.storage_dir().join("c.txt"), b"x").unwrap();

        assert_eq!(repo.list_files(), vec!["a.mp3", "b.ogg"]);
        assert!(repo.delete_file("a.mp3").unwrap());
        assert!(!repo.delete_file("a.mp3").unwrap());
        assert!(repo.delete_file("../c.txt").is_err());
        assert_eq!(repo.list_files(), vec!["b.ogg"]);
    }

    #[test]
    fn list_of_missing_storage_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = AudioFileRepository::new(dir.path().join("absent"));
        assert!(repo.list_files().is_empty());
    }
}
