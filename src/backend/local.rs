use std::path::Path;

use compio::fs;
use tracing::debug;

use crate::backend::{EntryKind, StorageBackend};
use crate::error::{CrawlError, InvalidArgumentSnafu};
use crate::ext::PathExt;

/// Backend over the local disk, driven by the compio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for LocalBackend {
    async fn stat(&self, path: &Path) -> Result<EntryKind, CrawlError> {
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|err| CrawlError::from_io(path, err))?;

        let kind = if metadata.file_type().is_symlink() {
            EntryKind::Symlink
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(kind)
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<String>, CrawlError> {
        // compio has no directory stream; listings are small and synchronous.
        let read_dir = std::fs::read_dir(path).map_err(|err| CrawlError::from_io(path, err))?;

        let mut names = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|err| CrawlError::from_io(path, err))?;
            // Tree names are strings; a lossy name would point at nothing.
            let name = dir_entry.file_name().into_string().map_err(|raw| {
                InvalidArgumentSnafu {
                    path: path.join(raw),
                    reason: "file name is not valid UTF-8",
                }
                .build()
            })?;
            names.push(name);
        }
        debug!(
            "Listed {} entries in {}",
            names.len(),
            path.display_best_effort()
        );
        Ok(names)
    }

    async fn make_directory(&self, path: &Path) -> Result<(), CrawlError> {
        fs::create_dir(path)
            .await
            .map_err(|err| CrawlError::from_io(path, err))
    }

    async fn create_file(&self, path: &Path, bytes: &[u8]) -> Result<(), CrawlError> {
        fs::write(path, bytes.to_vec())
            .await
            .0
            .map_err(|err| CrawlError::from_io(path, err))?;
        Ok(())
    }

    async fn copy_file_contents(&self, source: &Path, target: &Path) -> Result<(), CrawlError> {
        let bytes = fs::read(source)
            .await
            .map_err(|err| CrawlError::from_io(source, err))?;
        fs::write(target, bytes)
            .await
            .0
            .map_err(|err| CrawlError::from_io(target, err))?;
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), CrawlError> {
        fs::remove_file(path)
            .await
            .map_err(|err| CrawlError::from_io(path, err))
    }

    async fn delete_empty_directory(&self, path: &Path) -> Result<(), CrawlError> {
        fs::remove_dir(path)
            .await
            .map_err(|err| CrawlError::from_io(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn stat_distinguishes_files_and_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "content").unwrap();

        let backend = LocalBackend::new();
        assert_eq!(backend.stat(temp_dir.path()).await.unwrap(), EntryKind::Directory);
        assert_eq!(backend.stat(&file).await.unwrap(), EntryKind::File);
    }

    #[cfg(unix)]
    #[compio::test]
    async fn stat_does_not_follow_links() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(temp_dir.path(), &link).unwrap();

        let kind = LocalBackend::new().stat(&link).await.unwrap();
        assert_eq!(kind, EntryKind::Symlink);
    }

    #[compio::test]
    async fn missing_paths_are_not_found() {
        let result = LocalBackend::new()
            .stat(Path::new("/this/path/does/not/exist"))
            .await;
        assert!(matches!(result, Err(CrawlError::NotFoundError { .. })));
    }

    #[compio::test]
    async fn make_directory_twice_is_already_exists() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().join("made");
        let backend = LocalBackend::new();

        backend.make_directory(&dir).await.unwrap();
        let result = backend.make_directory(&dir).await;
        assert!(matches!(result, Err(CrawlError::AlreadyExistsError { .. })));
    }

    #[compio::test]
    async fn copy_file_contents_copies_bytes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source.bin");
        let target = temp_dir.path().join("target.bin");
        std::fs::write(&source, [0u8, 1, 2, 255]).unwrap();

        LocalBackend::new()
            .copy_file_contents(&source, &target)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), vec![0u8, 1, 2, 255]);
    }

    #[compio::test]
    async fn deleting_a_non_empty_directory_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().join("full");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("inner.txt"), "x").unwrap();

        let result = LocalBackend::new().delete_empty_directory(&dir).await;
        assert!(matches!(result, Err(CrawlError::NotEmptyError { .. })));
    }

    #[compio::test]
    async fn listing_returns_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let mut names = LocalBackend::new()
            .list_directory(temp_dir.path())
            .await
            .unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);
    }

    #[cfg(target_os = "linux")]
    #[compio::test]
    async fn non_utf8_names_are_reported_not_mangled() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let raw_name = OsStr::from_bytes(b"bad\xffname");
        std::fs::write(temp_dir.path().join(raw_name), "x").unwrap();

        let result = LocalBackend::new().list_directory(temp_dir.path()).await;

        match result {
            Err(CrawlError::InvalidArgumentError { path, .. }) => {
                assert_eq!(path, temp_dir.path().join(raw_name));
            }
            other => panic!("Expected InvalidArgumentError, got {other:?}"),
        }
    }
}
