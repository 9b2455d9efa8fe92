//! Storage backends: the primitive, single-path filesystem operations the
//! traversal machinery is built on.
//!
//! Every operation either succeeds or fails with a [`CrawlError`] already
//! classified from the underlying OS error. Nothing above this layer
//! translates errors again.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::{MemoryBackend, Operation};

use std::path::Path;

use crate::error::CrawlError;

/// Kind reported by [`StorageBackend::stat`]. Links are never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

#[allow(async_fn_in_trait)]
pub trait StorageBackend: 'static {
    async fn stat(&self, path: &Path) -> Result<EntryKind, CrawlError>;

    /// Names (not paths) of the immediate children of a directory.
    async fn list_directory(&self, path: &Path) -> Result<Vec<String>, CrawlError>;

    /// Creates a single directory. Fails if it already exists.
    async fn make_directory(&self, path: &Path) -> Result<(), CrawlError>;

    /// Creates or truncates a file holding `bytes`.
    async fn create_file(&self, path: &Path, bytes: &[u8]) -> Result<(), CrawlError>;

    async fn copy_file_contents(&self, source: &Path, target: &Path) -> Result<(), CrawlError>;

    async fn delete_file(&self, path: &Path) -> Result<(), CrawlError>;

    /// Deletes a directory, failing with `NotEmptyError` if it has children.
    async fn delete_empty_directory(&self, path: &Path) -> Result<(), CrawlError>;
}
