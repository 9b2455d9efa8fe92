//! Error taxonomy shared by every traversal layer.
//!
//! Errors are classified once, at the storage backend boundary, and then
//! travel unchanged through the snapshot builder, the replayer and the
//! operation controllers.

use std::io::{self, ErrorKind};
use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::PathExt;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CrawlError {
    #[snafu(display("Invalid argument {}: {}", path.display_best_effort(), reason))]
    InvalidArgumentError { path: PathBuf, reason: String },
    #[snafu(display("No such file or directory: {}", path.display_best_effort()))]
    NotFoundError { path: PathBuf, source: io::Error },
    #[snafu(display("Access denied: {}", path.display_best_effort()))]
    AccessError { path: PathBuf, source: io::Error },
    #[snafu(display("Path already exists: {}", path.display_best_effort()))]
    AlreadyExistsError { path: PathBuf, source: io::Error },
    #[snafu(display("Directory is not empty: {}", path.display_best_effort()))]
    NotEmptyError { path: PathBuf, source: io::Error },
    #[snafu(display("No space left while writing {}", path.display_best_effort()))]
    NoSpaceError { path: PathBuf, source: io::Error },
    #[snafu(display("I/O failure on {}", path.display_best_effort()))]
    IoError { path: PathBuf, source: io::Error },
    #[snafu(display("Refusing to traverse symbolic link {}", path.display_best_effort()))]
    SymlinkError { path: PathBuf },
    #[snafu(display("Callback failed: {}", message))]
    CallbackError { message: String },
}

impl CrawlError {
    /// Classifies an OS-level failure on `path` into the crawl taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            ErrorKind::NotFound => CrawlError::NotFoundError { path, source },
            ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                CrawlError::AccessError { path, source }
            }
            ErrorKind::AlreadyExists => CrawlError::AlreadyExistsError { path, source },
            ErrorKind::DirectoryNotEmpty => CrawlError::NotEmptyError { path, source },
            ErrorKind::StorageFull => CrawlError::NoSpaceError { path, source },
            _ => CrawlError::IoError { path, source },
        }
    }

    /// Builds a `CallbackError` for failures raised by user visitors.
    pub fn callback(message: impl Into<String>) -> Self {
        CrawlError::CallbackError {
            message: message.into(),
        }
    }

    /// The path the failure is attached to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            CrawlError::InvalidArgumentError { path, .. }
            | CrawlError::NotFoundError { path, .. }
            | CrawlError::AccessError { path, .. }
            | CrawlError::AlreadyExistsError { path, .. }
            | CrawlError::NotEmptyError { path, .. }
            | CrawlError::NoSpaceError { path, .. }
            | CrawlError::IoError { path, .. }
            | CrawlError::SymlinkError { path } => Some(path),
            CrawlError::CallbackError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(ErrorKind::NotFound, "NotFoundError")]
    #[case(ErrorKind::PermissionDenied, "AccessError")]
    #[case(ErrorKind::ReadOnlyFilesystem, "AccessError")]
    #[case(ErrorKind::AlreadyExists, "AlreadyExistsError")]
    #[case(ErrorKind::DirectoryNotEmpty, "NotEmptyError")]
    #[case(ErrorKind::StorageFull, "NoSpaceError")]
    #[case(ErrorKind::Interrupted, "IoError")]
    fn io_errors_are_classified_by_kind(#[case] kind: ErrorKind, #[case] expected: &str) {
        let error = CrawlError::from_io("/some/path", io::Error::new(kind, "boom"));
        let debug = format!("{error:?}");
        assert!(
            debug.starts_with(expected),
            "expected {expected}, got {debug}"
        );
        assert_eq!(error.path(), Some(&PathBuf::from("/some/path")));
    }

    #[test]
    fn display_mentions_the_path() {
        let error = CrawlError::from_io(
            "/does/not/exist",
            io::Error::new(ErrorKind::NotFound, "missing"),
        );
        let message = error.to_string();
        assert!(message.contains("No such file or directory"));
        assert!(message.contains("/does/not/exist"));
    }

    #[test]
    fn callback_errors_carry_no_path() {
        let error = CrawlError::callback("visitor gave up");
        assert!(error.path().is_none());
        assert_eq!(error.to_string(), "Callback failed: visitor gave up");
    }
}
