use std::path::{Component, Path, PathBuf};

use crate::error::{CrawlError, InvalidArgumentSnafu};

/// Renders a path for messages, canonicalizing when the path exists and
/// falling back to a lexically normalized absolute form otherwise.
pub fn display_best_effort(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                match std::env::current_dir() {
                    Ok(current_dir) => current_dir.join(path),
                    Err(_) => path.to_path_buf(),
                }
            };
            normalize(&absolute_path).display().to_string()
        }
    }
}

/// Lexically resolves `.` and `..` components without touching the disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait PathExt {
    fn display_best_effort(&self) -> String;

    /// Fails with `InvalidArgumentError` unless the path is absolute.
    fn require_absolute(&self) -> Result<(), CrawlError>;

    /// Final component as an owned string, empty for roots.
    fn basename(&self) -> String;
}

impl PathExt for Path {
    fn display_best_effort(&self) -> String {
        display_best_effort(self)
    }

    fn require_absolute(&self) -> Result<(), CrawlError> {
        if self.is_absolute() {
            Ok(())
        } else {
            InvalidArgumentSnafu {
                path: self.to_path_buf(),
                reason: "path is not absolute",
            }
            .fail()
        }
    }

    fn basename(&self) -> String {
        self.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl PathExt for PathBuf {
    fn display_best_effort(&self) -> String {
        self.as_path().display_best_effort()
    }

    fn require_absolute(&self) -> Result<(), CrawlError> {
        self.as_path().require_absolute()
    }

    fn basename(&self) -> String {
        self.as_path().basename()
    }
}
