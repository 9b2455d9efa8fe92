use std::path::{Path, PathBuf};

use crate::cli::{Cli, Command};
use crate::ext::normalize;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command: Command,
    pub root: PathBuf,
}

impl RuntimeConfig {
    /// Anchors `path` at the root unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        normalize(&self.root.join(path))
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let root = std::path::absolute(&cli.root).unwrap_or(cli.root);
        Self {
            command: cli.command,
            root: normalize(&root),
        }
    }
}
