use std::path::{Path, PathBuf};

use compio::fs;
use snafu::prelude::*;
use supports_color::Stream;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::backend::LocalBackend;
use crate::cli::Command;
use crate::config::{ConfigCreationError, CrawlConfig};
use crate::crawl::{Crawler, KeyStyle, SnapshotOptions};
use crate::error::CrawlError;
use crate::ext::PathExt;
use crate::tree::{
    Entry, SnapshotFileError, TreeNode, TreeYamlError, entry_to_yaml, load_snapshot,
    render_tree, save_snapshot, tree_from_yaml,
};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let config = CrawlConfig::read(&app_config.root)
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let crawler = Crawler::new(LocalBackend::new()).with_symlink_policy(config.symlinks);
        let resolve = |path: &PathBuf| app_config.resolve(path);

        match &app_config.command {
            Command::Snapshot {
                path,
                path_keys,
                output,
            } => {
                let keys = if *path_keys || config.path_keys {
                    KeyStyle::FullPath
                } else {
                    KeyStyle::Basename
                };
                let options = SnapshotOptions::default()
                    .with_keys(keys)
                    .with_symlinks(config.symlinks);
                let entry = crawler
                    .build_snapshot(&resolve(path), options)
                    .await
                    .context(OperationSnafu)?;

                match output {
                    Some(output) => {
                        // Saved snapshots are scaffold input, which nests names.
                        ensure!(keys == KeyStyle::Basename, PathKeyedSnapshotSnafu);
                        let output = resolve(output);
                        save_snapshot(&entry, &output, config.compression_level)
                            .await
                            .context(SnapshotStorageSnafu)?;
                        info!("Saved snapshot to {}", output.display_best_effort());
                    }
                    None => print!("{}", entry_to_yaml(&entry).context(TreeFormatSnafu)?),
                }
            }
            Command::Tree { path } => {
                let path = resolve(path);
                let options = SnapshotOptions::default().with_symlinks(config.symlinks);
                let entry = crawler
                    .build_snapshot(&path, options)
                    .await
                    .context(OperationSnafu)?;

                let style = supports_color::on(Stream::Stdout).is_some();
                colored::control::set_override(style);
                print!("{}", render_tree(&display_name(&path), &entry, style));
            }
            Command::Scaffold { tree_file, base } => {
                let tree = read_tree_file(&resolve(tree_file)).await?;
                crawler
                    .scaffold(&tree, &resolve(base))
                    .await
                    .context(OperationSnafu)?;
            }
            Command::Copy {
                source,
                destination,
            } => crawler
                .copy(&resolve(source), &resolve(destination))
                .await
                .context(OperationSnafu)?,
            Command::CopyMany {
                source,
                destinations,
            } => {
                let destinations = destinations.iter().map(resolve).collect::<Vec<_>>();
                crawler
                    .copy_to_many(&resolve(source), &destinations)
                    .await
                    .context(OperationSnafu)?
            }
            Command::CopyEmpty {
                source,
                destination,
            } => crawler
                .copy_empty_structure(&resolve(source), &resolve(destination))
                .await
                .context(OperationSnafu)?,
            Command::Remove { path } => crawler
                .remove(&resolve(path))
                .await
                .context(OperationSnafu)?,
            Command::RemoveMany { paths } => {
                let paths = paths.iter().map(resolve).collect::<Vec<_>>();
                crawler.remove_many(&paths).await.context(OperationSnafu)?
            }
        }

        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    match path.basename() {
        name if name.is_empty() => path.display().to_string(),
        name => name,
    }
}

/// Loads a tree description: YAML by extension, a saved snapshot otherwise.
async fn read_tree_file(path: &Path) -> Result<TreeNode, ApplicationError> {
    let is_yaml = path
        .extension()
        .is_some_and(|extension| extension == "yaml" || extension == "yml");

    if is_yaml {
        debug!("Reading YAML tree from {}", path.display_best_effort());
        let bytes = fs::read(path).await.context(TreeFileReadSnafu {
            file_path: path.display_best_effort(),
        })?;
        let text = String::from_utf8_lossy(&bytes);
        return tree_from_yaml(&text).context(TreeFormatSnafu);
    }

    debug!("Loading snapshot from {}", path.display_best_effort());
    match load_snapshot(path).await.context(SnapshotStorageSnafu)? {
        Entry::Directory(node) => Ok(node),
        Entry::File => NotADirectoryTreeSnafu {
            file_path: path.display_best_effort(),
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigCreationError },
    #[snafu(display("Tree operation failed"))]
    OperationError { source: CrawlError },
    #[snafu(display("Failed to read tree file: {}", file_path))]
    TreeFileReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Invalid tree description"))]
    TreeFormatError { source: TreeYamlError },
    #[snafu(display("Snapshot file could not be used"))]
    SnapshotStorageError { source: SnapshotFileError },
    #[snafu(display("Snapshots keyed by full path can be printed but not saved"))]
    PathKeyedSnapshot,
    #[snafu(display("Snapshot in {} describes a single file, not a tree", file_path))]
    NotADirectoryTree { file_path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runtime(root: &Path, command: Command) -> RuntimeConfig {
        RuntimeConfig {
            command,
            root: root.to_path_buf(),
        }
    }

    fn seed(root: &Path) {
        std::fs::create_dir_all(root.join("src/sub")).unwrap();
        std::fs::write(root.join("src/a.txt"), "hi").unwrap();
        std::fs::write(root.join("src/sub/b.txt"), "x").unwrap();
    }

    #[compio::test]
    async fn copy_resolves_relative_paths_against_the_root() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());

        Application::run(runtime(
            dir.path(),
            Command::Copy {
                source: "src".into(),
                destination: "dst".into(),
            },
        ))
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("dst/sub/b.txt")).unwrap(), b"x");
    }

    #[compio::test]
    async fn saved_snapshots_can_be_scaffolded() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        std::fs::create_dir(dir.path().join("base")).unwrap();

        Application::run(runtime(
            dir.path(),
            Command::Snapshot {
                path: "src".into(),
                path_keys: false,
                output: Some("tree.snap".into()),
            },
        ))
        .await
        .unwrap();
        Application::run(runtime(
            dir.path(),
            Command::Scaffold {
                tree_file: "tree.snap".into(),
                base: "base".into(),
            },
        ))
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("base/sub/b.txt")).unwrap(), b"");
        assert_eq!(std::fs::read(dir.path().join("base/a.txt")).unwrap(), b"");
    }

    #[compio::test]
    async fn path_keyed_snapshots_are_not_saved() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());

        let result = Application::run(runtime(
            dir.path(),
            Command::Snapshot {
                path: "src".into(),
                path_keys: true,
                output: Some("tree.snap".into()),
            },
        ))
        .await;

        assert!(matches!(result, Err(ApplicationError::PathKeyedSnapshot)));
        assert!(!dir.path().join("tree.snap").exists());
    }

    #[compio::test]
    async fn escaping_yaml_names_never_reach_the_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("base")).unwrap();
        std::fs::write(dir.path().join("layout.yaml"), "\"../victim.txt\": ~\n").unwrap();

        let result = Application::run(runtime(
            dir.path(),
            Command::Scaffold {
                tree_file: "layout.yaml".into(),
                base: "base".into(),
            },
        ))
        .await;

        assert!(matches!(result, Err(ApplicationError::TreeFormatError { .. })));
        assert!(!dir.path().join("victim.txt").exists());
    }

    #[compio::test]
    async fn yaml_trees_can_be_scaffolded() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("base")).unwrap();
        std::fs::write(
            dir.path().join("layout.yaml"),
            "docs:\n  readme.md: ~\nempty: {}\n",
        )
        .unwrap();

        Application::run(runtime(
            dir.path(),
            Command::Scaffold {
                tree_file: "layout.yaml".into(),
                base: "base".into(),
            },
        ))
        .await
        .unwrap();

        assert!(dir.path().join("base/docs/readme.md").is_file());
        assert!(dir.path().join("base/empty").is_dir());
    }

    #[compio::test]
    async fn invalid_config_stops_before_any_work() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        std::fs::write(dir.path().join(".treecrawl.yaml"), "symlinks: follow").unwrap();

        let result = Application::run(runtime(
            dir.path(),
            Command::Remove { path: "src".into() },
        ))
        .await;

        assert!(matches!(result, Err(ApplicationError::ConfigError { .. })));
        assert!(dir.path().join("src/a.txt").exists());
    }

    #[compio::test]
    async fn remove_many_clears_every_path() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        std::fs::create_dir(dir.path().join("other")).unwrap();

        Application::run(runtime(
            dir.path(),
            Command::RemoveMany {
                paths: vec!["src".into(), "other".into()],
            },
        ))
        .await
        .unwrap();

        assert!(!dir.path().join("src").exists());
        assert!(!dir.path().join("other").exists());
    }
}
