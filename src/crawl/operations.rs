use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::backend::StorageBackend;
use crate::crawl::{
    CopyAction, ExecutionMode, MultiTargetController, NoopVisitor, PathTracker, ScaffoldAction,
    SnapshotBuilder, SnapshotOptions, SnapshotVisitor, SymlinkPolicy, VisitOrder,
};
use crate::error::CrawlError;
use crate::ext::PathExt;
use crate::tree::{Entry, TreeNode};

/// Deletes each file as it is found and each directory once its children
/// are gone.
struct RemoveVisitor<B> {
    backend: Rc<B>,
}

impl<B: StorageBackend> SnapshotVisitor for RemoveVisitor<B> {
    async fn on_file(&self, path: PathBuf) -> Result<(), CrawlError> {
        debug!("Removing file {}", path.display_best_effort());
        self.backend.delete_file(&path).await
    }

    async fn on_directory(&self, path: PathBuf) -> Result<(), CrawlError> {
        debug!("Removing directory {}", path.display_best_effort());
        self.backend.delete_empty_directory(&path).await
    }
}

/// Entry point for every tree operation against one storage backend.
pub struct Crawler<B> {
    backend: Rc<B>,
    symlinks: SymlinkPolicy,
}

impl<B: StorageBackend> Crawler<B> {
    pub fn new(backend: B) -> Self {
        Self::from_shared(Rc::new(backend))
    }

    pub fn from_shared(backend: Rc<B>) -> Self {
        Self {
            backend,
            symlinks: SymlinkPolicy::default(),
        }
    }

    /// Policy applied to links met while snapshotting for copies.
    pub fn with_symlink_policy(mut self, symlinks: SymlinkPolicy) -> Self {
        self.symlinks = symlinks;
        self
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub async fn build_snapshot(
        &self,
        path: &Path,
        options: SnapshotOptions,
    ) -> Result<Entry, CrawlError> {
        self.build_snapshot_with(path, Rc::new(NoopVisitor), options)
            .await
    }

    pub async fn build_snapshot_with<V: SnapshotVisitor>(
        &self,
        path: &Path,
        visitor: Rc<V>,
        options: SnapshotOptions,
    ) -> Result<Entry, CrawlError> {
        SnapshotBuilder::new(Rc::clone(&self.backend), visitor, options)
            .build(path)
            .await
    }

    /// Creates the directories and zero-length files of `node` below `base`,
    /// which must already exist.
    pub async fn scaffold(&self, node: &TreeNode, base: &Path) -> Result<(), CrawlError> {
        base.require_absolute()?;
        let (files, directories) = node.count();
        info!(
            "Scaffolding {files} files and {directories} directories into {}",
            base.display_best_effort()
        );

        let action = ScaffoldAction::new(Rc::clone(&self.backend));
        MultiTargetController::new(action, PathTracker::new([base]))
            .run(node)
            .await
    }

    pub async fn copy(&self, source: &Path, destination: &Path) -> Result<(), CrawlError> {
        self.copy_to_many(source, &[destination]).await
    }

    /// Mirrors `source` at every destination from a single snapshot.
    ///
    /// Directory destinations must not exist yet. A destination equal to
    /// the source is left alone.
    pub async fn copy_to_many<P: AsRef<Path>>(
        &self,
        source: &Path,
        destinations: &[P],
    ) -> Result<(), CrawlError> {
        source.require_absolute()?;
        for destination in destinations {
            destination.as_ref().require_absolute()?;
        }
        info!(
            "Copying {} to {} destinations",
            source.display_best_effort(),
            destinations.len()
        );

        let snapshot = self.snapshot_for_copy(source).await?;
        let tracker = PathTracker::with_source(
            source,
            destinations.iter().map(|destination| destination.as_ref()),
        );

        match snapshot {
            Entry::File => {
                try_join_all(
                    tracker
                        .write_targets()
                        .iter()
                        .map(|target| self.backend.copy_file_contents(source, target)),
                )
                .await?;
            }
            Entry::Directory(node) => {
                let controller =
                    MultiTargetController::new(CopyAction::new(Rc::clone(&self.backend)), tracker);
                controller.create_roots().await?;
                controller.run(&node).await?;
            }
        }

        info!("Copied {}", source.display_best_effort());
        Ok(())
    }

    /// Mirrors the shape of `source` at `destination` with every file empty.
    pub async fn copy_empty_structure(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<(), CrawlError> {
        source.require_absolute()?;
        destination.require_absolute()?;

        match self.snapshot_for_copy(source).await? {
            Entry::File => self.backend.create_file(destination, &[]).await,
            Entry::Directory(node) => {
                self.backend.make_directory(destination).await?;
                self.scaffold(&node, destination).await
            }
        }
    }

    /// Deletes `path` and everything below it, children before parents.
    pub async fn remove(&self, path: &Path) -> Result<(), CrawlError> {
        path.require_absolute()?;
        info!("Removing {}", path.display_best_effort());

        let visitor = Rc::new(RemoveVisitor {
            backend: Rc::clone(&self.backend),
        });
        // Deletion order depends on awaited, children-first callbacks.
        let options = SnapshotOptions::default()
            .with_callbacks(ExecutionMode::Sequenced)
            .with_order(VisitOrder::ChildrenFirst)
            .with_symlinks(SymlinkPolicy::AsFile);
        self.build_snapshot_with(path, visitor, options).await?;
        Ok(())
    }

    /// Removes every path concurrently. The first failure is returned;
    /// removals that already finished stay finished.
    pub async fn remove_many<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), CrawlError> {
        for path in paths {
            path.as_ref().require_absolute()?;
        }
        try_join_all(paths.iter().map(|path| self.remove(path.as_ref()))).await?;
        Ok(())
    }

    async fn snapshot_for_copy(&self, source: &Path) -> Result<Entry, CrawlError> {
        let options = SnapshotOptions::default().with_symlinks(self.symlinks);
        self.build_snapshot(source, options).await
    }
}
