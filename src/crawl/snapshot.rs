use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, try_join_all};
use tracing::{debug, warn};

use crate::backend::{EntryKind, StorageBackend};
use crate::crawl::ExecutionMode;
use crate::error::{CrawlError, SymlinkSnafu};
use crate::ext::PathExt;
use crate::tree::{Entry, TreeNode};

/// Callbacks fired while a snapshot is being built. Both default to no-ops.
#[allow(async_fn_in_trait)]
pub trait SnapshotVisitor: 'static {
    async fn on_file(&self, path: PathBuf) -> Result<(), CrawlError> {
        let _ = path;
        Ok(())
    }

    async fn on_directory(&self, path: PathBuf) -> Result<(), CrawlError> {
        let _ = path;
        Ok(())
    }
}

/// Visitor for walks that only need the resulting tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisitor;

impl SnapshotVisitor for NoopVisitor {}

/// When a directory's callback fires relative to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitOrder {
    #[default]
    ChildrenFirst,
    ParentFirst,
}

/// What a snapshot uses as child keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    #[default]
    Basename,
    FullPath,
}

/// How the walk treats symbolic links. Links are never descended into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    #[default]
    Error,
    Skip,
    AsFile,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOptions {
    pub callbacks: ExecutionMode,
    pub order: VisitOrder,
    pub keys: KeyStyle,
    pub symlinks: SymlinkPolicy,
}

impl SnapshotOptions {
    pub fn with_callbacks(mut self, callbacks: ExecutionMode) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_order(mut self, order: VisitOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_keys(mut self, keys: KeyStyle) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_symlinks(mut self, symlinks: SymlinkPolicy) -> Self {
        self.symlinks = symlinks;
        self
    }
}

/// Walks a backend and materializes the tree below a path.
///
/// Children of one directory are walked concurrently; the directory's own
/// node is only returned once all of them resolved. The first failure
/// aborts the level.
pub struct SnapshotBuilder<B, V> {
    backend: Rc<B>,
    visitor: Rc<V>,
    options: SnapshotOptions,
}

impl<B: StorageBackend, V: SnapshotVisitor> SnapshotBuilder<B, V> {
    pub fn new(backend: Rc<B>, visitor: Rc<V>, options: SnapshotOptions) -> Self {
        Self {
            backend,
            visitor,
            options,
        }
    }

    pub async fn build(&self, path: &Path) -> Result<Entry, CrawlError> {
        path.require_absolute()?;
        debug!("Building snapshot of {}", path.display_best_effort());

        match self.build_entry(path.to_path_buf()).await? {
            Some(entry) => Ok(entry),
            // Only a skipped symlink yields nothing, and a root has no parent to skip it from.
            None => SymlinkSnafu { path }.fail(),
        }
    }

    fn build_entry(&self, path: PathBuf) -> LocalBoxFuture<'_, Result<Option<Entry>, CrawlError>> {
        async move {
            let kind = match self.backend.stat(&path).await? {
                EntryKind::Symlink => match self.options.symlinks {
                    SymlinkPolicy::Error => return SymlinkSnafu { path }.fail(),
                    SymlinkPolicy::Skip => {
                        warn!("Skipping symbolic link {}", path.display_best_effort());
                        return Ok(None);
                    }
                    SymlinkPolicy::AsFile => EntryKind::File,
                },
                kind => kind,
            };

            if kind == EntryKind::File {
                self.notify_file(path).await?;
                return Ok(Some(Entry::File));
            }

            let names = self.backend.list_directory(&path).await?;
            if self.options.order == VisitOrder::ParentFirst {
                self.notify_directory(path.clone()).await?;
            }

            let children = try_join_all(names.into_iter().map(|name| {
                let child_path = path.join(&name);
                async move {
                    let entry = self.build_entry(child_path.clone()).await?;
                    Ok::<_, CrawlError>((name, child_path, entry))
                }
            }))
            .await?;

            let node = children
                .into_iter()
                .filter_map(|(name, child_path, entry)| {
                    let key = match self.options.keys {
                        KeyStyle::Basename => name,
                        KeyStyle::FullPath => child_path.to_string_lossy().into_owned(),
                    };
                    entry.map(|entry| (key, entry))
                })
                .collect::<TreeNode>();

            if self.options.order == VisitOrder::ChildrenFirst {
                self.notify_directory(path).await?;
            }
            Ok(Some(Entry::Directory(node)))
        }
        .boxed_local()
    }

    async fn notify_file(&self, path: PathBuf) -> Result<(), CrawlError> {
        let visitor = Rc::clone(&self.visitor);
        self.options
            .callbacks
            .run("file", async move { visitor.on_file(path).await })
            .await
    }

    async fn notify_directory(&self, path: PathBuf) -> Result<(), CrawlError> {
        let visitor = Rc::clone(&self.visitor);
        self.options
            .callbacks
            .run("directory", async move { visitor.on_directory(path).await })
            .await
    }
}
