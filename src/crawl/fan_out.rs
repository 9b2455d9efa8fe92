//! Multi-target replay: one pass over a tree drives writes into every
//! destination cursor of a [`PathTracker`].

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::try_join_all;
use snafu::ensure;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::crawl::{ExecutionMode, PathTracker, ReplayOptions, ReplayVisitor, replay};
use crate::error::{CrawlError, InvalidArgumentSnafu};
use crate::tree::{TreeNode, is_valid_name};

/// Writes performed at each destination while fanning out.
#[allow(async_fn_in_trait)]
pub trait FanOutAction: 'static {
    async fn create_directory(&self, target: &Path) -> Result<(), CrawlError>;

    /// `source` is the read-side cursor, when the tracker has one.
    async fn write_file(&self, source: Option<&Path>, target: &Path) -> Result<(), CrawlError>;
}

/// Copies file contents from the source cursor.
pub struct CopyAction<B> {
    backend: Rc<B>,
}

impl<B> CopyAction<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self { backend }
    }
}

impl<B: StorageBackend> FanOutAction for CopyAction<B> {
    async fn create_directory(&self, target: &Path) -> Result<(), CrawlError> {
        self.backend.make_directory(target).await
    }

    async fn write_file(&self, source: Option<&Path>, target: &Path) -> Result<(), CrawlError> {
        let Some(source) = source else {
            return InvalidArgumentSnafu {
                path: target,
                reason: "copying requires a source cursor",
            }
            .fail();
        };
        self.backend.copy_file_contents(source, target).await
    }
}

/// Creates zero-length files; content is never read.
pub struct ScaffoldAction<B> {
    backend: Rc<B>,
}

impl<B> ScaffoldAction<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self { backend }
    }
}

impl<B: StorageBackend> FanOutAction for ScaffoldAction<B> {
    async fn create_directory(&self, target: &Path) -> Result<(), CrawlError> {
        self.backend.make_directory(target).await
    }

    async fn write_file(&self, _source: Option<&Path>, target: &Path) -> Result<(), CrawlError> {
        self.backend.create_file(target, &[]).await
    }
}

/// Replay visitor that keeps the tracker in step and applies the action at
/// every write target.
struct FanOutVisitor<A> {
    action: A,
    tracker: RefCell<PathTracker>,
}

impl<A: FanOutAction> FanOutVisitor<A> {
    /// Keys must nest one level below every cursor; a rooted or `..` key
    /// would move the cursors somewhere else entirely.
    fn require_valid_name(&self, name: &str) -> Result<(), CrawlError> {
        let tracker = self.tracker.borrow();
        let at = tracker
            .destinations()
            .next()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        ensure!(
            is_valid_name(name),
            InvalidArgumentSnafu {
                path: at,
                reason: format!("tree entry '{name}' is not a single path component"),
            }
        );
        Ok(())
    }

    async fn create_directories(&self, targets: &[PathBuf]) -> Result<(), CrawlError> {
        try_join_all(
            targets
                .iter()
                .map(|target| self.action.create_directory(target)),
        )
        .await?;
        Ok(())
    }
}

impl<A: FanOutAction> ReplayVisitor for FanOutVisitor<A> {
    async fn on_directory(&self, name: String) -> Result<(), CrawlError> {
        self.require_valid_name(&name)?;
        let targets = {
            let mut tracker = self.tracker.borrow_mut();
            tracker.descend(&name);
            tracker.write_targets()
        };
        debug!("Creating directory '{name}' at {} targets", targets.len());
        self.create_directories(&targets).await
    }

    async fn on_file(&self, name: String) -> Result<(), CrawlError> {
        self.require_valid_name(&name)?;
        let (source, targets) = {
            let mut tracker = self.tracker.borrow_mut();
            tracker.descend(&name);
            (tracker.source().map(Path::to_path_buf), tracker.write_targets())
        };
        debug!("Writing file '{name}' at {} targets", targets.len());

        let result = try_join_all(
            targets
                .iter()
                .map(|target| self.action.write_file(source.as_deref(), target)),
        )
        .await;

        // Files never persist as a level.
        self.tracker.borrow_mut().ascend();
        result.map(|_| ())
    }

    async fn after_directory(&self) -> Result<(), CrawlError> {
        self.tracker.borrow_mut().ascend();
        Ok(())
    }
}

/// Drives `action` across every destination of `tracker` with a single
/// replay of `node`.
///
/// Nodes are processed strictly one after another, so a directory exists
/// at every target before anything is written below it. Within one node
/// the targets are written concurrently; the first failing target fails
/// the whole run.
pub struct MultiTargetController<A> {
    visitor: Rc<FanOutVisitor<A>>,
}

impl<A: FanOutAction> MultiTargetController<A> {
    pub fn new(action: A, tracker: PathTracker) -> Self {
        Self {
            visitor: Rc::new(FanOutVisitor {
                action,
                tracker: RefCell::new(tracker),
            }),
        }
    }

    /// Creates a directory at every current write target.
    pub async fn create_roots(&self) -> Result<(), CrawlError> {
        let targets = self.visitor.tracker.borrow().write_targets();
        self.visitor.create_directories(&targets).await
    }

    pub async fn run(&self, node: &TreeNode) -> Result<(), CrawlError> {
        // The tracker is shared state; callbacks must never overlap.
        let options = ReplayOptions {
            callbacks: ExecutionMode::Sequenced,
            after_directory: ExecutionMode::Sequenced,
        };
        replay(node, Rc::clone(&self.visitor), options).await
    }

    pub fn tracker(&self) -> PathTracker {
        self.visitor.tracker.borrow().clone()
    }
}
