use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::crawl::ExecutionMode;
use crate::error::CrawlError;
use crate::tree::TreeNode;

/// Callbacks driven by [`replay`]. Names are child names as stored in the
/// tree, not paths.
#[allow(async_fn_in_trait)]
pub trait ReplayVisitor: 'static {
    async fn on_directory(&self, name: String) -> Result<(), CrawlError>;

    async fn on_file(&self, name: String) -> Result<(), CrawlError>;

    /// Fires once per level, after every child of that level was processed.
    async fn after_directory(&self) -> Result<(), CrawlError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    pub callbacks: ExecutionMode,
    pub after_directory: ExecutionMode,
}

/// Re-visits `node` level by level.
///
/// Per level, every file child is visited first, then every directory child
/// in turn: its callback, then the full recursion into it, before the next
/// sibling. The after-directory hook closes the level. Recursion is always
/// awaited; the options only govern the callbacks themselves.
pub async fn replay<V: ReplayVisitor>(
    node: &TreeNode,
    visitor: Rc<V>,
    options: ReplayOptions,
) -> Result<(), CrawlError> {
    let replayer = Replayer { visitor, options };
    replayer.replay_level(node, 0).await
}

struct Replayer<V> {
    visitor: Rc<V>,
    options: ReplayOptions,
}

impl<V: ReplayVisitor> Replayer<V> {
    fn replay_level<'a>(
        &'a self,
        node: &'a TreeNode,
        depth: usize,
    ) -> LocalBoxFuture<'a, Result<(), CrawlError>> {
        async move {
            let (files, directories) = node.partition();
            debug!(
                "Replaying level {depth}: {} files, {} directories",
                files.len(),
                directories.len()
            );

            for name in files {
                let visitor = Rc::clone(&self.visitor);
                let name = name.to_string();
                self.options
                    .callbacks
                    .run("file", async move { visitor.on_file(name).await })
                    .await?;
            }

            for (name, child) in directories {
                let visitor = Rc::clone(&self.visitor);
                let name = name.to_string();
                self.options
                    .callbacks
                    .run("directory", async move { visitor.on_directory(name).await })
                    .await?;
                self.replay_level(child, depth + 1).await?;
            }

            let visitor = Rc::clone(&self.visitor);
            self.options
                .after_directory
                .run("after-directory", async move { visitor.after_directory().await })
                .await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Enter(String),
        File(String),
        Leave,
    }

    #[derive(Default)]
    struct RecordingVisitor {
        events: RefCell<Vec<Event>>,
        fail_on: Option<String>,
        fail_after_directory: bool,
    }

    impl ReplayVisitor for RecordingVisitor {
        async fn on_directory(&self, name: String) -> Result<(), CrawlError> {
            self.events.borrow_mut().push(Event::Enter(name));
            Ok(())
        }

        async fn on_file(&self, name: String) -> Result<(), CrawlError> {
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Err(CrawlError::callback(format!("refused {name}")));
            }
            self.events.borrow_mut().push(Event::File(name));
            Ok(())
        }

        async fn after_directory(&self) -> Result<(), CrawlError> {
            self.events.borrow_mut().push(Event::Leave);
            if self.fail_after_directory {
                return Err(CrawlError::callback("level hook refused"));
            }
            Ok(())
        }
    }

    fn enter(name: &str) -> Event {
        Event::Enter(name.to_string())
    }

    fn file(name: &str) -> Event {
        Event::File(name.to_string())
    }

    #[compio::test]
    async fn files_come_before_directories_at_every_level() {
        let tree = TreeNode::from_relative_paths([
            "sub/inner/deep.txt",
            "a.txt",
            "sub/b.txt",
            "other/c.txt",
            "z.txt",
        ])
        .unwrap();
        let visitor = Rc::new(RecordingVisitor::default());

        replay(&tree, visitor.clone(), ReplayOptions::default())
            .await
            .unwrap();

        assert_eq!(
            *visitor.events.borrow(),
            vec![
                file("a.txt"),
                file("z.txt"),
                enter("sub"),
                file("b.txt"),
                enter("inner"),
                file("deep.txt"),
                Event::Leave,
                Event::Leave,
                enter("other"),
                file("c.txt"),
                Event::Leave,
                Event::Leave,
            ]
        );
    }

    #[compio::test]
    async fn after_directory_fires_once_per_level() {
        let mut tree = TreeNode::from_relative_paths(["a/b/c.txt"]).unwrap();
        tree.try_insert_directory(std::path::Path::new("empty")).unwrap();
        let visitor = Rc::new(RecordingVisitor::default());

        replay(&tree, visitor.clone(), ReplayOptions::default())
            .await
            .unwrap();

        let events = visitor.events.borrow();
        let enters = events.iter().filter(|e| matches!(e, Event::Enter(_))).count();
        let leaves = events.iter().filter(|e| **e == Event::Leave).count();
        assert_eq!(enters, 3);
        assert_eq!(leaves, enters + 1);
    }

    #[compio::test]
    async fn empty_tree_only_closes_the_root() {
        let visitor = Rc::new(RecordingVisitor::default());
        replay(&TreeNode::new(), visitor.clone(), ReplayOptions::default())
            .await
            .unwrap();
        assert_eq!(*visitor.events.borrow(), vec![Event::Leave]);
    }

    #[compio::test]
    async fn a_failing_callback_aborts_the_rest() {
        let tree = TreeNode::from_relative_paths(["a.txt", "b.txt", "sub/c.txt"]).unwrap();
        let visitor = Rc::new(RecordingVisitor {
            fail_on: Some("b.txt".to_string()),
            ..Default::default()
        });

        let result = replay(&tree, visitor.clone(), ReplayOptions::default()).await;

        assert!(matches!(result, Err(CrawlError::CallbackError { .. })));
        assert_eq!(*visitor.events.borrow(), vec![file("a.txt")]);
    }

    #[compio::test]
    async fn detached_callbacks_do_not_abort() {
        let tree = TreeNode::from_relative_paths(["a.txt", "b.txt"]).unwrap();
        let visitor = Rc::new(RecordingVisitor {
            fail_on: Some("a.txt".to_string()),
            ..Default::default()
        });
        let options = ReplayOptions {
            callbacks: ExecutionMode::Detached,
            after_directory: ExecutionMode::Sequenced,
        };

        let result = replay(&tree, visitor.clone(), options).await;

        assert!(result.is_ok());
        assert!(visitor.events.borrow().contains(&Event::Leave));
    }

    #[compio::test]
    async fn awaited_after_directory_failures_abort() {
        let tree = TreeNode::from_relative_paths(["sub/a.txt", "other/b.txt"]).unwrap();
        let visitor = Rc::new(RecordingVisitor {
            fail_after_directory: true,
            ..Default::default()
        });

        let result = replay(&tree, visitor.clone(), ReplayOptions::default()).await;

        assert!(matches!(result, Err(CrawlError::CallbackError { .. })));
        assert!(!visitor.events.borrow().contains(&enter("other")));
    }

    #[compio::test]
    async fn detached_after_directory_never_blocks_the_walk() {
        let tree = TreeNode::from_relative_paths(["sub/a.txt", "other/b.txt"]).unwrap();
        let visitor = Rc::new(RecordingVisitor {
            fail_after_directory: true,
            ..Default::default()
        });
        let options = ReplayOptions {
            callbacks: ExecutionMode::Sequenced,
            after_directory: ExecutionMode::Detached,
        };

        let result = replay(&tree, visitor.clone(), options).await;

        assert!(result.is_ok());
        let walked = visitor
            .events
            .borrow()
            .iter()
            .filter(|event| **event != Event::Leave)
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(
            walked,
            vec![enter("sub"), file("a.txt"), enter("other"), file("b.txt")]
        );
    }
}
