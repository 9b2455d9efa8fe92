use std::future::Future;

use compio::runtime::spawn;
use tracing::warn;

use crate::error::CrawlError;

/// How a traversal step runs its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// The traversal waits for the callback and stops on its failure.
    #[default]
    Sequenced,
    /// The callback is spawned on the runtime and the traversal moves on.
    /// Failures are logged, never propagated.
    Detached,
}

impl ExecutionMode {
    pub(crate) async fn run<F>(self, label: &'static str, callback: F) -> Result<(), CrawlError>
    where
        F: Future<Output = Result<(), CrawlError>> + 'static,
    {
        match self {
            ExecutionMode::Sequenced => callback.await,
            ExecutionMode::Detached => {
                spawn(async move {
                    if let Err(error) = callback.await {
                        warn!("Detached {label} callback failed: {error}");
                    }
                })
                .detach();
                Ok(())
            }
        }
    }
}
