//! Traversal machinery: building snapshots, replaying them, and the
//! operations composed from the two.

mod fan_out;
mod mode;
mod operations;
mod replay;
mod snapshot;
mod tracker;

pub use fan_out::{CopyAction, FanOutAction, MultiTargetController, ScaffoldAction};
pub use mode::ExecutionMode;
pub use operations::Crawler;
pub use replay::{ReplayOptions, ReplayVisitor, replay};
pub use snapshot::{
    KeyStyle, NoopVisitor, SnapshotBuilder, SnapshotOptions, SnapshotVisitor, SymlinkPolicy,
    VisitOrder,
};
pub use tracker::{Cursor, PathTracker};
