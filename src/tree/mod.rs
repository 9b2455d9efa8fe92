//! In-memory tree shapes and their on-disk forms.
//!
//! A [`TreeNode`] records names and kinds only. It can be captured from a
//! real directory, written as YAML by hand, or saved and loaded as a
//! compressed snapshot file.

mod node;
mod persist;
mod render;
mod yaml;

pub use node::{CannotInsertIntoFileError, Entry, TreeNode, is_valid_name};
pub use persist::{DEFAULT_COMPRESSION_LEVEL, SnapshotFileError, load_snapshot, save_snapshot};
pub use render::render_tree;
pub use yaml::{TreeYamlError, entry_to_yaml, tree_from_yaml};
