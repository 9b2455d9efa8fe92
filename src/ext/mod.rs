mod path_ext;

pub use path_ext::{PathExt, display_best_effort, normalize};
