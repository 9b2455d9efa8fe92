use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Snapshot, copy, scaffold and remove directory trees")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Directory relative paths are resolved against
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the tree below a path as YAML, or save it as a snapshot file
    Snapshot {
        path: PathBuf,
        /// Key children by full path instead of by name
        #[clap(long)]
        path_keys: bool,
        /// Write a compressed snapshot here instead of printing YAML
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Render the tree below a path
    Tree { path: PathBuf },
    /// Create the structure described by a YAML tree or a saved snapshot
    Scaffold { tree_file: PathBuf, base: PathBuf },
    Copy { source: PathBuf, destination: PathBuf },
    /// Copy a tree to several destinations in one pass
    CopyMany {
        source: PathBuf,
        #[clap(required = true)]
        destinations: Vec<PathBuf>,
    },
    /// Copy the structure of a tree with every file left empty
    CopyEmpty { source: PathBuf, destination: PathBuf },
    Remove { path: PathBuf },
    RemoveMany {
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },
}
