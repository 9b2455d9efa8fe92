use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use compio::fs;
use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

use crate::ext::PathExt;
use crate::tree::{Entry, TreeNode, is_valid_name};

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Encode, Decode)]
struct StoredSnapshot {
    version: u32,
    root: StoredEntry,
}

#[derive(Debug, Encode, Decode)]
enum StoredEntry {
    File,
    Directory(Vec<(String, StoredEntry)>),
}

impl From<&Entry> for StoredEntry {
    fn from(entry: &Entry) -> Self {
        match entry {
            Entry::File => StoredEntry::File,
            Entry::Directory(node) => StoredEntry::Directory(
                node.iter()
                    .map(|(name, child)| (name.to_string(), StoredEntry::from(child)))
                    .collect(),
            ),
        }
    }
}

/// Rebuilds an entry, refusing names that would escape their parent.
fn restore(stored: StoredEntry, file: &Path) -> Result<Entry, SnapshotFileError> {
    match stored {
        StoredEntry::File => Ok(Entry::File),
        StoredEntry::Directory(children) => children
            .into_iter()
            .map(|(name, child)| {
                ensure!(
                    is_valid_name(&name),
                    InvalidNameSnafu {
                        path: file.to_path_buf(),
                        name,
                    }
                );
                Ok((name, restore(child, file)?))
            })
            .collect::<Result<TreeNode, _>>()
            .map(Entry::Directory),
    }
}

/// Writes a snapshot to `path` as zstd-compressed bincode.
pub async fn save_snapshot(entry: &Entry, path: &Path, level: i32) -> Result<(), SnapshotFileError> {
    let stored = StoredSnapshot {
        version: SNAPSHOT_FORMAT_VERSION,
        root: StoredEntry::from(entry),
    };
    let encoded = bincode::encode_to_vec(&stored, bincode::config::standard())
        .context(EncodeSnafu)?;
    let compressed = zstd::encode_all(encoded.as_slice(), level).context(CompressSnafu {
        path: path.to_path_buf(),
    })?;

    debug!(
        "Writing snapshot ({} bytes, {} compressed) to {}",
        encoded.len(),
        compressed.len(),
        path.display_best_effort()
    );
    fs::write(path, compressed).await.0.context(WriteSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(())
}

/// Reads a snapshot written by [`save_snapshot`].
pub async fn load_snapshot(path: &Path) -> Result<Entry, SnapshotFileError> {
    debug!("Reading snapshot from {}", path.display_best_effort());
    let compressed = fs::read(path).await.context(ReadSnafu {
        path: path.to_path_buf(),
    })?;
    let encoded = zstd::decode_all(compressed.as_slice()).context(DecompressSnafu {
        path: path.to_path_buf(),
    })?;
    let (stored, _): (StoredSnapshot, usize) =
        bincode::decode_from_slice(&encoded, bincode::config::standard()).context(DecodeSnafu {
            path: path.to_path_buf(),
        })?;

    ensure!(
        stored.version == SNAPSHOT_FORMAT_VERSION,
        UnsupportedVersionSnafu {
            path: path.to_path_buf(),
            version: stored.version,
        }
    );
    restore(stored.root, path)
}

#[derive(Debug, Snafu)]
pub enum SnapshotFileError {
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError { source: bincode::error::EncodeError },
    #[snafu(display("Failed to compress snapshot for {}", path.display_best_effort()))]
    CompressError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write snapshot file {}", path.display_best_effort()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read snapshot file {}", path.display_best_effort()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot file {} is not zstd-compressed", path.display_best_effort()))]
    DecompressError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot file {} is corrupted", path.display_best_effort()))]
    DecodeError {
        path: PathBuf,
        source: bincode::error::DecodeError,
    },
    #[snafu(display(
        "Snapshot file {} has unsupported format version {}",
        path.display_best_effort(),
        version
    ))]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[snafu(display(
        "Snapshot file {} holds entry name '{}', which is not a single path component",
        path.display_best_effort(),
        name
    ))]
    InvalidNameError { path: PathBuf, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn saved_snapshot_loads_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("tree.snapshot");

        let mut tree = TreeNode::from_relative_paths(["a.txt", "sub/b.txt"]).unwrap();
        tree.try_insert_directory(Path::new("sub/empty")).unwrap();
        let entry = Entry::Directory(tree);

        save_snapshot(&entry, &file, DEFAULT_COMPRESSION_LEVEL)
            .await
            .expect("Failed to save snapshot");
        let loaded = load_snapshot(&file).await.expect("Failed to load snapshot");

        assert_eq!(loaded, entry);
    }

    #[compio::test]
    async fn file_snapshots_are_supported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.snapshot");

        save_snapshot(&Entry::File, &file, 1).await.unwrap();
        assert_eq!(load_snapshot(&file).await.unwrap(), Entry::File);
    }

    #[compio::test]
    async fn missing_file_is_a_read_error() {
        let result = load_snapshot(Path::new("/this/path/does/not/exist.snapshot")).await;
        assert!(matches!(result, Err(SnapshotFileError::ReadError { .. })));
    }

    #[compio::test]
    async fn escaping_names_are_rejected_on_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("escaping.snapshot");
        let stored = StoredSnapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            root: StoredEntry::Directory(vec![(
                "sub".to_string(),
                StoredEntry::Directory(vec![("/src/a.txt".to_string(), StoredEntry::File)]),
            )]),
        };
        let encoded = bincode::encode_to_vec(&stored, bincode::config::standard()).unwrap();
        std::fs::write(&file, zstd::encode_all(encoded.as_slice(), 1).unwrap()).unwrap();

        let result = load_snapshot(&file).await;

        match result {
            Err(SnapshotFileError::InvalidNameError { name, .. }) => assert_eq!(name, "/src/a.txt"),
            other => panic!("Expected InvalidNameError, got {other:?}"),
        }
    }

    #[compio::test]
    async fn garbage_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("garbage.snapshot");
        std::fs::write(&file, b"definitely not zstd").unwrap();

        let result = load_snapshot(&file).await;
        assert!(matches!(
            result,
            Err(SnapshotFileError::DecompressError { .. })
        ));
    }
}
