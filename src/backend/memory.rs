//! In-memory backend.
//!
//! Used for synthetic trees and for tests: paths can be made unlistable or
//! unwritable to inject failures, and every successful mutation is recorded
//! in a journal so callers can assert on operation order.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::backend::{EntryKind, StorageBackend};
use crate::error::CrawlError;
use crate::ext::normalize;

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
}

/// A mutation applied to a [`MemoryBackend`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    MakeDirectory(PathBuf),
    CreateFile(PathBuf),
    CopyFile { source: PathBuf, target: PathBuf },
    DeleteFile(PathBuf),
    DeleteDirectory(PathBuf),
}

#[derive(Debug)]
pub struct MemoryBackend {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    unlistable: RefCell<HashSet<PathBuf>>,
    unwritable: RefCell<HashSet<PathBuf>>,
    journal: RefCell<Vec<Operation>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a backend holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Directory);
        Self {
            nodes: RefCell::new(nodes),
            unlistable: RefCell::default(),
            unwritable: RefCell::default(),
            journal: RefCell::default(),
        }
    }

    /// Seeds a file, creating missing parent directories. Not journaled.
    pub fn with_file(self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) -> Self {
        let path = normalize(path.as_ref());
        self.seed_parents(&path);
        self.nodes.borrow_mut().insert(path, Node::File(bytes.into()));
        self
    }

    /// Seeds a directory, creating missing parents. Not journaled.
    pub fn with_directory(self, path: impl AsRef<Path>) -> Self {
        let path = normalize(path.as_ref());
        self.seed_parents(&path);
        self.nodes.borrow_mut().insert(path, Node::Directory);
        self
    }

    /// Seeds a symbolic link pointing at `target`. Not journaled.
    pub fn with_symlink(self, path: impl AsRef<Path>, target: impl Into<PathBuf>) -> Self {
        let path = normalize(path.as_ref());
        self.seed_parents(&path);
        self.nodes
            .borrow_mut()
            .insert(path, Node::Symlink(target.into()));
        self
    }

    /// Makes `list_directory` on `path` fail with an access error.
    pub fn forbid_listing(&self, path: impl AsRef<Path>) {
        self.unlistable.borrow_mut().insert(normalize(path.as_ref()));
    }

    /// Makes every write or delete targeting `path` fail with an access error.
    pub fn forbid_writes(&self, path: impl AsRef<Path>) {
        self.unwritable.borrow_mut().insert(normalize(path.as_ref()));
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.nodes.borrow().get(&normalize(path.as_ref())) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.nodes.borrow().contains_key(&normalize(path.as_ref()))
    }

    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        matches!(
            self.nodes.borrow().get(&normalize(path.as_ref())),
            Some(Node::Directory)
        )
    }

    /// Mutations applied so far, oldest first.
    pub fn journal(&self) -> Vec<Operation> {
        self.journal.borrow().clone()
    }

    fn seed_parents(&self, path: &Path) {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Directory);
        }
    }

    fn children_of(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Vec<String> {
        nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(path))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    fn check_writable(&self, path: &Path) -> Result<(), CrawlError> {
        if self.unwritable.borrow().contains(path) {
            return Err(failure(path, ErrorKind::PermissionDenied));
        }
        Ok(())
    }

    fn require_parent_directory(&self, path: &Path) -> Result<(), CrawlError> {
        let parent = path.parent().unwrap_or(Path::new("/"));
        match self.nodes.borrow().get(parent) {
            Some(Node::Directory) => Ok(()),
            Some(_) => Err(failure(path, ErrorKind::NotADirectory)),
            None => Err(failure(path, ErrorKind::NotFound)),
        }
    }

    /// Contents of the file at `path`, following links the way the OS
    /// would: relative targets resolve against the link's directory.
    fn read_through(&self, path: &Path) -> Result<Vec<u8>, CrawlError> {
        let nodes = self.nodes.borrow();
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            match nodes.get(&current) {
                Some(Node::File(bytes)) => return Ok(bytes.clone()),
                Some(Node::Directory) => return Err(failure(path, ErrorKind::IsADirectory)),
                Some(Node::Symlink(target)) => {
                    let parent = current.parent().unwrap_or(Path::new("/"));
                    current = normalize(&parent.join(target));
                }
                None => return Err(failure(path, ErrorKind::NotFound)),
            }
        }
        Err(failure(path, ErrorKind::InvalidInput))
    }

    fn record(&self, operation: Operation) {
        self.journal.borrow_mut().push(operation);
    }
}

fn failure(path: &Path, kind: ErrorKind) -> CrawlError {
    CrawlError::from_io(path, io::Error::new(kind, format!("{kind}: {}", path.display())))
}

impl StorageBackend for MemoryBackend {
    async fn stat(&self, path: &Path) -> Result<EntryKind, CrawlError> {
        let path = normalize(path);
        match self.nodes.borrow().get(&path) {
            Some(Node::File(_)) => Ok(EntryKind::File),
            Some(Node::Directory) => Ok(EntryKind::Directory),
            Some(Node::Symlink(_)) => Ok(EntryKind::Symlink),
            None => Err(failure(&path, ErrorKind::NotFound)),
        }
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<String>, CrawlError> {
        let path = normalize(path);
        if self.unlistable.borrow().contains(&path) {
            return Err(failure(&path, ErrorKind::PermissionDenied));
        }

        let nodes = self.nodes.borrow();
        match nodes.get(&path) {
            Some(Node::Directory) => Ok(Self::children_of(&nodes, &path)),
            Some(_) => Err(failure(&path, ErrorKind::NotADirectory)),
            None => Err(failure(&path, ErrorKind::NotFound)),
        }
    }

    async fn make_directory(&self, path: &Path) -> Result<(), CrawlError> {
        let path = normalize(path);
        self.check_writable(&path)?;
        if self.nodes.borrow().contains_key(&path) {
            return Err(failure(&path, ErrorKind::AlreadyExists));
        }
        self.require_parent_directory(&path)?;

        self.nodes.borrow_mut().insert(path.clone(), Node::Directory);
        self.record(Operation::MakeDirectory(path));
        Ok(())
    }

    async fn create_file(&self, path: &Path, bytes: &[u8]) -> Result<(), CrawlError> {
        let path = normalize(path);
        self.check_writable(&path)?;
        self.require_parent_directory(&path)?;
        if let Some(Node::Directory) = self.nodes.borrow().get(&path) {
            return Err(failure(&path, ErrorKind::IsADirectory));
        }

        self.nodes
            .borrow_mut()
            .insert(path.clone(), Node::File(bytes.to_vec()));
        self.record(Operation::CreateFile(path));
        Ok(())
    }

    async fn copy_file_contents(&self, source: &Path, target: &Path) -> Result<(), CrawlError> {
        let source = normalize(source);
        let target = normalize(target);

        let bytes = self.read_through(&source)?;

        self.check_writable(&target)?;
        self.require_parent_directory(&target)?;
        if let Some(Node::Directory) = self.nodes.borrow().get(&target) {
            return Err(failure(&target, ErrorKind::IsADirectory));
        }

        self.nodes
            .borrow_mut()
            .insert(target.clone(), Node::File(bytes));
        self.record(Operation::CopyFile { source, target });
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), CrawlError> {
        let path = normalize(path);
        self.check_writable(&path)?;
        match self.nodes.borrow().get(&path) {
            Some(Node::File(_)) | Some(Node::Symlink(_)) => {}
            Some(Node::Directory) => return Err(failure(&path, ErrorKind::IsADirectory)),
            None => return Err(failure(&path, ErrorKind::NotFound)),
        }

        self.nodes.borrow_mut().remove(&path);
        self.record(Operation::DeleteFile(path));
        Ok(())
    }

    async fn delete_empty_directory(&self, path: &Path) -> Result<(), CrawlError> {
        let path = normalize(path);
        self.check_writable(&path)?;
        {
            let nodes = self.nodes.borrow();
            match nodes.get(&path) {
                Some(Node::Directory) => {}
                Some(_) => return Err(failure(&path, ErrorKind::NotADirectory)),
                None => return Err(failure(&path, ErrorKind::NotFound)),
            }
            if !Self::children_of(&nodes, &path).is_empty() {
                return Err(failure(&path, ErrorKind::DirectoryNotEmpty));
            }
        }

        self.nodes.borrow_mut().remove(&path);
        self.record(Operation::DeleteDirectory(path));
        Ok(())
    }
}
